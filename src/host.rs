//! Worker host abstraction
//!
//! The hosting environment decides when a new controller generation
//! takes over from the previous one. The controller only signals:
//! `skip_waiting` after a successful install, `claim_clients` after
//! activation pruning.

use crate::error::DarkroomResult;
use async_trait::async_trait;

/// Hooks into the hosting environment's worker lifecycle
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Ask the host to promote this generation without waiting for all
    /// existing clients to close
    async fn skip_waiting(&self) -> DarkroomResult<()>;

    /// Ask the host to route already-open clients to this generation
    /// immediately instead of on their next navigation
    async fn claim_clients(&self) -> DarkroomResult<()>;
}

/// No-op host for embedders without generation handover semantics
pub struct NullHost;

#[async_trait]
impl WorkerHost for NullHost {
    async fn skip_waiting(&self) -> DarkroomResult<()> {
        Ok(())
    }

    async fn claim_clients(&self) -> DarkroomResult<()> {
        Ok(())
    }
}
