//! Logging setup for embedders
//!
//! The crate logs through `tracing`; hosts that want output call
//! [`init`] once at startup. Levels: 0 = warn, 1 = info, 2+ = debug.

use tracing_subscriber::EnvFilter;

/// Initialize a global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("darkroom=warn"),
        1 => EnvFilter::new("darkroom=info"),
        _ => EnvFilter::new("darkroom=debug"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
