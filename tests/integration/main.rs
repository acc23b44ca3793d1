//! Integration tests for the darkroom cache controller

mod support {
    use async_trait::async_trait;
    use darkroom::{
        CacheController, CacheStore, Config, DarkroomError, DarkroomResult, Fetcher, Request,
        Response,
    };
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Serves 200 for every path, body = the request path bytes
    pub struct PhotoFetcher;

    #[async_trait]
    impl Fetcher for PhotoFetcher {
        async fn fetch(&self, request: &Request) -> DarkroomResult<Response> {
            Ok(Response::new(200, request.url().path().as_bytes().to_vec()))
        }
    }

    /// Every fetch fails with a network error
    pub struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, request: &Request) -> DarkroomResult<Response> {
            Err(DarkroomError::fetch(
                request.url().as_str(),
                "connection refused",
            ))
        }
    }

    /// A fetch that never resolves
    pub struct PendingFetcher;

    #[async_trait]
    impl Fetcher for PendingFetcher {
        async fn fetch(&self, _request: &Request) -> DarkroomResult<Response> {
            std::future::pending::<()>().await;
            unreachable!("pending fetch resolved")
        }
    }

    /// Resolves with the given response once released
    pub struct GatedFetcher {
        pub gate: Arc<Notify>,
        pub response: Response,
    }

    #[async_trait]
    impl Fetcher for GatedFetcher {
        async fn fetch(&self, _request: &Request) -> DarkroomResult<Response> {
            self.gate.notified().await;
            Ok(self.response.clone())
        }
    }

    pub fn photo(name: &str) -> Request {
        Request::get(&format!("http://localhost:4321/photos/{name}")).unwrap()
    }

    pub fn controller(
        config: Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> CacheController {
        CacheController::with_null_host(config, store, fetcher).unwrap()
    }
}

mod routing_tests {
    use crate::support::*;
    use darkroom::{CacheStore, Config, MemoryStore, Method, Request};
    use std::sync::Arc;

    // P7: non-matching requests never touch the images partition
    #[tokio::test]
    async fn routing_boundary_never_touches_cache() {
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(Config::default(), store.clone(), Arc::new(PhotoFetcher));

        let post =
            Request::with_method(Method::Post, "http://localhost:4321/photos/a.jpg").unwrap();
        let cross_origin = Request::get("https://cdn.other.com/photos/a.jpg").unwrap();
        let outside_prefix = Request::get("http://localhost:4321/style.css").unwrap();

        assert!(ctl.handle(&post).await.is_none());
        assert!(ctl.handle(&cross_origin).await.is_none());
        assert!(ctl.handle(&outside_prefix).await.is_none());

        // No partition was created, let alone written
        assert!(store.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn matching_request_is_served() {
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(Config::default(), store, Arc::new(PhotoFetcher));

        let response = ctl.handle(&photo("a.jpg")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"/photos/a.jpg");
    }
}

mod retrieval_tests {
    use crate::support::*;
    use darkroom::{CacheStore, Config, MemoryStore, Response};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    // P1: a cached entry is served without waiting on the network
    #[tokio::test]
    async fn cache_hit_does_not_wait_for_network() {
        let store = Arc::new(MemoryStore::new());
        let images = store.open("images-v1").await.unwrap();
        let request = photo("a.jpg");
        images
            .put(&request.identity(), Response::new(200, vec![1]))
            .await
            .unwrap();

        let ctl = controller(Config::default(), store, Arc::new(PendingFetcher));

        let response = timeout(Duration::from_secs(1), ctl.handle(&request))
            .await
            .expect("hit must not block on the pending fetch")
            .unwrap();
        assert_eq!(response.body, vec![1]);
    }

    // P2: after a hit, the resolved network response overwrites the entry
    #[tokio::test]
    async fn cache_hit_is_refreshed_in_background() {
        let store = Arc::new(MemoryStore::new());
        let images = store.open("images-v1").await.unwrap();
        let request = photo("a.jpg");
        images
            .put(&request.identity(), Response::new(200, b"stale".to_vec()))
            .await
            .unwrap();

        let gate = Arc::new(Notify::new());
        let fetcher = GatedFetcher {
            gate: gate.clone(),
            response: Response::new(200, b"fresh".to_vec()),
        };
        let ctl = controller(Config::default(), store, Arc::new(fetcher));

        let outcome = ctl.handle_with_refresh(&request).await.unwrap();
        assert_eq!(outcome.response.body, b"stale");

        // Release the network fetch and wait for the background write
        gate.notify_one();
        outcome.refresh.unwrap().await.unwrap();

        let stored = images.lookup(&request.identity()).await.unwrap().unwrap();
        assert_eq!(stored.body, b"fresh");
    }

    // P3: a miss is served from the network and creates an entry
    #[tokio::test]
    async fn miss_serves_network_and_creates_entry() {
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(Config::default(), store.clone(), Arc::new(PhotoFetcher));

        let request = photo("b.jpg");
        let outcome = ctl.handle_with_refresh(&request).await.unwrap();
        assert_eq!(outcome.response.body, b"/photos/b.jpg");

        outcome.refresh.unwrap().await.unwrap();
        let images = store.open("images-v1").await.unwrap();
        let stored = images.lookup(&request.identity()).await.unwrap().unwrap();
        assert_eq!(stored.body, b"/photos/b.jpg");
    }

    // P4: a miss with a failing network yields an empty 503 and no entry
    #[tokio::test]
    async fn miss_with_network_failure_yields_503() {
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(Config::default(), store.clone(), Arc::new(FailingFetcher));

        let response = ctl.handle(&photo("c.jpg")).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(response.body.is_empty());

        let images = store.open("images-v1").await.unwrap();
        assert!(images.identities().await.unwrap().is_empty());
    }
}

mod eviction_tests {
    use crate::support::*;
    use darkroom::{CacheStore, Config, MemoryStore};
    use std::sync::Arc;

    async fn fetch_sequentially(ctl: &darkroom::CacheController, names: &[&str]) {
        for name in names {
            let outcome = ctl.handle_with_refresh(&photo(name)).await.unwrap();
            // Non-overlapping writes: wait out each background write
            if let Some(refresh) = outcome.refresh {
                refresh.await.unwrap();
            }
        }
    }

    // P5: the partition is bounded and keeps the newest identities
    #[tokio::test]
    async fn partition_is_bounded_fifo() {
        let config = Config {
            max_image_entries: 3,
            ..Config::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(config, store.clone(), Arc::new(PhotoFetcher));

        fetch_sequentially(&ctl, &["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]).await;

        let images = store.open("images-v1").await.unwrap();
        assert_eq!(
            images.identities().await.unwrap(),
            vec![
                photo("3.jpg").identity(),
                photo("4.jpg").identity(),
                photo("5.jpg").identity(),
            ]
        );
    }

    // Spec scenario: max = 2, fetch a, b, c -> {b, c}
    #[tokio::test]
    async fn scenario_two_entry_cap() {
        let config = Config {
            max_image_entries: 2,
            ..Config::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(config, store.clone(), Arc::new(PhotoFetcher));

        fetch_sequentially(&ctl, &["a.jpg", "b.jpg", "c.jpg"]).await;

        let images = store.open("images-v1").await.unwrap();
        assert_eq!(
            images.identities().await.unwrap(),
            vec![photo("b.jpg").identity(), photo("c.jpg").identity()]
        );
    }

    // A refreshed entry keeps its insertion slot and is still evicted first
    #[tokio::test]
    async fn refresh_does_not_reset_eviction_order() {
        let config = Config {
            max_image_entries: 2,
            ..Config::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ctl = controller(config, store.clone(), Arc::new(PhotoFetcher));

        fetch_sequentially(&ctl, &["a.jpg", "b.jpg", "a.jpg", "c.jpg"]).await;

        let images = store.open("images-v1").await.unwrap();
        assert_eq!(
            images.identities().await.unwrap(),
            vec![photo("b.jpg").identity(), photo("c.jpg").identity()]
        );
    }
}

mod lifecycle_tests {
    use crate::support::*;
    use async_trait::async_trait;
    use darkroom::{
        CacheController, CacheStore, Config, DarkroomResult, MemoryStore, Response, WorkerHost,
    };
    use std::sync::{Arc, Mutex};

    /// Records host calls in order
    struct RecordingHost {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl WorkerHost for RecordingHost {
        async fn skip_waiting(&self) -> DarkroomResult<()> {
            self.calls.lock().unwrap().push("skip_waiting");
            Ok(())
        }

        async fn claim_clients(&self) -> DarkroomResult<()> {
            self.calls.lock().unwrap().push("claim_clients");
            Ok(())
        }
    }

    fn v2_config() -> Config {
        Config {
            version_tag: "v2".to_string(),
            ..Config::default()
        }
    }

    async fn seed_v1_partitions(store: &MemoryStore) {
        for name in ["shell-v1", "images-v1", "leftover-cache"] {
            let partition = store.open(name).await.unwrap();
            partition
                .put("GET http://localhost:4321/x", Response::new(200, vec![]))
                .await
                .unwrap();
        }
    }

    // P6: activation prunes prior generations and never creates the
    // images partition
    #[tokio::test]
    async fn activate_prunes_old_generations() {
        let store = Arc::new(MemoryStore::new());
        seed_v1_partitions(&store).await;

        let ctl = controller(v2_config(), store.clone(), Arc::new(PhotoFetcher));
        ctl.activate().await.unwrap();

        assert!(store.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn init_installs_then_prunes() {
        let store = Arc::new(MemoryStore::new());
        seed_v1_partitions(&store).await;

        let ctl = controller(v2_config(), store.clone(), Arc::new(PhotoFetcher));
        ctl.init().await.unwrap();

        // Only the freshly installed shell survives; images-v2 appears
        // lazily on the first cached write
        assert_eq!(store.partition_names().await.unwrap(), vec!["shell-v2"]);

        let shell = store.open("shell-v2").await.unwrap();
        assert_eq!(shell.identities().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn current_images_partition_survives_activation() {
        let store = Arc::new(MemoryStore::new());
        let images = store.open("images-v2").await.unwrap();
        images
            .put("GET http://localhost:4321/photos/a.jpg", Response::new(200, vec![1]))
            .await
            .unwrap();

        let ctl = controller(v2_config(), store.clone(), Arc::new(PhotoFetcher));
        ctl.activate().await.unwrap();

        assert_eq!(store.partition_names().await.unwrap(), vec!["images-v2"]);
        assert_eq!(images.identities().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_signals_host_in_order() {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(RecordingHost {
            calls: Mutex::new(Vec::new()),
        });
        let ctl = CacheController::new(
            Config::default(),
            store,
            Arc::new(PhotoFetcher),
            host.clone(),
        )
        .unwrap();

        ctl.init().await.unwrap();

        assert_eq!(
            *host.calls.lock().unwrap(),
            vec!["skip_waiting", "claim_clients"]
        );
    }

    #[tokio::test]
    async fn failed_install_never_reaches_activation() {
        let store = Arc::new(MemoryStore::new());
        seed_v1_partitions(&store).await;

        let host = Arc::new(RecordingHost {
            calls: Mutex::new(Vec::new()),
        });
        let ctl = CacheController::new(
            v2_config(),
            store.clone(),
            Arc::new(FailingFetcher),
            host.clone(),
        )
        .unwrap();

        assert!(ctl.init().await.is_err());

        // Old generation's partitions are untouched and the host was
        // never signaled
        assert_eq!(store.partition_names().await.unwrap().len(), 3);
        assert!(host.calls.lock().unwrap().is_empty());
    }
}

mod persistence_tests {
    use crate::support::*;
    use darkroom::{Config, DiskStore};
    use std::sync::Arc;

    // First visit online, second visit offline: the photo still loads
    #[tokio::test]
    async fn cached_photo_survives_restart_and_network_loss() {
        let temp = tempfile::TempDir::new().unwrap();
        let request = photo("keeper.jpg");

        {
            let store = Arc::new(DiskStore::new(temp.path()));
            let ctl = controller(Config::default(), store, Arc::new(PhotoFetcher));
            let outcome = ctl.handle_with_refresh(&request).await.unwrap();
            outcome.refresh.unwrap().await.unwrap();
        }

        // Fresh process, dead network
        let store = Arc::new(DiskStore::new(temp.path()));
        let ctl = controller(Config::default(), store, Arc::new(FailingFetcher));

        let outcome = ctl.handle_with_refresh(&request).await.unwrap();
        assert_eq!(outcome.response.body, b"/photos/keeper.jpg");

        // Let the failed background refresh settle; the entry survives it
        if let Some(refresh) = outcome.refresh {
            refresh.await.unwrap();
        }
        let response = ctl.handle(&request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    // Version bump wipes the old on-disk partitions
    #[tokio::test]
    async fn deploy_invalidates_old_disk_partitions() {
        let temp = tempfile::TempDir::new().unwrap();

        {
            let store = Arc::new(DiskStore::new(temp.path()));
            let ctl = controller(Config::default(), store, Arc::new(PhotoFetcher));
            ctl.init().await.unwrap();
            let outcome = ctl.handle_with_refresh(&photo("old.jpg")).await.unwrap();
            outcome.refresh.unwrap().await.unwrap();
        }

        let store = Arc::new(DiskStore::new(temp.path()));
        let config = Config {
            version_tag: "v2".to_string(),
            ..Config::default()
        };
        let ctl = controller(config, store.clone(), Arc::new(PhotoFetcher));
        ctl.init().await.unwrap();

        use darkroom::CacheStore;
        assert_eq!(store.partition_names().await.unwrap(), vec!["shell-v2"]);
    }
}
