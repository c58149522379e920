use crate::client::RemoteClient;
use crate::error::{NextcloudError, NextcloudResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info};

type ClientFactory = Box<dyn Fn() -> NextcloudResult<Arc<dyn RemoteClient>> + Send + Sync>;

/// Owns the single [`RemoteClient`] of a server run.
///
/// The client is built lazily on the first [`start`](Self::start), shared by
/// every tool afterwards and closed once by [`shutdown`](Self::shutdown).
pub struct ClientLifecycle {
    factory: ClientFactory,
    client: OnceCell<Arc<dyn RemoteClient>>,
    shut_down: AtomicBool,
    closed: AtomicBool,
}

impl ClientLifecycle {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> NextcloudResult<Arc<dyn RemoteClient>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            client: OnceCell::new(),
            shut_down: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Build the client if needed and return it; concurrent callers share
    /// one construction
    pub async fn start(&self) -> NextcloudResult<Arc<dyn RemoteClient>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(NextcloudError::ShutDown);
        }

        let client = self
            .client
            .get_or_try_init(|| async {
                debug!("constructing Nextcloud client");
                let client = (self.factory)()?;
                info!("Nextcloud client ready");
                Ok::<_, NextcloudError>(client)
            })
            .await?;
        let client = Arc::clone(client);

        if self.shut_down.load(Ordering::SeqCst) {
            // shutdown began while the client was being built
            self.close_once(&client).await;
            return Err(NextcloudError::ShutDown);
        }
        Ok(client)
    }

    pub fn client(&self) -> Option<Arc<dyn RemoteClient>> {
        self.client.get().cloned()
    }

    /// Close the client; only the first call has any effect
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("shutdown already done");
            return;
        }

        // waits for a construction already in flight instead of racing it
        let built = self
            .client
            .get_or_try_init(|| async { Err(NextcloudError::ShutDown) })
            .await;
        match built {
            Ok(client) => self.close_once(client).await,
            Err(_) => debug!("shutdown before the client was started"),
        }
    }

    async fn close_once(&self, client: &Arc<dyn RemoteClient>) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            client.close().await;
            info!("Nextcloud client closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting(mock: Arc<MockClient>) -> (ClientLifecycle, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let lifecycle = ClientLifecycle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Arc::clone(&mock) as Arc<dyn RemoteClient>)
        });
        (lifecycle, built)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_construct_once() {
        let (lifecycle, built) = counting(Arc::new(MockClient::new()));
        let lifecycle = Arc::new(lifecycle);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                tokio::spawn(async move { lifecycle.start().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(lifecycle.client().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_closes_once() {
        let mock = Arc::new(MockClient::new());
        let (lifecycle, _) = counting(Arc::clone(&mock));

        lifecycle.start().await.unwrap();
        lifecycle.shutdown().await;
        lifecycle.shutdown().await;
        lifecycle.shutdown().await;

        assert_eq!(mock.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_start_after_shutdown_fails() {
        let (lifecycle, built) = counting(Arc::new(MockClient::new()));
        lifecycle.shutdown().await;

        let err = lifecycle.start().await.err().unwrap();
        assert!(matches!(err, NextcloudError::ShutDown));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_start_closes_nothing() {
        let mock = Arc::new(MockClient::new());
        let (lifecycle, _) = counting(Arc::clone(&mock));
        lifecycle.shutdown().await;
        assert_eq!(mock.close_calls(), 0);
        assert!(lifecycle.client().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_during_construction_closes_the_client() {
        let mock = Arc::new(MockClient::new());
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let client = Arc::clone(&mock);
        let lifecycle = Arc::new(ClientLifecycle::new(move || {
            let _ = entered_tx.send(());
            std::thread::sleep(Duration::from_millis(100));
            Ok(Arc::clone(&client) as Arc<dyn RemoteClient>)
        }));

        let starting = tokio::spawn({
            let lifecycle = Arc::clone(&lifecycle);
            async move { lifecycle.start().await.map(|_| ()) }
        });
        entered_rx.recv().unwrap();
        lifecycle.shutdown().await;

        let started = starting.await.unwrap();
        assert!(matches!(started, Err(NextcloudError::ShutDown)));
        assert_eq!(mock.close_calls(), 1);

        lifecycle.shutdown().await;
        assert!(lifecycle.start().await.is_err());
        assert_eq!(mock.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_construction_can_be_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let lifecycle = ClientLifecycle::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(NextcloudError::Config("NEXTCLOUD_HOST must be set".into()))
            } else {
                Ok(Arc::new(MockClient::new()) as Arc<dyn RemoteClient>)
            }
        });

        assert!(lifecycle.start().await.is_err());
        assert!(lifecycle.start().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
