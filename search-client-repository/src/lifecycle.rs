//! Lazily built, memoized remote client handle.
//!
//! The handle is built from the connection config on first access and
//! shared by every operation afterwards. Concurrent first accesses race only
//! on who runs the factory; exactly one handle is ever stored.

use std::fmt;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchService;
use crate::opensearch::OpenSearchService;
use crate::retry::RetryingService;

/// Builds the remote service handle from the connection config.
pub type ServiceFactory =
    Arc<dyn Fn(&ConnectionConfig) -> Result<Arc<dyn SearchService>, SearchError> + Send + Sync>;

/// The factory used when none is supplied: an OpenSearch transport.
pub fn opensearch_factory() -> ServiceFactory {
    Arc::new(|config: &ConnectionConfig| {
        let service = OpenSearchService::new(config)?;
        Ok(Arc::new(service) as Arc<dyn SearchService>)
    })
}

/// Owns the single remote service handle of a connection.
pub struct ClientLifecycle {
    config: ConnectionConfig,
    factory: ServiceFactory,
    handle: OnceCell<Arc<dyn SearchService>>,
    disposed: AtomicBool,
    released: AtomicBool,
}

impl ClientLifecycle {
    /// Create a lifecycle; nothing is built until the first access.
    ///
    /// Fails with `InvalidArgument` when the service name or key is blank.
    pub fn new(config: ConnectionConfig, factory: ServiceFactory) -> Result<Self, SearchError> {
        config.validate()?;

        Ok(Self {
            config,
            factory,
            handle: OnceCell::new(),
            disposed: AtomicBool::new(false),
            released: AtomicBool::new(false),
        })
    }

    /// The connection config.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The service handle, built on first access.
    ///
    /// A handle that finishes building after `dispose` is released here and
    /// never handed out.
    pub async fn client(&self) -> Result<Arc<dyn SearchService>, SearchError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(SearchError::Disposed);
        }

        let handle = self
            .handle
            .get_or_try_init(|| async { self.build() })
            .await?;

        fence(Ordering::SeqCst);
        if self.disposed.load(Ordering::SeqCst) {
            self.release(handle);
            return Err(SearchError::Disposed);
        }

        Ok(handle.clone())
    }

    fn build(&self) -> Result<Arc<dyn SearchService>, SearchError> {
        let service = (self.factory)(&self.config)?;

        let service = match self.config.retry {
            Some(policy) if policy.max_retries > 0 => {
                Arc::new(RetryingService::new(service, policy)) as Arc<dyn SearchService>
            }
            _ => service,
        };

        info!(
            service = %self.config.service_name,
            retries = self.config.retry.map(|p| p.max_retries).unwrap_or(0),
            "Created search service client"
        );

        Ok(service)
    }

    /// Whether the handle has been built.
    pub fn is_initialized(&self) -> bool {
        self.handle.initialized()
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Release the handle if it was built. Safe to call any number of times.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        fence(Ordering::SeqCst);
        if let Some(handle) = self.handle.get() {
            self.release(handle);
        }
    }

    fn release(&self, handle: &Arc<dyn SearchService>) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        handle.release();
        debug!(service = %self.config.service_name, "Released search service client");
    }
}

impl Drop for ClientLifecycle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ClientLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientLifecycle")
            .field("service_name", &self.config.service_name)
            .field("initialized", &self.is_initialized())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{IndexBatch, IndexingResult};
    use crate::config::IndexTarget;
    use crate::retry::RetryPolicy;
    use crate::types::{IndexDefinition, ServiceResponse};
    use async_trait::async_trait;
    use search_client_shared::{IndexStatistics, SearchParameters};
    use std::sync::atomic::AtomicUsize;

    struct CountingService {
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchService for CountingService {
        async fn index_exists(&self, _index: &str) -> Result<bool, SearchError> {
            Ok(true)
        }

        async fn create_index(
            &self,
            _definition: &IndexDefinition,
        ) -> Result<Option<IndexDefinition>, SearchError> {
            Ok(None)
        }

        async fn delete_index(&self, _index: &str) -> Result<(), SearchError> {
            Ok(())
        }

        async fn index_statistics(&self, _index: &str) -> Result<IndexStatistics, SearchError> {
            Ok(IndexStatistics::default())
        }

        async fn submit_batch(
            &self,
            _index: &str,
            _batch: &IndexBatch,
        ) -> Result<Option<Vec<IndexingResult>>, SearchError> {
            Ok(None)
        }

        async fn search(
            &self,
            _index: &str,
            _parameters: &SearchParameters,
            _search_text: Option<&str>,
        ) -> Result<ServiceResponse, SearchError> {
            Err(SearchError::transport("unused"))
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("svc", "key", IndexTarget::Single("hotels".to_string())).unwrap()
    }

    fn counting_factory(
        built: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    ) -> ServiceFactory {
        Arc::new(move |_config: &ConnectionConfig| -> Result<Arc<dyn SearchService>, SearchError> {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingService {
                released: released.clone(),
            }) as Arc<dyn SearchService>)
        })
    }

    #[tokio::test]
    async fn test_handle_is_lazy_and_memoized() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let lifecycle =
            ClientLifecycle::new(config(), counting_factory(built.clone(), released)).unwrap();

        assert!(!lifecycle.is_initialized());
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let first = lifecycle.client().await.unwrap();
        let second = lifecycle.client().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_builds_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let lifecycle = Arc::new(
            ClientLifecycle::new(config(), counting_factory(built.clone(), released)).unwrap(),
        );

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.client().await.unwrap() })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_dispose_before_access_is_noop() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let lifecycle =
            ClientLifecycle::new(config(), counting_factory(built.clone(), released.clone()))
                .unwrap();

        lifecycle.dispose();
        lifecycle.dispose();

        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert!(matches!(lifecycle.client().await, Err(SearchError::Disposed)));
    }

    #[tokio::test]
    async fn test_dispose_releases_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let lifecycle =
            ClientLifecycle::new(config(), counting_factory(built, released.clone())).unwrap();

        lifecycle.client().await.unwrap();
        lifecycle.dispose();
        lifecycle.dispose();
        drop(lifecycle);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispose_during_build_releases_new_handle() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let inner = counting_factory(built.clone(), released.clone());
        let slow: ServiceFactory = Arc::new(move |config: &ConnectionConfig| {
            std::thread::sleep(std::time::Duration::from_millis(200));
            inner(config)
        });
        let lifecycle = Arc::new(ClientLifecycle::new(config(), slow).unwrap());

        let pending = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.client().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        lifecycle.dispose();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(SearchError::Disposed)));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        lifecycle.dispose();
        drop(lifecycle);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_retried_on_next_access() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let factory: ServiceFactory = Arc::new(move |_config: &ConnectionConfig| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SearchError::transport("dns failure"));
            }
            Ok(Arc::new(CountingService {
                released: Arc::new(AtomicUsize::new(0)),
            }) as Arc<dyn SearchService>)
        });
        let lifecycle = ClientLifecycle::new(config(), factory).unwrap();

        assert!(lifecycle.client().await.is_err());
        assert!(!lifecycle.is_initialized());
        assert!(lifecycle.client().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_policy_wraps_handle() {
        let built = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let config = config().with_retry(RetryPolicy::default());
        let lifecycle =
            ClientLifecycle::new(config, counting_factory(built, released.clone())).unwrap();

        let client = lifecycle.client().await.unwrap();
        assert!(client.index_exists("hotels").await.unwrap());

        lifecycle.dispose();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blank_config_rejected_before_any_work() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut config = config();
        config.service_key = " ".to_string();

        let result = ClientLifecycle::new(
            config,
            counting_factory(built.clone(), Arc::new(AtomicUsize::new(0))),
        );

        assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }
}
