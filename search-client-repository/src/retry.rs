//! Retry policy for transient service faults.
//!
//! `RetryingService` wraps any `SearchService` and re-attempts calls that
//! fail with a transient fault, doubling the delay between attempts up to a
//! configured maximum.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::batch::{IndexBatch, IndexingResult};
use crate::errors::SearchError;
use crate::interfaces::SearchService;
use crate::types::{IndexDefinition, ServiceResponse};
use search_client_shared::{IndexStatistics, SearchParameters};

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Create a policy with custom settings.
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay)
    }

    /// Run `operation`, retrying transient faults with exponential backoff.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, SearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempt = attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    debug!(operation = operation_name, error = %e, "Non-retryable error encountered");
                    return Err(e);
                }
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fault, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// A `SearchService` that retries transient faults of the wrapped service.
pub struct RetryingService {
    inner: Arc<dyn SearchService>,
    policy: RetryPolicy,
}

impl RetryingService {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn SearchService>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl SearchService for RetryingService {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        self.policy
            .run("index_exists", move || self.inner.index_exists(index))
            .await
    }

    async fn create_index(
        &self,
        definition: &IndexDefinition,
    ) -> Result<Option<IndexDefinition>, SearchError> {
        self.policy
            .run("create_index", move || self.inner.create_index(definition))
            .await
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        self.policy
            .run("delete_index", move || self.inner.delete_index(index))
            .await
    }

    async fn index_statistics(&self, index: &str) -> Result<IndexStatistics, SearchError> {
        self.policy
            .run("index_statistics", move || self.inner.index_statistics(index))
            .await
    }

    async fn submit_batch(
        &self,
        index: &str,
        batch: &IndexBatch,
    ) -> Result<Option<Vec<IndexingResult>>, SearchError> {
        self.policy
            .run("submit_batch", move || self.inner.submit_batch(index, batch))
            .await
    }

    async fn search(
        &self,
        index: &str,
        parameters: &SearchParameters,
        search_text: Option<&str>,
    ) -> Result<ServiceResponse, SearchError> {
        self.policy
            .run("search", move || self.inner.search(index, parameters, search_text))
            .await
    }

    fn release(&self) {
        self.inner.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` existence checks with `fault`.
    struct FlakyService {
        calls: Arc<AtomicUsize>,
        failures: usize,
        fault: SearchError,
    }

    #[async_trait]
    impl SearchService for FlakyService {
        async fn index_exists(&self, _index: &str) -> Result<bool, SearchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.fault.clone());
            }
            Ok(true)
        }

        async fn create_index(
            &self,
            definition: &IndexDefinition,
        ) -> Result<Option<IndexDefinition>, SearchError> {
            Ok(Some(definition.clone()))
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
            Ok(Some(vec![]))
        }

        async fn search(
            &self,
            _index: &str,
            _parameters: &SearchParameters,
            _search_text: Option<&str>,
        ) -> Result<ServiceResponse, SearchError> {
            Err(SearchError::transport("unused"))
        }
    }

    fn flaky(failures: usize, fault: SearchError) -> (FlakyService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FlakyService {
                calls: calls.clone(),
                failures,
                fault,
            },
            calls,
        )
    }

    #[test]
    fn test_delay_for_is_capped() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(10), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_faults() {
        let (service, calls) = flaky(2, SearchError::service(503, "unavailable"));
        let service = RetryingService::new(Arc::new(service), RetryPolicy::default());

        assert!(service.index_exists("hotels").await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let (service, calls) = flaky(10, SearchError::transport("reset"));
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(50));
        let service = RetryingService::new(Arc::new(service), policy);

        let err = service.index_exists("hotels").await.unwrap_err();

        assert_eq!(err, SearchError::transport("reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_faults() {
        let (service, calls) = flaky(10, SearchError::service(400, "bad request"));
        let service = RetryingService::new(Arc::new(service), RetryPolicy::default());

        assert!(service.index_exists("hotels").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_policy_runs_once() {
        let (service, calls) = flaky(1, SearchError::transport("reset"));
        let service = RetryingService::new(Arc::new(service), RetryPolicy::none());

        assert!(service.index_exists("hotels").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
