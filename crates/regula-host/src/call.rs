//! Timeout, bounded retry and cancellation around external calls.

use std::future::Future;
use std::time::Duration;

use regula_core::ExternalError;
use regula_core::config::ServiceConfig;
use tracing::warn;

use crate::cancel::CancelToken;

/// Budget for one external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries after the first attempt; only transient failures are retried.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry.
    pub base_delay: Duration,
}

impl CallPolicy {
    pub fn generation(config: &ServiceConfig) -> Self {
        Self {
            timeout: config.generation_timeout(),
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
        }
    }

    pub fn search(config: &ServiceConfig) -> Self {
        Self {
            timeout: config.search_timeout(),
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
        }
    }

    fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Run `op` under `policy`, aborting as soon as `cancel` fires.
pub async fn call_with_policy<T, F, Fut>(
    service: &'static str,
    policy: &CallPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, ExternalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExternalError>>,
{
    let mut retry = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ExternalError::Cancelled { service });
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExternalError::Cancelled { service }),
            result = tokio::time::timeout(policy.timeout, op()) => match result {
                Ok(inner) => inner,
                Err(_) => Err(ExternalError::Timeout {
                    service,
                    elapsed_ms: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_before(retry);
                warn!(
                    service,
                    retry,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "retrying external call"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ExternalError::Cancelled { service }),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(50),
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = call_with_policy("generation", &policy(2), &CancelToken::new(), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ExternalError::failed("generation", "503", true))
                } else {
                    Ok("jawaban")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "jawaban");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> =
            call_with_policy("generation", &policy(3), &CancelToken::new(), || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ExternalError::failed("generation", "400", false))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> =
            call_with_policy("dense-search", &policy(1), &CancelToken::new(), || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ExternalError::failed("dense-search", "connection refused", true))
                }
            })
            .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let result: Result<(), _> =
            call_with_policy("generation", &policy(0), &CancelToken::new(), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(ExternalError::Timeout { service: "generation", elapsed_ms: 50 })
        ));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_call() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let long = CallPolicy {
            timeout: Duration::from_secs(5),
            ..policy(0)
        };
        let result: Result<(), _> = call_with_policy("generation", &long, &cancel, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ExternalError::Cancelled { .. })));
    }

    #[test]
    fn backoff_doubles() {
        let p = CallPolicy {
            timeout: Duration::from_secs(1),
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(p.delay_before(1), Duration::from_millis(100));
        assert_eq!(p.delay_before(2), Duration::from_millis(200));
        assert_eq!(p.delay_before(3), Duration::from_millis(400));
    }
}
