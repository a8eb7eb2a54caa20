//! Blockhash-staleness retry
//!
//! A transaction that failed because its recent blockhash aged out cannot be
//! resent verbatim. The operation handed to [`with_blockhash_retry`] must fetch
//! a fresh blockhash and rebuild the transaction on every call.

use super::nonce_errors::NonceError;
use crate::metrics::metrics;
use crate::rpc_manager::SolanaRpcError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Errors that can report a stale ledger-liveness token
pub trait LivenessError {
    fn is_stale_liveness(&self) -> bool;
}

impl LivenessError for SolanaRpcError {
    fn is_stale_liveness(&self) -> bool {
        self.is_blockhash_expired()
    }
}

impl LivenessError for NonceError {
    fn is_stale_liveness(&self) -> bool {
        matches!(self, NonceError::Rpc(e) if e.is_blockhash_expired())
    }
}

/// Retry policy for blockhash expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockhashRetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for BlockhashRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl BlockhashRetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// Run `build_and_send`, retrying only on stale-blockhash errors.
///
/// Any other error, or the error of the final attempt, is returned unchanged.
pub async fn with_blockhash_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &BlockhashRetryPolicy,
    mut build_and_send: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: LivenessError + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match build_and_send().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt,
                        "Operation succeeded after blockhash refresh"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_stale_liveness() && attempt < max_attempts => {
                debug!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "Stale blockhash, rebuilding transaction"
                );
                metrics().blockhash_retries.inc();
                sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_stale_liveness() {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "All blockhash retry attempts exhausted"
                    );
                } else {
                    warn!(
                        operation = operation_name,
                        error = %err,
                        "Permanent error, not retrying"
                    );
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn stale(n: u32) -> SolanaRpcError {
        SolanaRpcError::BlockhashExpired {
            message: format!("attempt {n}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_first_attempt() {
        let policy = BlockhashRetryPolicy::default();
        let result =
            with_blockhash_retry("test_op", &policy, || async { Ok::<_, SolanaRpcError>(42) })
                .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_unwrapped() {
        let policy = BlockhashRetryPolicy::new(4, 100);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<(), _> = with_blockhash_retry("test_op", &policy, || {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(stale(n)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result, Err(stale(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_liveness_error_bypasses_retry() {
        let policy = BlockhashRetryPolicy::new(5, 100);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<(), _> = with_blockhash_retry("test_op", &policy, || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(SolanaRpcError::Transport { message: "reset".to_string() }) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(SolanaRpcError::Transport { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_stale_blockhash() {
        let policy = BlockhashRetryPolicy::new(3, 250);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let started = tokio::time::Instant::now();

        let result = with_blockhash_retry("test_op", &policy, || {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(stale(n))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        // two sleeps between three attempts
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonce_error_liveness_passthrough() {
        let policy = BlockhashRetryPolicy::new(2, 10);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<(), NonceError> = with_blockhash_retry("test_op", &policy, || {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(NonceError::Rpc(stale(n))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result, Err(NonceError::Rpc(stale(2))));
    }
}
