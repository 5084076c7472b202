//! Retry utilities for remote operations.
//!
//! Wraps `backon` with an exponential backoff whose bounds come from
//! [`RetryConfig`], so callers only decide which errors are retryable.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: 1,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Total attempts, including the first one. Always at least 1.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.max_retries = attempts.saturating_sub(1) as usize;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Run `operation`, retrying errors for which `is_retryable` holds.
///
/// Each retry is logged at debug level with `context` and the short error
/// message. Non-retryable errors are returned immediately.
///
/// ```ignore
/// let token = with_retry(
///     || client.issue_token(&username, &password, TOKEN_LABEL),
///     GiteaError::is_retryable,
///     short_error_message,
///     "issue_token",
///     RetryConfig::default().with_attempts(2),
/// )
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut, IsRetryable, ShortMsg>(
    mut operation: F,
    is_retryable: IsRetryable,
    short_message: ShortMsg,
    context: &str,
    config: RetryConfig,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
    ShortMsg: Fn(&E) -> String,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::debug!(
                context,
                attempt = attempt.load(Ordering::SeqCst),
                retry_in_ms = dur.as_millis() as u64,
                error = %short_message(err),
                "Retrying remote operation"
            );
        })
        .when(|e| is_retryable(e))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn default_config_allows_one_retry() {
        let config = RetryConfig::default();
        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, 1);
        assert!(config.with_jitter);
    }

    #[test]
    fn attempts_translate_to_retries() {
        assert_eq!(RetryConfig::default().with_attempts(3).max_retries, 2);
        assert_eq!(RetryConfig::default().with_attempts(1).max_retries, 0);
        assert_eq!(RetryConfig::default().with_attempts(0).max_retries, 0);
        assert!(!RetryConfig::default().with_jitter(false).with_jitter);
    }

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_retry(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError { transient: true })
                    } else {
                        Ok(7u32)
                    }
                }
            },
            |e: &TestError| e.transient,
            |_| "transient".to_string(),
            "test",
            RetryConfig::default().with_attempts(3),
        )
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_configured_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result: Result<(), TestError> = with_retry(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError { transient: true })
                }
            },
            |e: &TestError| e.transient,
            |_| "transient".to_string(),
            "test",
            RetryConfig::default().with_attempts(2),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result: Result<(), TestError> = with_retry(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError { transient: false })
                }
            },
            |e: &TestError| e.transient,
            |_| "permanent".to_string(),
            "test",
            RetryConfig::default().with_attempts(5),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
