//! Retry with exponential backoff for provider calls.
//!
//! A call is attempted at most `max_retries + 1` times. The delay slept
//! before retry `k` (0-based) is `base_delay * 2^k`, capped at `max_delay`.
//! Only errors classified as transient are retried.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Errors that know whether retrying could help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to every delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::exponential(0, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another retry is allowed after `retries_done` retries.
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// What the retry loop did, for logging and for callers that surface it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryReport {
    /// Calls actually made.
    pub attempts: u32,
    /// Backoff delays slept between calls, in order.
    pub backoff: Vec<Duration>,
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// Every allowed attempt failed transiently.
    Exhausted { last: E, report: RetryReport },
    /// A non-transient failure stopped the loop.
    Permanent { error: E, report: RetryReport },
    /// The cancellation token fired before a result was available.
    Cancelled { report: RetryReport },
}

impl<E> RetryError<E> {
    pub fn report(&self) -> &RetryReport {
        match self {
            Self::Exhausted { report, .. }
            | Self::Permanent { report, .. }
            | Self::Cancelled { report } => report,
        }
    }
}

/// Run `op` under `policy`, aborting early when `cancel` fires.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<(T, RetryReport), RetryError<E>>
where
    E: Transient + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut report = RetryReport::default();

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { report });
        }

        let attempt = report.attempts;
        report.attempts += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { report }),
            result = op(attempt) => result,
        };

        let error = match result {
            Ok(value) => return Ok((value, report)),
            Err(error) => error,
        };

        if !error.is_transient() {
            log::warn!("attempt {} failed permanently: {}", report.attempts, error);
            return Err(RetryError::Permanent { error, report });
        }

        if !policy.should_retry(attempt) {
            log::warn!(
                "giving up after {} attempt(s); last error: {}",
                report.attempts,
                error
            );
            return Err(RetryError::Exhausted {
                last: error,
                report,
            });
        }

        let delay = policy.delay(attempt);
        log::warn!(
            "attempt {}/{} failed transiently ({}); retrying in {:?}",
            report.attempts,
            policy.max_attempts(),
            error,
            delay
        );
        report.backoff.push(delay);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { report }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::exponential(max_retries, Duration::from_millis(1), Duration::from_secs(1))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy =
            RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(40), Duration::from_millis(500));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_none_policy_allows_single_attempt() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(0));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let (value, report) = retry_with_backoff(
            &fast_policy(3),
            &CancellationToken::new(),
            move |_| {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError { transient: true })
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.attempts, 3);
        assert_eq!(
            report.backoff,
            vec![Duration::from_millis(1), Duration::from_millis(2)]
        );
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let result: Result<((), RetryReport), _> = retry_with_backoff(
            &fast_policy(3),
            &CancellationToken::new(),
            |_| async { Err(TestError { transient: false }) },
        )
        .await;

        match result {
            Err(RetryError::Permanent { report, .. }) => {
                assert_eq!(report.attempts, 1);
                assert!(report.backoff.is_empty());
            }
            other => panic!("expected permanent error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_exhausts_after_max_retries_plus_one() {
        let result: Result<((), RetryReport), _> = retry_with_backoff(
            &fast_policy(2),
            &CancellationToken::new(),
            |_| async { Err(TestError { transient: true }) },
        )
        .await;

        match result {
            Err(RetryError::Exhausted { report, .. }) => {
                assert_eq!(report.attempts, 3);
                assert_eq!(report.backoff.len(), 2);
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_reports_cancelled() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let policy =
            RetryPolicy::exponential(5, Duration::from_secs(30), Duration::from_secs(60));

        let result: Result<((), RetryReport), _> = retry_with_backoff(&policy, &cancel, |_| {
            trigger.cancel();
            async { Err(TestError { transient: true }) }
        })
        .await;

        match result {
            Err(RetryError::Cancelled { report }) => assert_eq!(report.attempts, 1),
            other => panic!("expected cancellation, got {:?}", other.map(|_| ())),
        }
    }
}
