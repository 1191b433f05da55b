use std::future::Future;
use std::time::Duration;

use intent_types::{LedgerResult, Reason};
use serde::{Deserialize, Serialize};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay before the first retry, rounded up to even. Each later delay doubles.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay. Every delay is then jittered down by a random factor.
    pub max_backoff_ms: u64,
    /// Total attempts, the first one included.
    pub max_attempts: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            max_attempts: 10,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        self.schedule().map(jitter)
    }

    /// Delays between attempts before jitter. `ExponentialBackoff` yields `factor * base^n`,
    /// so a base of 2 with half the initial delay as factor doubles from the initial delay.
    fn schedule(&self) -> impl Iterator<Item = Duration> + use<> {
        ExponentialBackoff::from_millis(2)
            .factor(self.initial_backoff_ms.div_ceil(2).max(1))
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Runs `action` until it succeeds, fails permanently, or the attempts run out.
/// Only [`Reason::is_transient`] failures are retried.
pub async fn retry_transient<T, F, Fut>(settings: &RetrySettings, step: &'static str, action: F) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    RetryIf::spawn(settings.backoff(), action, |reason: &Reason| {
        let transient = reason.is_transient();
        if transient {
            warn!(step, %reason, "transient failure, retrying");
        }
        transient
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy_primitives::B256;

    use super::*;

    fn fast() -> RetrySettings {
        RetrySettings {
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            max_attempts: 4,
        }
    }

    #[test]
    fn test_delays_double_up_to_the_cap() {
        let delays: Vec<u64> = RetrySettings::default()
            .schedule()
            .map(|delay| delay.as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![500, 1_000, 2_000, 4_000, 8_000, 10_000, 10_000, 10_000, 10_000]
        );
        assert!(
            RetrySettings::default()
                .backoff()
                .all(|delay| delay <= Duration::from_millis(10_000))
        );
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let result = retry_transient(&fast(), "fulfillment", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Reason::IntentNotFulfilled(B256::ZERO))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_returned_at_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let result: LedgerResult<()> = retry_transient(&fast(), "withdraw", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(Reason::NothingToWithdraw) }
        })
        .await;
        assert_eq!(result, Err(Reason::NothingToWithdraw));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let result: LedgerResult<()> = retry_transient(&fast(), "output", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(Reason::OutputNotYetProposed(9)) }
        })
        .await;
        assert_eq!(result, Err(Reason::OutputNotYetProposed(9)));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
