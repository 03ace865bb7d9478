use rand::Rng;
use std::time::Duration;

/// A tagged retry result, replacing the source's use of exceptions for
/// control flow.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success(T),
    /// All attempts were exhausted; carries the last error observed.
    Exhausted(E),
    /// The operation failed in a way the caller marked non-retriable.
    Fatal(E),
}

/// A fixed exponential backoff schedule with optional jitter, used for
/// non-batched control-plane retries.
///
/// `delay(n) = min(base * 2^(n-1), cap) + uniform(0, jitter)`
#[derive(Debug, Clone, Copy)]
pub struct BackoffSchedule {
    pub base: Duration,
    pub cap: Duration,
    pub jitter: Duration,
}

impl BackoffSchedule {
    pub const fn new(base: Duration, cap: Duration, jitter: Duration) -> Self {
        Self { base, cap, jitter }
    }

    /// Delay before the `attempt`-th retry (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base
            .checked_mul(1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX))
            .unwrap_or(self.cap)
            .min(self.cap);

        if self.jitter.is_zero() {
            return exp;
        }

        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis().max(1) as u64);
        exp + Duration::from_millis(jitter_ms)
    }
}

/// Classifies whether an error is worth retrying. Implemented by callers so
/// this crate stays transport-agnostic.
pub trait Retriable {
    fn is_retriable(&self) -> bool;
}

/// Runs `op` up to `attempts` times, sleeping `schedule.delay(n)` between
/// tries, short-circuiting on the first error `op` reports as non-retriable.
pub async fn retry_with_backoff<F, Fut, T, E>(
    attempts: u32,
    schedule: BackoffSchedule,
    mut op: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retriable,
{
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(err) => {
                if !err.is_retriable() {
                    return RetryOutcome::Fatal(err);
                }
                last_err = Some(err);
                if attempt < attempts {
                    tokio::time::sleep(schedule.delay(attempt)).await;
                }
            }
        }
    }

    RetryOutcome::Exhausted(last_err.expect("attempts >= 1 guarantees at least one error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_caps_and_grows_exponentially() {
        let schedule = BackoffSchedule::new(Duration::from_secs(2), Duration::from_secs(32), Duration::ZERO);
        assert_eq!(schedule.delay(1), Duration::from_secs(2));
        assert_eq!(schedule.delay(2), Duration::from_secs(4));
        assert_eq!(schedule.delay(3), Duration::from_secs(8));
        assert_eq!(schedule.delay(4), Duration::from_secs(16));
        assert_eq!(schedule.delay(5), Duration::from_secs(32));
        assert_eq!(schedule.delay(6), Duration::from_secs(32));
    }

    struct Always;
    impl Retriable for Always {
        fn is_retriable(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn exhausts_after_configured_attempts() {
        let schedule = BackoffSchedule::new(Duration::from_millis(1), Duration::from_millis(2), Duration::ZERO);
        let mut calls = 0;
        let outcome: RetryOutcome<(), Always> = retry_with_backoff(3, schedule, |_| {
            calls += 1;
            async { Err(Always) }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted(_)));
        assert_eq!(calls, 3);
    }
}
