use std::sync::Mutex;
use std::time::{Duration, Instant};

/// State of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// A single-global-bucket circuit breaker guarding calls to the control
/// plane, in the shape `twilight-http-ratelimiting`'s [`Bucket`] uses to
/// track a reset countdown (`started_at` + a fixed duration), but driven by
/// failure count instead of a response header.
///
/// Transitions: `Closed -> Open` on `failure_threshold` consecutive
/// failures; `Open -> HalfOpen` once `reset_timeout` has elapsed since
/// opening; `HalfOpen -> Closed` on one success, or back to `Open` on
/// failure.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Returns the breaker's current state, lazily moving `Open` to
    /// `HalfOpen` once the reset timeout has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        self.maybe_half_open(&mut inner);
        inner.state
    }

    fn maybe_half_open(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                }
            }
        }
    }

    /// Runs `f` through the breaker. If the breaker is `Open`, `f` is never
    /// invoked and [`CircuitOpenError`] is returned immediately (property
    /// P9). Otherwise `f`'s result determines the next transition.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().expect("circuit breaker poisoned");
            self.maybe_half_open(&mut inner);
            if inner.state == CircuitState::Open {
                return Err(CallError::CircuitOpen);
            }
        }

        match f().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CallError::Inner(err))
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        inner.consecutive_failures = 0;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed | CircuitState::Open => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug)]
pub enum CallError<E> {
    /// The breaker was open; the wrapped call was never invoked.
    CircuitOpen,
    /// The wrapped call ran and failed.
    Inner(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        for _ in 0..2 {
            let result: Result<(), CallError<&str>> =
                breaker.call(|| async { Err("boom") }).await;
            assert!(matches!(result, Err(CallError::Inner(_))));
            assert_eq!(breaker.state(), CircuitState::Closed);
        }

        let result: Result<(), CallError<&str>> = breaker.call(|| async { Err("boom") }).await;
        assert!(matches!(result, Err(CallError::Inner(_))));
        assert_eq!(breaker.state(), CircuitState::Open);

        let fast_fail: Result<(), CallError<&str>> =
            breaker.call(|| async { Ok(()) }).await;
        assert!(matches!(fast_fail, Err(CallError::CircuitOpen)));
    }

    #[tokio::test]
    async fn half_open_closes_on_success_and_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _: Result<(), CallError<&str>> = breaker.call(|| async { Err("boom") }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let ok: Result<(), CallError<&str>> = breaker.call(|| async { Ok(()) }).await;
        assert!(ok.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
