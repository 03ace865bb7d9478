//! Ratelimiting primitives shared by the outbound batcher (`wa-batcher`) and
//! the reconnect controller (`wa-gateway`).
//!
//! Grounded in `twilight-http-ratelimiting`'s [`Bucket`]-style accounting of
//! a reset countdown, simplified down to the single global bucket per route
//! the control plane actually needs (it hands back no per-route ratelimit
//! headers the way Discord does).

mod backoff;
mod circuit_breaker;
mod throttle;

pub use backoff::{retry_with_backoff, BackoffSchedule, Retriable, RetryOutcome};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use throttle::ReentryGuard;
