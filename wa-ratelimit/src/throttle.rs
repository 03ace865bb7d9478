use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum gap between two events, used by the outbound batcher
/// to prevent flush thrash on retry and by the QR
/// controller to throttle successive emissions.
///
/// Grounded in `twilight-gateway`'s per-session heartbeat `Throttle`, which
/// wraps a single resettable delay; this variant is queried rather than
/// awaited, since callers need a yes/no answer before deciding to flush.
#[derive(Debug)]
pub struct ReentryGuard {
    min_gap: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl ReentryGuard {
    pub const fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_fired: Mutex::new(None),
        }
    }

    /// Returns `true` and records `now` as the last fire time if the gap
    /// since the previous fire (or since creation) is at least `min_gap`.
    pub fn try_fire(&self) -> bool {
        let mut last_fired = self.last_fired.lock().expect("reentry guard poisoned");
        let now = Instant::now();

        let allowed = match *last_fired {
            None => true,
            Some(previous) => now.duration_since(previous) >= self.min_gap,
        };

        if allowed {
            *last_fired = Some(now);
        }

        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_until_min_gap_elapses() {
        let guard = ReentryGuard::new(Duration::from_millis(50));
        assert!(guard.try_fire());
        assert!(!guard.try_fire());
        std::thread::sleep(Duration::from_millis(60));
        assert!(guard.try_fire());
    }
}
