//! The two-phase reconnect delay function. Pure and independently unit-tested (property
//! P6) — no I/O, no sleeping, just `attempt -> Duration`.

use std::time::Duration;
use wa_model::ReconnectMode;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub fast_attempts: u32,
    pub fast_backoff_base: Duration,
    pub fast_backoff_max: Duration,
    pub resilience_schedule: Vec<Duration>,
    pub resilience_max_duration: Duration,
}

impl ReconnectPolicy {
    /// Which phase `attempt` (1-indexed) falls into.
    pub fn phase_for(&self, attempt: u32) -> ReconnectMode {
        if attempt <= self.fast_attempts {
            ReconnectMode::Fast
        } else {
            ReconnectMode::Resilience
        }
    }

    /// The delay before the `attempt`-th reconnect try.
    ///
    /// Fast phase (`attempt <= fast_attempts`): `min(base * 2^(n-1), max)`.
    /// Resilience phase: cycles through `resilience_schedule` by index.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        match self.phase_for(attempt) {
            ReconnectMode::Fast => {
                let exp = self
                    .fast_backoff_base
                    .checked_mul(1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX))
                    .unwrap_or(self.fast_backoff_max);
                exp.min(self.fast_backoff_max)
            }
            ReconnectMode::Resilience => {
                if self.resilience_schedule.is_empty() {
                    return self.fast_backoff_max;
                }
                let idx = (attempt - self.fast_attempts - 1) as usize % self.resilience_schedule.len();
                self.resilience_schedule[idx]
            }
            ReconnectMode::None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            fast_attempts: 5,
            fast_backoff_base: Duration::from_secs(2),
            fast_backoff_max: Duration::from_secs(32),
            resilience_schedule: vec![
                Duration::from_secs(60),
                Duration::from_secs(5 * 60),
                Duration::from_secs(15 * 60),
            ],
            resilience_max_duration: Duration::from_secs(60 * 60),
        }
    }

    #[test]
    fn fast_phase_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.next_delay(1), Duration::from_secs(2));
        assert_eq!(p.next_delay(2), Duration::from_secs(4));
        assert_eq!(p.next_delay(3), Duration::from_secs(8));
        assert_eq!(p.next_delay(4), Duration::from_secs(16));
        assert_eq!(p.next_delay(5), Duration::from_secs(32));
    }

    #[test]
    fn resilience_phase_cycles_schedule() {
        let p = policy();
        assert_eq!(p.next_delay(6), Duration::from_secs(60));
        assert_eq!(p.next_delay(7), Duration::from_secs(5 * 60));
        assert_eq!(p.next_delay(8), Duration::from_secs(15 * 60));
        assert_eq!(p.next_delay(9), Duration::from_secs(60));
    }

    #[test]
    fn phase_for_switches_at_fast_attempts_boundary() {
        let p = policy();
        assert_eq!(p.phase_for(5), ReconnectMode::Fast);
        assert_eq!(p.phase_for(6), ReconnectMode::Resilience);
    }
}
