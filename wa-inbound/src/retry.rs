//! The inbound job-level retry schedule: `delay = base * 2^(attempt-1)`, no
//! jitter.

use std::time::Duration;

pub fn next_delay(base: Duration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    base.checked_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX))
        .unwrap_or(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt_from_the_base() {
        let base = Duration::from_secs(2);
        assert_eq!(next_delay(base, 1), Duration::from_secs(2));
        assert_eq!(next_delay(base, 2), Duration::from_secs(4));
        assert_eq!(next_delay(base, 3), Duration::from_secs(8));
    }
}
