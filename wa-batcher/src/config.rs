use std::time::Duration;

/// Tuning knobs for [`crate::OutboundBatcher`].
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Coalesced entries in either map at or above this count trigger an
    /// immediate flush instead of waiting for the periodic timer.
    pub batch_size: usize,
    pub qr_batch_interval: Duration,
    pub status_priority_interval: Duration,
    pub qr_reentry_gap: Duration,
    pub status_high_reentry_gap: Duration,
    pub status_normal_reentry_gap: Duration,
    pub failure_threshold: u32,
    pub circuit_reset_timeout: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            qr_batch_interval: Duration::from_secs(5),
            status_priority_interval: Duration::from_secs(1),
            qr_reentry_gap: Duration::from_secs(1),
            status_high_reentry_gap: Duration::from_millis(500),
            status_normal_reentry_gap: Duration::from_secs(1),
            failure_threshold: 5,
            circuit_reset_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = BatcherConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.qr_batch_interval, Duration::from_secs(5));
        assert_eq!(config.status_priority_interval, Duration::from_secs(1));
        assert_eq!(config.qr_reentry_gap, Duration::from_secs(1));
        assert_eq!(config.status_high_reentry_gap, Duration::from_millis(500));
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.circuit_reset_timeout, Duration::from_secs(60));
    }
}
