use std::time::Duration;

/// Tuning knobs for the inbound pipeline.
#[derive(Debug, Clone)]
pub struct InboundConfig {
    pub max_concurrent_messages: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub job_timeout: Duration,
    pub staleness: Duration,
    pub audio_dir: String,
    pub audio_max_age: Duration,
    pub audio_janitor_interval: Duration,
    pub queue_retention: Duration,
    pub queue_janitor_interval: Duration,
    pub metrics_log_every: u64,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            max_concurrent_messages: 5,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            job_timeout: Duration::from_secs(30),
            staleness: Duration::from_secs(5 * 60),
            audio_dir: "./audios".to_owned(),
            audio_max_age: Duration::from_secs(60 * 60),
            audio_janitor_interval: Duration::from_secs(15 * 60),
            queue_retention: Duration::from_secs(24 * 60 * 60),
            queue_janitor_interval: Duration::from_secs(60 * 60),
            metrics_log_every: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = InboundConfig::default();
        assert_eq!(config.max_concurrent_messages, 5);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_secs(2));
        assert_eq!(config.job_timeout, Duration::from_secs(30));
        assert_eq!(config.staleness, Duration::from_secs(300));
        assert_eq!(config.audio_max_age, Duration::from_secs(3600));
        assert_eq!(config.audio_janitor_interval, Duration::from_secs(900));
        assert_eq!(config.queue_retention, Duration::from_secs(86_400));
    }
}
