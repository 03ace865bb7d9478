//! Tunables for session lifecycle, QR filtering, and reconnect behavior.
//!
//! An immutable `Config` plus a consuming builder, with every field
//! defaulted.

use std::env;
use std::time::Duration;

/// Configuration for the gateway core, constructible from the environment
/// via `GatewayConfig::from_env`.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    auth_root: Box<str>,
    max_sessions: usize,
    idle_ttl: Duration,
    idle_sweep_interval: Duration,

    qr_max_sends: u32,
    qr_throttle: Duration,
    qr_expires: Duration,

    fast_attempts: u32,
    fast_backoff_base: Duration,
    fast_backoff_max: Duration,
    resilience_schedule: Vec<Duration>,
    resilience_max_duration: Duration,

    send_timeout: Duration,
    send_retries: u32,
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut builder = Self::builder();

        if let Ok(root) = env::var("WA_AUTH_ROOT") {
            builder = builder.auth_root(root);
        }
        if let Some(v) = env_parse("WA_MAX_SESSIONS") {
            builder = builder.max_sessions(v);
        }
        if let Some(v) = env_parse_secs("WA_IDLE_TTL_SECS") {
            builder = builder.idle_ttl(v);
        }
        if let Some(v) = env_parse("WA_QR_MAX_SENDS") {
            builder = builder.qr_max_sends(v);
        }
        if let Some(v) = env_parse("WA_RECONNECT_FAST_ATTEMPTS") {
            builder = builder.fast_attempts(v);
        }
        if let Some(v) = env_parse("WA_SEND_RETRIES") {
            builder = builder.send_retries(v);
        }

        builder.build()
    }

    pub fn auth_root(&self) -> &str {
        &self.auth_root
    }

    pub const fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub const fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub const fn idle_sweep_interval(&self) -> Duration {
        self.idle_sweep_interval
    }

    pub const fn qr_max_sends(&self) -> u32 {
        self.qr_max_sends
    }

    pub const fn qr_throttle(&self) -> Duration {
        self.qr_throttle
    }

    pub const fn qr_expires(&self) -> Duration {
        self.qr_expires
    }

    pub const fn fast_attempts(&self) -> u32 {
        self.fast_attempts
    }

    pub const fn fast_backoff_base(&self) -> Duration {
        self.fast_backoff_base
    }

    pub const fn fast_backoff_max(&self) -> Duration {
        self.fast_backoff_max
    }

    pub fn resilience_schedule(&self) -> &[Duration] {
        &self.resilience_schedule
    }

    pub const fn resilience_max_duration(&self) -> Duration {
        self.resilience_max_duration
    }

    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub const fn send_retries(&self) -> u32 {
        self.send_retries
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug)]
#[must_use = "builder must be completed to be used"]
pub struct GatewayConfigBuilder {
    inner: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn new() -> Self {
        Self {
            inner: GatewayConfig {
                auth_root: "./auth".into(),
                max_sessions: 200,
                idle_ttl: Duration::from_secs(24 * 60 * 60),
                idle_sweep_interval: Duration::from_secs(60 * 60),
                qr_max_sends: 4,
                qr_throttle: Duration::from_millis(5_000),
                qr_expires: Duration::from_millis(60_000),
                fast_attempts: 5,
                fast_backoff_base: Duration::from_secs(2),
                fast_backoff_max: Duration::from_secs(32),
                resilience_schedule: vec![
                    Duration::from_secs(60),
                    Duration::from_secs(5 * 60),
                    Duration::from_secs(15 * 60),
                ],
                resilience_max_duration: Duration::from_secs(60 * 60),
                send_timeout: Duration::from_secs(15),
                send_retries: 3,
            },
        }
    }

    pub fn build(self) -> GatewayConfig {
        self.inner
    }

    pub fn auth_root(mut self, auth_root: impl Into<String>) -> Self {
        self.inner.auth_root = auth_root.into().into_boxed_str();
        self
    }

    pub const fn max_sessions(mut self, max_sessions: usize) -> Self {
        self.inner.max_sessions = max_sessions;
        self
    }

    pub const fn idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.inner.idle_ttl = idle_ttl;
        self
    }

    pub const fn qr_max_sends(mut self, qr_max_sends: u32) -> Self {
        self.inner.qr_max_sends = qr_max_sends;
        self
    }

    pub const fn fast_attempts(mut self, fast_attempts: u32) -> Self {
        self.inner.fast_attempts = fast_attempts;
        self
    }

    pub const fn send_retries(mut self, send_retries: u32) -> Self {
        self.inner.send_retries = send_retries;
        self
    }
}

impl Default for GatewayConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_parse_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_specified_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_sessions(), 200);
        assert_eq!(config.qr_max_sends(), 4);
        assert_eq!(config.fast_attempts(), 5);
        assert_eq!(config.resilience_schedule().len(), 3);
    }

    #[test]
    fn builder_overrides_take_effect() {
        let config = GatewayConfig::builder().max_sessions(10).qr_max_sends(2).build();
        assert_eq!(config.max_sessions(), 10);
        assert_eq!(config.qr_max_sends(), 2);
    }
}
