//! Tunables for the janitors and the facade's boot restoration, plus
//! the process-level environment variables that don't belong to
//! `GatewayConfig`.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JanitorConfig {
    pub dead_session_sweep_interval: Duration,
    pub pending_sweep_interval: Duration,
    pub pending_timeout: Duration,
    pub heartbeat_sweep_interval: Duration,
    pub inactivity_threshold: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            dead_session_sweep_interval: Duration::from_secs(60),
            pending_sweep_interval: Duration::from_secs(30),
            pending_timeout: Duration::from_secs(120),
            heartbeat_sweep_interval: Duration::from_secs(60),
            inactivity_threshold: Duration::from_secs(10 * 60),
        }
    }
}

/// Process-level environment, read once at startup.
#[derive(Debug, Clone)]
pub struct AppEnv {
    pub port: u16,
    pub control_plane_url: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub app_env: String,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            control_plane_url: env::var("CONTROL_PLANE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_owned()),
            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned()),
            redis_port: env::var("REDIS_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(6379),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_owned()),
        }
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn janitor_defaults_match_spec() {
        let config = JanitorConfig::default();
        assert_eq!(config.dead_session_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.pending_sweep_interval, Duration::from_secs(30));
        assert_eq!(config.pending_timeout, Duration::from_secs(120));
        assert_eq!(config.heartbeat_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.inactivity_threshold, Duration::from_secs(600));
    }
}
