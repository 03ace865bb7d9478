use std::time::Duration;

/// Configuration for the cache layers, grounded in
/// `twilight-cache-inmemory`'s `Config`/`InMemoryCacheBuilder` split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub(crate) local_ttl: Duration,
    pub(crate) qr_ttl: Duration,
    pub(crate) status_ttl: Duration,
    pub(crate) connection_ttl: Duration,
    pub(crate) session_info_ttl: Duration,
    pub(crate) lifecycle_ring_cap: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_ttl: Duration::from_secs(30),
            qr_ttl: Duration::from_secs(60),
            status_ttl: Duration::from_secs(120),
            connection_ttl: Duration::from_secs(30),
            session_info_ttl: Duration::from_secs(300),
            lifecycle_ring_cap: wa_model::LIFECYCLE_RING_CAP,
        }
    }
}

/// Builder for [`CacheConfig`].
#[derive(Clone, Debug, Default)]
pub struct CacheConfigBuilder(CacheConfig);

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> CacheConfig {
        self.0
    }

    pub fn local_ttl(mut self, ttl: Duration) -> Self {
        self.0.local_ttl = ttl;
        self
    }

    pub fn qr_ttl(mut self, ttl: Duration) -> Self {
        self.0.qr_ttl = ttl;
        self
    }

    pub fn status_ttl(mut self, ttl: Duration) -> Self {
        self.0.status_ttl = ttl;
        self
    }

    pub fn connection_ttl(mut self, ttl: Duration) -> Self {
        self.0.connection_ttl = ttl;
        self
    }

    pub fn session_info_ttl(mut self, ttl: Duration) -> Self {
        self.0.session_info_ttl = ttl;
        self
    }
}
