//! Process entry point: reads configuration, connects the shared cache and
//! control-plane client, restores active sessions from the control plane,
//! then runs the batcher, inbound workers, and janitors until a shutdown
//! signal arrives.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wa_batcher::BatcherConfig;
use wa_cache::{CacheConfig, SharedCache};
use wa_control_client::{ClientConfig, ControlPlaneClient};
use wa_daemon::facade::{ManagerDeps, WhatsAppManager};
use wa_daemon::{janitor, AppEnv, JanitorConfig, UnimplementedConnector};
use wa_gateway::GatewayConfig;
use wa_inbound::{InboundConfig, RedisQueueStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_env = AppEnv::from_env();
    let gateway_config = GatewayConfig::from_env();
    let inbound_config = InboundConfig::default();
    let worker_count = inbound_config.max_concurrent_messages;

    let control = Arc::new(ControlPlaneClient::new(ClientConfig::new(app_env.control_plane_url.clone()))?);

    let redis_url = app_env.redis_url();
    let shared_cache = Arc::new(SharedCache::connect(&redis_url, CacheConfig::default()).await?);
    let queue_store = Arc::new(RedisQueueStore::connect(&redis_url).await?);

    let manager = WhatsAppManager::new(ManagerDeps {
        config: gateway_config,
        connector: Arc::new(UnimplementedConnector),
        control: Arc::clone(&control),
        shared_cache,
        cache_config: CacheConfig::default(),
        batcher_config: BatcherConfig::default(),
        inbound_config: inbound_config.clone(),
        queue_store,
    });

    let (started, failed) = manager.restore_active_sessions(worker_count).await;
    tracing::info!(started, failed, app_env = %app_env.app_env, "boot restoration finished");

    let _flush_handles = manager.batcher().spawn_periodic_flush();
    let _worker_handles = manager.receiver().spawn_workers(worker_count);
    let _janitor_handles = janitor::spawn_all(Arc::clone(&manager), JanitorConfig::default(), Arc::clone(manager.inbound()));

    tracing::info!(port = app_env.port, "wa-daemon ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining sessions");

    manager.shutdown(Duration::from_secs(10)).await;
    tracing::info!("shutdown complete");

    Ok(())
}
