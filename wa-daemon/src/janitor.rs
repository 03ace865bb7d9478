//! The five periodic sweeps: dead sessions, stuck pending QRs, stale
//! heartbeats, old audio files, and stale failed queue entries.
//!
//! Each runs on its own `tokio::time::interval` task rather than one
//! monolithic loop, so a slow sweep can't starve the others.

use crate::config::JanitorConfig;
use crate::facade::WhatsAppManager;
use std::sync::Arc;
use std::time::Duration;
use wa_inbound::{media, InboundQueue};

/// Spawns all five janitor tasks, returning their join handles so a caller
/// can abort them on shutdown.
pub fn spawn_all(manager: Arc<WhatsAppManager>, config: JanitorConfig, inbound: Arc<InboundQueue>) -> Vec<tokio::task::JoinHandle<()>> {
    vec![
        spawn_dead_session_sweep(Arc::clone(&manager), config.dead_session_sweep_interval),
        spawn_pending_sweep(Arc::clone(&manager), config.pending_sweep_interval, config.pending_timeout),
        spawn_heartbeat_watchdog(Arc::clone(&manager), config.heartbeat_sweep_interval, config.inactivity_threshold),
        spawn_audio_janitor(Arc::clone(&inbound)),
        spawn_queue_janitor(inbound),
    ]
}

fn spawn_dead_session_sweep(manager: Arc<WhatsAppManager>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = manager.cleanup_inactive_sessions().await;
            if !evicted.is_empty() {
                tracing::info!(count = evicted.len(), "dead-session sweep evicted idle sessions");
            }
        }
    })
}

fn spawn_pending_sweep(manager: Arc<WhatsAppManager>, interval: Duration, pending_timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = manager.cleanup_pending_sessions(pending_timeout).await;
            if !evicted.is_empty() {
                tracing::info!(count = evicted.len(), "pending sweep evicted sessions stuck awaiting a QR scan");
            }
        }
    })
}

/// Requests a fresh socket for sessions whose connection has gone quiet
/// past `inactivity_threshold` despite being marked active, rather than
/// leaving a half-dead connection in the registry. Does not touch auth or
/// the session record — a stalled heartbeat isn't the fatal-close-code or
/// reconnect-exhaustion path that warrants deleting the session outright.
fn spawn_heartbeat_watchdog(manager: Arc<WhatsAppManager>, interval: Duration, inactivity_threshold: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let threshold = chrono::Duration::from_std(inactivity_threshold).unwrap_or(chrono::Duration::zero());
        loop {
            ticker.tick().await;
            let mut stalled = 0usize;
            for session_id in manager.store().list() {
                if let Some(idle) = manager.store().last_activity_idle_for(&session_id) {
                    if idle >= threshold {
                        stalled += 1;
                        if let Err(err) = manager.request_reconnect(&session_id).await {
                            tracing::warn!(session_id = %session_id, error = %err, "heartbeat watchdog failed to request reconnect");
                        }
                    }
                }
            }
            if stalled > 0 {
                tracing::info!(count = stalled, "heartbeat watchdog requested reconnect for stalled sessions");
            }
        }
    })
}

fn spawn_audio_janitor(inbound: Arc<InboundQueue>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inbound.config().audio_janitor_interval);
        loop {
            ticker.tick().await;
            match media::clean_old_audios(&inbound.config().audio_dir, inbound.config().audio_max_age).await {
                Ok(deleted) if deleted > 0 => tracing::info!(deleted, "audio janitor cleaned stale recordings"),
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "audio janitor failed"),
            }
        }
    })
}

fn spawn_queue_janitor(inbound: Arc<InboundQueue>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inbound.config().queue_janitor_interval);
        loop {
            ticker.tick().await;
            match inbound.clean_stale_failures().await {
                Ok(removed) if removed > 0 => tracing::info!(removed, "queue janitor cleaned stale failed entries"),
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "queue janitor failed"),
            }
        }
    })
}
