//! `MessageReceiver`: the worker pool that drains the [`crate::queue::InboundQueue`]
//! and pushes normalized messages to a tenant's webhook.

use crate::content::{extract_audio_ref, extract_content};
use crate::error::{InboundError, Result};
use crate::filter::{is_from_me, is_protocol_noise, is_stale, is_valid_sender_jid};
use crate::identity::resolve_sender;
use crate::media::download_audio;
use crate::metrics::PipelineMetrics;
use crate::queue::InboundQueue;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wa_control_client::{ControlPlaneClient, WebhookAudio, WebhookMessage};
use wa_model::{InboundJob, SessionId};

pub struct MessageReceiver {
    queue: Arc<InboundQueue>,
    control: Arc<ControlPlaneClient>,
    auth_root: String,
    lid_tables: DashMap<SessionId, Arc<DashMap<String, String>>>,
    webhook_tokens: DashMap<SessionId, String>,
    metrics: Arc<PipelineMetrics>,
}

impl MessageReceiver {
    pub fn new(queue: Arc<InboundQueue>, control: Arc<ControlPlaneClient>, auth_root: impl Into<String>) -> Self {
        Self {
            queue,
            control,
            auth_root: auth_root.into(),
            lid_tables: DashMap::new(),
            webhook_tokens: DashMap::new(),
            metrics: Arc::new(PipelineMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawns `worker_count` tasks draining the queue concurrently
    /// (`max_concurrent_messages`).
    pub fn spawn_workers(self: &Arc<Self>, worker_count: usize) -> Vec<tokio::task::JoinHandle<()>> {
        (0..worker_count)
            .map(|worker_id| {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.run_worker(worker_id).await })
            })
            .collect()
    }

    async fn run_worker(&self, worker_id: usize) {
        loop {
            let leased = match self.queue.next(Duration::from_millis(500)).await {
                Ok(Some(leased)) => leased,
                Ok(None) => continue,
                Err(err) => {
                    tracing::error!(worker_id, error = %err, "inbound worker failed to lease a job");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let started = Instant::now();
            let outcome = match tokio::time::timeout(self.queue.config().job_timeout, self.process(&leased.job)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(InboundError::job_timed_out(leased.job.session_id.as_str())),
            };
            let success = outcome.is_ok();
            self.metrics.record(started.elapsed(), success, self.queue.config().metrics_log_every);

            match outcome {
                Ok(()) => {
                    if let Err(err) = self.queue.complete(&leased.job_id).await {
                        tracing::warn!(error = %err, "failed to mark inbound job complete");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, session_id = %leased.job.session_id, "inbound job failed, retrying");
                    let delay = crate::retry::next_delay(self.queue.config().backoff_base, leased.job.attempts + 1);
                    tokio::time::sleep(delay).await;
                    if let Err(err) = self.queue.fail(&leased.job_id, &leased.job).await {
                        tracing::error!(error = %err, "failed to requeue inbound job");
                    }
                }
            }
        }
    }

    async fn process(&self, job: &InboundJob) -> Result<()> {
        let raw = &job.raw_message;

        if is_protocol_noise(raw) || is_from_me(raw) {
            return Ok(());
        }
        if is_stale(raw, wa_model::now(), self.queue.config().staleness) {
            return Ok(());
        }

        let remote_jid = raw.pointer("/key/remoteJid").and_then(|v| v.as_str()).unwrap_or_default();
        if !is_valid_sender_jid(remote_jid) {
            return Ok(());
        }

        let lid_table = Arc::clone(
            self.lid_tables
                .entry(job.session_id.clone())
                .or_insert_with(|| Arc::new(DashMap::new()))
                .value(),
        );
        let phone = resolve_sender(raw, &lid_table, &self.auth_root, job.session_id.as_str()).await;

        let Some(content) = extract_content(raw) else {
            return Ok(());
        };
        if matches!(content.kind, wa_model::MessageKind::Unknown) {
            return Ok(());
        }
        if matches!(content.kind, wa_model::MessageKind::Text) && content.text.as_deref().unwrap_or("").is_empty() {
            return Ok(());
        }

        let wam_id = raw.pointer("/key/id").and_then(|v| v.as_str()).unwrap_or_default().to_owned();
        let push_name = raw.get("pushName").and_then(|v| v.as_str()).map(str::to_owned);
        let timestamp = raw.get("messageTimestamp").and_then(|v| v.as_i64()).unwrap_or_else(|| wa_model::now().timestamp());

        let audio = if matches!(content.kind, wa_model::MessageKind::Audio) {
            if let Some(media) = extract_audio_ref(raw) {
                let path = download_audio(&self.queue.config().audio_dir, &phone, &wam_id, &media).await?;
                let bytes = tokio::fs::read(&path).await.map_err(InboundError::media)?;
                Some(WebhookAudio {
                    file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                    mime_type: media.mime_type.to_owned(),
                    bytes,
                })
            } else {
                None
            }
        } else {
            None
        };

        let webhook_token = self.webhook_token(&job.session_id).await?;

        let message = WebhookMessage {
            from: phone,
            text: content.text,
            kind: kind_wire(content.kind),
            wam_id,
            timestamp,
            push_name,
            audio,
        };

        self.control
            .post_webhook_message(&webhook_token, message)
            .await
            .map_err(|err| InboundError::webhook_delivery(job.session_id.as_str(), Box::new(err)))
    }

    async fn webhook_token(&self, session_id: &SessionId) -> Result<String> {
        if let Some(token) = self.webhook_tokens.get(session_id) {
            return Ok(token.clone());
        }
        let info = self
            .control
            .account(session_id.as_str())
            .await
            .map_err(|err| InboundError::webhook_delivery(session_id.as_str(), Box::new(err)))?;
        self.webhook_tokens.insert(session_id.clone(), info.webhook_token.clone());
        Ok(info.webhook_token)
    }
}

fn kind_wire(kind: wa_model::MessageKind) -> String {
    match kind {
        wa_model::MessageKind::Text => "text",
        wa_model::MessageKind::Image => "image",
        wa_model::MessageKind::Audio => "audio",
        wa_model::MessageKind::Video => "video",
        wa_model::MessageKind::Document => "document",
        wa_model::MessageKind::Protocol | wa_model::MessageKind::Unknown => "unknown",
    }
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InboundConfig;
    use crate::store::test_support::InMemoryQueueStore;
    use serde_json::json;
    use wa_control_client::ClientConfig;

    fn receiver() -> MessageReceiver {
        let queue = Arc::new(InboundQueue::new(Arc::new(InMemoryQueueStore::default()), InboundConfig::default()));
        let control = Arc::new(ControlPlaneClient::new(ClientConfig::new("http://127.0.0.1:0")).unwrap());
        MessageReceiver::new(queue, control, "/tmp/wa-inbound-receiver-test")
    }

    #[tokio::test]
    async fn protocol_noise_is_a_no_op_success() {
        let receiver = receiver();
        let job = InboundJob::new(SessionId::new("s1"), json!({"message": {"protocolMessage": {}}}));
        assert!(receiver.process(&job).await.is_ok());
    }

    #[tokio::test]
    async fn from_me_is_a_no_op_success() {
        let receiver = receiver();
        let job = InboundJob::new(
            SessionId::new("s1"),
            json!({"key": {"fromMe": true, "remoteJid": "5511@s.whatsapp.net"}, "message": {"conversation": "hi"}}),
        );
        assert!(receiver.process(&job).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_sender_jid_is_a_no_op_success() {
        let receiver = receiver();
        let job = InboundJob::new(
            SessionId::new("s1"),
            json!({"key": {"remoteJid": "broadcast@g.us"}, "message": {"conversation": "hi"}}),
        );
        assert!(receiver.process(&job).await.is_ok());
    }

    #[tokio::test]
    async fn valid_text_message_attempts_webhook_delivery_and_surfaces_its_failure() {
        let receiver = receiver();
        let job = InboundJob::new(
            SessionId::new("s1"),
            json!({"key": {"remoteJid": "5511999@s.whatsapp.net", "id": "WAM1"}, "message": {"conversation": "hi"}}),
        );
        // The control plane is unreachable in this test, so delivery must
        // fail loudly rather than being silently swallowed.
        assert!(receiver.process(&job).await.is_err());
    }
}
