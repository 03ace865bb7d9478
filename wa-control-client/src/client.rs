use crate::error::{Error, Result};
use crate::model::{
    AccountInfo, ActiveAccount, QrBatchEntry, QrBatchRequest, QrBatchResponse, StatusBatchEntry,
    StatusBatchRequest, StatusBatchResponse, StatusByToken, WebhookMessage,
};
use reqwest::multipart;
use std::time::Duration;
use wa_ratelimit::{retry_with_backoff, BackoffSchedule, RetryOutcome};

/// Configuration for the pooled transport behind a [`ControlPlaneClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_idle_per_host: usize,
    pub request_timeout: Duration,
    /// Attempts for non-batched direct POSTs/GETs, default `600 ms` base and
    /// `400 ms` jitter.
    pub retry_attempts: u32,
    pub retry_schedule: BackoffSchedule,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_idle_per_host: 32,
            request_timeout: Duration::from_secs(10),
            retry_attempts: 3,
            retry_schedule: BackoffSchedule::new(Duration::from_millis(600), Duration::from_secs(10), Duration::from_millis(400)),
        }
    }
}

/// A thin REST client for the control plane the gateway reports session
/// state to and is configured from.
///
/// Holds one [`reqwest::Client`], built once and cloned cheaply by every
/// caller, rather than dialing a fresh connector per call.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_schedule: BackoffSchedule,
}

impl ControlPlaneClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::transport)?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry_attempts: config.retry_attempts,
            retry_schedule: config.retry_schedule,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn error_from_response(resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Error::response(status, body)
    }

    /// Runs a single non-batched call under [`retry_with_backoff`], folding
    /// `RetryOutcome` back into this crate's `Result`.
    async fn with_retry<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match retry_with_backoff(self.retry_attempts, self.retry_schedule, op).await {
            RetryOutcome::Success(value) => Ok(value),
            RetryOutcome::Exhausted(err) | RetryOutcome::Fatal(err) => Err(err),
        }
    }

    pub async fn active_accounts(&self) -> Result<Vec<ActiveAccount>> {
        self.with_retry(|_attempt| async {
            let resp = self
                .http
                .get(self.url("/whatsapp/accounts/active"))
                .send()
                .await
                .map_err(Error::transport)?;

            if !resp.status().is_success() {
                return Err(Self::error_from_response(resp).await);
            }

            let bytes = resp.bytes().await.map_err(Error::transport)?;
            serde_json::from_slice(&bytes).map_err(Error::decoding)
        })
        .await
    }

    pub async fn account(&self, session_id: &str) -> Result<AccountInfo> {
        self.with_retry(|_attempt| async {
            let resp = self
                .http
                .get(self.url(&format!("/whatsapp/account/{session_id}")))
                .send()
                .await
                .map_err(Error::transport)?;

            if !resp.status().is_success() {
                return Err(Self::error_from_response(resp).await);
            }

            let bytes = resp.bytes().await.map_err(Error::transport)?;
            serde_json::from_slice(&bytes).map_err(Error::decoding)
        })
        .await
    }

    pub async fn status_by_token(&self, webhook_token: &str) -> Result<StatusByToken> {
        self.with_retry(|_attempt| async {
            let resp = self
                .http
                .get(self.url(&format!("/whatsapp/status/token/{webhook_token}")))
                .send()
                .await
                .map_err(Error::transport)?;

            if !resp.status().is_success() {
                return Err(Self::error_from_response(resp).await);
            }

            let bytes = resp.bytes().await.map_err(Error::transport)?;
            serde_json::from_slice(&bytes).map_err(Error::decoding)
        })
        .await
    }

    pub async fn post_qr_batch(&self, entries: Vec<QrBatchEntry>) -> Result<QrBatchResponse> {
        let body = QrBatchRequest { qrs: entries };

        let resp = self
            .http
            .post(self.url("/qr/batch"))
            .json(&body)
            .send()
            .await
            .map_err(Error::transport)?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let bytes = resp.bytes().await.map_err(Error::transport)?;
        serde_json::from_slice(&bytes).map_err(Error::decoding)
    }

    pub async fn post_status_batch(
        &self,
        entries: Vec<StatusBatchEntry>,
    ) -> Result<StatusBatchResponse> {
        let body = StatusBatchRequest { statuses: entries };

        let resp = self
            .http
            .post(self.url("/whatsapp/status/batch"))
            .json(&body)
            .send()
            .await
            .map_err(Error::transport)?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let bytes = resp.bytes().await.map_err(Error::transport)?;
        serde_json::from_slice(&bytes).map_err(Error::decoding)
    }

    pub async fn post_webhook_message(&self, webhook_token: &str, message: WebhookMessage) -> Result<()> {
        // `retry_with_backoff` may re-invoke the closure; the multipart form
        // consumes its parts, so it's rebuilt from a cloned message each attempt.
        self.with_retry(|_attempt| async {
            let form = build_webhook_form(message.clone())?;

            let resp = self
                .http
                .post(self.url(&format!("/whatsapp-webhook/{webhook_token}")))
                .multipart(form)
                .send()
                .await
                .map_err(Error::transport)?;

            if !resp.status().is_success() {
                return Err(Self::error_from_response(resp).await);
            }

            Ok(())
        })
        .await
    }
}

fn build_webhook_form(message: WebhookMessage) -> Result<multipart::Form> {
    let mut form = multipart::Form::new()
        .text("from", message.from)
        .text("type", message.kind)
        .text("wamId", message.wam_id)
        .text("timestamp", message.timestamp.to_string());

    if let Some(text) = message.text {
        form = form.text("text", text);
    }
    if let Some(push_name) = message.push_name {
        form = form.text("pushName", push_name);
    }
    if let Some(audio) = message.audio {
        let part = multipart::Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .map_err(Error::transport)?;
        form = form.part("audio", part);
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let client = ControlPlaneClient::new(ClientConfig::new("https://control.example.test/")).unwrap();
        assert_eq!(
            client.url("/whatsapp/accounts/active"),
            "https://control.example.test/whatsapp/accounts/active"
        );
    }

    #[test]
    fn client_config_defaults_are_sane() {
        let config = ClientConfig::new("https://control.example.test");
        assert_eq!(config.max_idle_per_host, 32);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_schedule.base, Duration::from_millis(600));
        assert_eq!(config.retry_schedule.jitter, Duration::from_millis(400));
    }
}
