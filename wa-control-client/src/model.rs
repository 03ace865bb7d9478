//! Wire-shaped request/response bodies for the control-plane endpoints.
//! Kept local to this crate rather than in `wa-model` since they mirror
//! the control plane's JSON casing, not the core's internal domain types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveAccount {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub webhook_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub webhook_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusByToken {
    pub estado_qr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrBatchEntry {
    pub session_id: String,
    pub qr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrBatchRequest {
    pub qrs: Vec<QrBatchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrBatchResponse {
    pub success: bool,
    pub updated: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBatchEntry {
    pub session_id: String,
    pub estado_qr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBatchRequest {
    pub statuses: Vec<StatusBatchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusBatchResponse {
    pub success: bool,
    pub updated: u32,
    pub failed: u32,
}

/// Fields posted to `/whatsapp-webhook/{webhookToken}` as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct WebhookMessage {
    pub from: String,
    pub text: Option<String>,
    pub kind: String,
    pub wam_id: String,
    pub timestamp: i64,
    pub push_name: Option<String>,
    pub audio: Option<WebhookAudio>,
}

#[derive(Debug, Clone)]
pub struct WebhookAudio {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}
