//! REST client for the control plane: the application the gateway restores
//! sessions from on boot, reports QR codes and status to in batches, and
//! forwards inbound messages' webhooks through.
//!
//! The non-batched calls (`active_accounts`, `account`, `status_by_token`,
//! `post_webhook_message`) retry transport failures and `429`/`5xx`
//! responses under [`wa_ratelimit::retry_with_backoff`] internally. The
//! batched calls (`post_qr_batch`, `post_status_batch`) stay single-attempt
//! here — `wa-batcher` already re-enqueues a failed batch for the next
//! flush behind its own circuit breaker, so retrying twice would double up.

mod client;
mod error;
mod model;

pub use client::{ClientConfig, ControlPlaneClient};
pub use error::{Error, ErrorType, Result};
pub use model::{
    AccountInfo, ActiveAccount, QrBatchEntry, QrBatchResponse, StatusBatchEntry,
    StatusBatchResponse, StatusByToken, WebhookAudio, WebhookMessage,
};
