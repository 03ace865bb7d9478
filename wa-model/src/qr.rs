use chrono::{DateTime, Utc};

/// Per-session QR filtering state, owned exclusively by the `QrController`
/// in `wa-gateway`.
///
/// Bounds `send_count` and the throttle/dedup window respectively.
#[derive(Debug, Clone, Default)]
pub struct QrState {
    pub last_qr_body: Option<String>,
    pub last_qr_sent_at: Option<DateTime<Utc>>,
    pub send_count: u32,
    pub inflight: bool,
    pub pending_since_at: Option<DateTime<Utc>>,
}

impl QrState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
