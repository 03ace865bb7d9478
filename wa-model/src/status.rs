use std::fmt::{self, Display, Formatter};

/// The session-state value visible to the control plane.
///
/// Held redundantly in three layers: process-local, shared cache, and
/// control plane, read in that order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    /// QR emitted, waiting for a scan.
    Pending,
    /// Transport attempting to connect.
    Connecting,
    /// Paired and live.
    Active,
    /// Evicted, logged out, or timed out.
    Inactive,
}

impl ReportedStatus {
    /// Control-plane wire value used in `estado_qr` fields.
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "connecting" => Some(Self::Connecting),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl Display for ReportedStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
