//! The seam where the WhatsApp protocol library itself would be wired in.
//!
//! `wa-gateway` only knows about [`wa_gateway::socket::ProtocolConnector`];
//! it never links against a concrete transport. This process
//! binary needs *some* implementation to construct `WhatsAppManager`, so it
//! supplies one that fails every dial — swap it for a real adapter over the
//! protocol library to bring sessions up.

use async_trait::async_trait;
use wa_gateway::socket::{AuthState, ProtocolConnector, SocketHandle};
use wa_model::SessionId;

pub struct UnimplementedConnector;

#[async_trait]
impl ProtocolConnector for UnimplementedConnector {
    async fn connect(
        &self,
        _session_id: &SessionId,
        _auth: AuthState,
        _protocol_version: &str,
    ) -> std::io::Result<Box<dyn SocketHandle>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no protocol connector wired in; replace UnimplementedConnector with a real adapter",
        ))
    }
}
