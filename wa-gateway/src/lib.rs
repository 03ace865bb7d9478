//! The session gateway core: owns the abstract connection to the WhatsApp
//! protocol library, the live session registry, pairing-QR filtering,
//! reconnect policy, the multilayer status cache facade, and outbound
//! message dispatch.
//!
//! Everything here is a library; the process entry point, janitors, and
//! the facade that wires these pieces together live in `wa-daemon`.

pub mod config;
pub mod connection;
pub mod error;
pub mod qr;
pub mod sender;
pub mod sink;
pub mod socket;
pub mod state;
pub mod store;

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use error::{GatewayError, GatewayErrorType};
