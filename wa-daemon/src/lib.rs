//! Process entry point library: wires the session gateway, outbound
//! batcher, and inbound pipeline into one facade, runs the janitors, and
//! owns graceful shutdown.

pub mod config;
pub mod connector;
pub mod error;
pub mod facade;
pub mod janitor;

pub use config::{AppEnv, JanitorConfig};
pub use connector::UnimplementedConnector;
pub use error::{DaemonError, DaemonErrorType};
pub use facade::{ManagerDeps, WhatsAppManager};
