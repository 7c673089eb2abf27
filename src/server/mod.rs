//! Event streaming over TCP.

pub mod broadcast;
pub mod protocol;

pub use broadcast::EventServer;
pub use protocol::ServerEvent;
