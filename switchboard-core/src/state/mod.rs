mod client;
pub mod connection;

pub use client::{ClientState, PendingCall};
pub use connection::ConnectionPhase;
