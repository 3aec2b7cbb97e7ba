//! Socket plumbing: endpoint addressing, listeners, and framed connections.

pub mod connection;
pub mod endpoint;

pub use connection::{Connection, ConnectionSender, OUTBOUND_CAPACITY};
pub use endpoint::{DEFAULT_ADDRESS, Endpoint, Listener};
