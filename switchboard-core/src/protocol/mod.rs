//! The control-plane schema shared by controller and clients.
//!
//! # Wire Protocol
//!
//! ## Method call
//! ```text
//! Client ──[Call serial=n member=<method>]──► Controller
//!   Body: argument tuple (bincode)
//!
//! Controller ──[Reply serial=n member=<method>]──► Client
//!   Body: return tuple (bincode)
//!
//! Controller ──[Error serial=n member=<method>]──► Client   (on failure)
//!   Body: error message (bincode string)
//! ```
//!
//! ## Event
//! ```text
//! Controller ──[Event serial=0 member=<event>]──► every Client
//!   Body: argument tuple (bincode)
//! ```
//!
//! Argument and return tuples follow the signatures in [`schema`].

pub mod event;
pub mod ports;
pub mod schema;
pub mod types;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SwitchError;

pub use event::ControllerEvent;
pub use ports::{format_preview_ports, parse_preview_ports};
pub use schema::{EVENTS, EventSpec, METHODS, Method, MethodSpec, event_signature};
pub use types::{CaseType, Channel, CompositeMode, FaceBox, PipChanges, PreviewPort, ServeType};

/// Serialize an argument or return tuple.
pub fn encode_body<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SwitchError> {
    Ok(bincode::serialize(value)?)
}

/// Deserialize the tuple carried by `member`, reporting mismatches as
/// [`SwitchError::InvalidArguments`].
pub fn decode_body<T: DeserializeOwned>(member: &str, body: &[u8]) -> Result<T, SwitchError> {
    bincode::deserialize(body).map_err(|e| SwitchError::InvalidArguments {
        member: member.to_string(),
        reason: e.to_string(),
    })
}
