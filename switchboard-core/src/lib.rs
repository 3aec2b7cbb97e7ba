//! # switchboard-core
//!
//! Control-plane library for driving a live media switching server.
//!
//! This crate contains:
//! - **Protocol schema**: the method and event catalog, value types, and the
//!   preview-port text encoding
//! - **Framing**: `FrameHeader`, `Packet`, `MessageType` and `SwitchCodec`
//!   for framed socket I/O via `tokio_util`
//! - **Network**: `Endpoint`, `Listener` and `Connection`
//! - **Server**: `Controller`, `DispatchTable`, `Broadcaster` and the
//!   `MediaServer` trait handlers call into
//! - **Client**: `SwitchClient` with typed call wrappers and an event stream
//! - **Error**: `SwitchError`, a typed `thiserror` hierarchy

pub mod client;
pub mod codec;
pub mod error;
pub mod header;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod server;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{ClientEvent, ClientOptions, ClientRole, SwitchClient};
pub use codec::SwitchCodec;
pub use error::SwitchError;
pub use header::{FrameHeader, HEADER_SIZE};
pub use message::MessageType;
pub use network::{Connection, ConnectionSender, DEFAULT_ADDRESS, Endpoint, Listener};
pub use packet::{MAX_FRAME_SIZE, MAX_MEMBER_LENGTH, Packet};
pub use protocol::{
    CaseType, Channel, CompositeMode, ControllerEvent, FaceBox, Method, PipChanges, PreviewPort,
    ServeType,
};
pub use server::{Broadcaster, CallContext, Controller, DispatchTable, MediaServer};
pub use state::ConnectionPhase;
