//! Domain-specific error types for the switchboard control plane.
//!
//! All fallible operations return `Result<T, SwitchError>`.
//! Invalid input never panics; every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the control plane.
#[derive(Debug, Error)]
pub enum SwitchError {
    // ── Framing Errors ───────────────────────────────────────────
    /// Received bytes that do not start with the `SWB0` magic sequence.
    #[error("invalid magic bytes: expected SWB0")]
    InvalidMagic,

    /// A field in the frame header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The frame checksum did not match its member and body.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A frame violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The frame exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The member name exceeds the allowed length.
    #[error("member name too long: {size} bytes (max {max})")]
    MemberTooLong { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The socket layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The listening endpoint could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The address string could not be parsed into an endpoint.
    #[error("invalid endpoint address: {0}")]
    InvalidEndpoint(String),

    /// A call was issued on a client that has no live connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was invoked on a client that is already connected.
    #[error("already connected")]
    AlreadyConnected,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// A call exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Dispatch Errors ──────────────────────────────────────────
    /// The server has no handler registered under this method name.
    #[error("unsupported call {0}")]
    UnknownMethod(String),

    /// The client received an event that is not part of the schema.
    #[error("unknown event {0}")]
    UnknownEvent(String),

    /// The argument tuple did not match the method signature.
    #[error("invalid arguments for {member}: {reason}")]
    InvalidArguments { member: String, reason: String },

    /// The server answered the call with an explicit error reply.
    #[error("remote error from {method}: {message}")]
    Remote { method: String, message: String },

    /// A console command or value name could not be parsed.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a body failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// UTF-8 conversion failed.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl SwitchError {
    /// Returns `true` for failures that happened before or on the wire,
    /// as opposed to an explicit error reply from the controller.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SwitchError::Connection(_)
                | SwitchError::ChannelClosed
                | SwitchError::Timeout(_)
                | SwitchError::NotConnected
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SwitchError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SwitchError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for SwitchError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SwitchError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = SwitchError::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = SwitchError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = SwitchError::UnknownMethod("set_encode_mode".into());
        assert_eq!(e.to_string(), "unsupported call set_encode_mode");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: SwitchError = io_err.into();
        assert!(matches!(e, SwitchError::Connection(_)));
        assert!(e.is_transport());
    }

    #[test]
    fn remote_errors_are_not_transport_failures() {
        let e = SwitchError::Remote {
            method: "switch".into(),
            message: "nope".into(),
        };
        assert!(!e.is_transport());
    }
}
