//! Frame kinds carried on a control-plane connection.
//!
//! Uses proper enums with `TryFrom`, so unknown values never panic.

use crate::error::SwitchError;
use std::fmt;

// ── MessageType ──────────────────────────────────────────────────

/// Distinguishes calls, their answers, and unsolicited broadcasts.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A method invocation sent from client to controller.
    Call = 0x1,
    /// A successful answer to a `Call`, correlated by serial.
    Reply = 0x2,
    /// A failed answer to a `Call`; the body is the error message.
    Error = 0x3,
    /// A broadcast sent from controller to every connected client.
    Event = 0x4,
}

impl TryFrom<u32> for MessageType {
    type Error = SwitchError;

    fn try_from(value: u32) -> Result<Self, SwitchError> {
        match value {
            0x1 => Ok(MessageType::Call),
            0x2 => Ok(MessageType::Reply),
            0x3 => Ok(MessageType::Error),
            0x4 => Ok(MessageType::Event),
            _ => Err(SwitchError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Call => write!(f, "Call"),
            MessageType::Reply => write!(f, "Reply"),
            MessageType::Error => write!(f, "Error"),
            MessageType::Event => write!(f, "Event"),
        }
    }
}

impl MessageType {
    /// Returns `true` if this frame answers an earlier call.
    pub fn is_answer(&self) -> bool {
        matches!(self, MessageType::Reply | MessageType::Error)
    }
}
