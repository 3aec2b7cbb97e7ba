//! Client-side link lifecycle.
//!
//! `ConnectionPhase` models the life of one client link with validated
//! transitions that return `Result` instead of panicking.

use std::time::{Duration, Instant};

use crate::error::SwitchError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of a client link to the controller.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲                │              │
///       │                ▼              ▼
///       └────────────────┴──── Disconnecting
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No link. Initial and terminal state.
    #[default]
    Disconnected,

    /// Transport connect in progress.
    Connecting,

    /// Link is up; calls may be issued and events arrive.
    Connected {
        /// When the link entered the `Connected` state.
        since: Instant,
    },

    /// Local teardown in progress.
    Disconnecting,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the link has been up. `None` for any other phase.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`. Any other phase reports
    /// [`SwitchError::AlreadyConnected`].
    pub fn begin_connect(&mut self) -> Result<(), SwitchError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(SwitchError::AlreadyConnected),
        }
    }

    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), SwitchError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(SwitchError::ProtocolViolation(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Valid from: `Connected`.
    pub fn begin_disconnect(&mut self) -> Result<(), SwitchError> {
        match self {
            Self::Connected { .. } => {
                *self = Self::Disconnecting;
                Ok(())
            }
            _ => Err(SwitchError::NotConnected),
        }
    }

    /// Valid from: `Disconnecting`, `Connecting` (connect failure).
    pub fn finish_disconnect(&mut self) -> Result<(), SwitchError> {
        match self {
            Self::Disconnecting | Self::Connecting => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(SwitchError::ProtocolViolation(
                "cannot finish disconnect: not in a disconnectable state",
            )),
        }
    }

    /// Reset to `Disconnected` regardless of current state, e.g. when the
    /// controller closes the link.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}
