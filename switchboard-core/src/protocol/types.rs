//! Value types carried by method arguments and events.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::SwitchError;

// ── FaceBox ──────────────────────────────────────────────────────

/// A detected face or tracking rectangle, `(x, y, w, h)` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

// ── PreviewPort ──────────────────────────────────────────────────

/// One preview sink: its port, what it serves, and which case feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewPort {
    pub port: i32,
    pub serve: i32,
    pub case: i32,
}

impl PreviewPort {
    pub fn new(port: i32, serve: i32, case: i32) -> Self {
        Self { port, serve, case }
    }

    pub fn serve_type(&self) -> Result<ServeType, SwitchError> {
        ServeType::try_from(self.serve)
    }

    pub fn case_type(&self) -> Result<CaseType, SwitchError> {
        CaseType::try_from(self.case)
    }
}

// ── CompositeMode ────────────────────────────────────────────────

/// Layout of the composite output.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Only channel A.
    None = 0,
    /// Channel B inset over channel A.
    Pip = 1,
    /// Channel A large, channel B small beside it.
    DualPreview = 2,
    /// A and B side by side at equal size.
    DualEqual = 3,
}

impl TryFrom<i32> for CompositeMode {
    type Error = SwitchError;

    fn try_from(value: i32) -> Result<Self, SwitchError> {
        match value {
            0 => Ok(CompositeMode::None),
            1 => Ok(CompositeMode::Pip),
            2 => Ok(CompositeMode::DualPreview),
            3 => Ok(CompositeMode::DualEqual),
            _ => Err(SwitchError::UnknownVariant {
                type_name: "CompositeMode",
                value: value as u64,
            }),
        }
    }
}

impl FromStr for CompositeMode {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompositeMode::None),
            "pip" => Ok(CompositeMode::Pip),
            "preview" | "dual_preview" => Ok(CompositeMode::DualPreview),
            "equal" | "dual_equal" => Ok(CompositeMode::DualEqual),
            other => other
                .parse::<i32>()
                .map_err(|_| SwitchError::InvalidCommand(format!("unknown composite mode '{s}'")))
                .and_then(CompositeMode::try_from),
        }
    }
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositeMode::None => "none",
            CompositeMode::Pip => "pip",
            CompositeMode::DualPreview => "dual_preview",
            CompositeMode::DualEqual => "dual_equal",
        };
        f.write_str(name)
    }
}

// ── Channel ──────────────────────────────────────────────────────

/// Switchable channels, identified on the wire by a character code.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    VideoA = b'A' as i32,
    VideoB = b'B' as i32,
    Audio = b'a' as i32,
}

impl Channel {
    /// The kind of stream a port must serve to be switched onto this channel.
    pub fn serves(&self) -> ServeType {
        match self {
            Channel::VideoA | Channel::VideoB => ServeType::Video,
            Channel::Audio => ServeType::Audio,
        }
    }
}

impl TryFrom<i32> for Channel {
    type Error = SwitchError;

    fn try_from(value: i32) -> Result<Self, SwitchError> {
        match value {
            v if v == Channel::VideoA as i32 => Ok(Channel::VideoA),
            v if v == Channel::VideoB as i32 => Ok(Channel::VideoB),
            v if v == Channel::Audio as i32 => Ok(Channel::Audio),
            _ => Err(SwitchError::UnknownVariant {
                type_name: "Channel",
                value: value as u64,
            }),
        }
    }
}

impl FromStr for Channel {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video-a" | "a" => Ok(Channel::VideoA),
            "video-b" | "b" => Ok(Channel::VideoB),
            "audio" => Ok(Channel::Audio),
            _ => Err(SwitchError::InvalidCommand(format!("unknown channel '{s}'"))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::VideoA => f.write_str("video-A"),
            Channel::VideoB => f.write_str("video-B"),
            Channel::Audio => f.write_str("audio"),
        }
    }
}

// ── ServeType / CaseType ─────────────────────────────────────────

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServeType {
    Nothing = 0,
    Video = 1,
    Audio = 2,
}

impl TryFrom<i32> for ServeType {
    type Error = SwitchError;

    fn try_from(value: i32) -> Result<Self, SwitchError> {
        match value {
            0 => Ok(ServeType::Nothing),
            1 => Ok(ServeType::Video),
            2 => Ok(ServeType::Audio),
            _ => Err(SwitchError::UnknownVariant {
                type_name: "ServeType",
                value: value as u64,
            }),
        }
    }
}

/// The role a stream plays inside the media server.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseType {
    Unknown = 0,
    CompositeVideoA = 1,
    CompositeVideoB = 2,
    CompositeAudio = 3,
    Preview = 4,
    InputAudio = 5,
    InputVideo = 6,
    BranchVideoA = 7,
    BranchVideoB = 8,
    BranchAudio = 9,
    BranchPreview = 10,
}

impl TryFrom<i32> for CaseType {
    type Error = SwitchError;

    fn try_from(value: i32) -> Result<Self, SwitchError> {
        use CaseType::*;
        let case = match value {
            0 => Unknown,
            1 => CompositeVideoA,
            2 => CompositeVideoB,
            3 => CompositeAudio,
            4 => Preview,
            5 => InputAudio,
            6 => InputVideo,
            7 => BranchVideoA,
            8 => BranchVideoB,
            9 => BranchAudio,
            10 => BranchPreview,
            _ => {
                return Err(SwitchError::UnknownVariant {
                    type_name: "CaseType",
                    value: value as u64,
                });
            }
        };
        Ok(case)
    }
}

// ── PipChanges ───────────────────────────────────────────────────

bitflags! {
    /// Which picture-in-picture fields `adjust_pip` actually changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipChanges: u32 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const W = 1 << 2;
        const H = 1 << 3;
    }
}
