//! Broadcast events, controller → every connected client.

use serde::Serialize;

use crate::error::SwitchError;
use crate::packet::Packet;
use crate::protocol::types::{FaceBox, PreviewPort};
use crate::protocol::{decode_body, encode_body};

/// A decoded control-plane event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    PreviewPortAdded(PreviewPort),
    PreviewPortRemoved(PreviewPort),
    NewModeOnline { mode: i32 },
    ShowFaceMarker { faces: Vec<FaceBox> },
    ShowTrackMarker { faces: Vec<FaceBox> },
    SelectFace { x: i32, y: i32 },
}

impl ControllerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerEvent::PreviewPortAdded(_) => "preview_port_added",
            ControllerEvent::PreviewPortRemoved(_) => "preview_port_removed",
            ControllerEvent::NewModeOnline { .. } => "new_mode_online",
            ControllerEvent::ShowFaceMarker { .. } => "show_face_marker",
            ControllerEvent::ShowTrackMarker { .. } => "show_track_marker",
            ControllerEvent::SelectFace { .. } => "select_face",
        }
    }

    /// Encode the positional argument tuple.
    pub fn encode_args(&self) -> Result<Vec<u8>, SwitchError> {
        match self {
            ControllerEvent::PreviewPortAdded(p) | ControllerEvent::PreviewPortRemoved(p) => {
                encode_body(&(p.port, p.serve, p.case))
            }
            ControllerEvent::NewModeOnline { mode } => encode_body(&(*mode,)),
            ControllerEvent::ShowFaceMarker { faces }
            | ControllerEvent::ShowTrackMarker { faces } => encode_body(&(faces,)),
            ControllerEvent::SelectFace { x, y } => encode_body(&(*x, *y)),
        }
    }

    pub fn into_packet(self) -> Result<Packet, SwitchError> {
        Packet::event(self.name(), self.encode_args()?)
    }

    /// Decode an event by name. Names outside the schema yield
    /// [`SwitchError::UnknownEvent`].
    pub fn decode(name: &str, body: &[u8]) -> Result<Self, SwitchError> {
        let event = match name {
            "preview_port_added" => {
                let (port, serve, case): (i32, i32, i32) = decode_body(name, body)?;
                ControllerEvent::PreviewPortAdded(PreviewPort::new(port, serve, case))
            }
            "preview_port_removed" => {
                let (port, serve, case): (i32, i32, i32) = decode_body(name, body)?;
                ControllerEvent::PreviewPortRemoved(PreviewPort::new(port, serve, case))
            }
            "new_mode_online" => {
                let (mode,): (i32,) = decode_body(name, body)?;
                ControllerEvent::NewModeOnline { mode }
            }
            "show_face_marker" => {
                let (faces,): (Vec<FaceBox>,) = decode_body(name, body)?;
                ControllerEvent::ShowFaceMarker { faces }
            }
            "show_track_marker" => {
                let (faces,): (Vec<FaceBox>,) = decode_body(name, body)?;
                ControllerEvent::ShowTrackMarker { faces }
            }
            "select_face" => {
                let (x, y): (i32, i32) = decode_body(name, body)?;
                ControllerEvent::SelectFace { x, y }
            }
            other => return Err(SwitchError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }

    pub fn from_packet(packet: &Packet) -> Result<Self, SwitchError> {
        Self::decode(packet.member(), packet.body())
    }
}
