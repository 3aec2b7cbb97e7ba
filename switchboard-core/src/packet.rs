use std::fmt::Debug;

use crate::error::SwitchError;
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::message::MessageType;

/// Largest frame the codec will accept, header included.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
/// Longest method or event name.
pub const MAX_MEMBER_LENGTH: usize = 255;
/// Largest body that still fits in a frame with a maximal member name.
pub const MAX_BODY_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE - MAX_MEMBER_LENGTH;

/// One control-plane frame: a call, a reply, an error reply or an event.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    message_type: MessageType,
    serial: u64,
    member: String,
    body: Vec<u8>,
}

impl Packet {
    fn build(
        message_type: MessageType,
        serial: u64,
        member: &str,
        body: Vec<u8>,
    ) -> Result<Self, SwitchError> {
        if member.len() > MAX_MEMBER_LENGTH {
            return Err(SwitchError::MemberTooLong {
                size: member.len(),
                max: MAX_MEMBER_LENGTH,
            });
        }
        if body.len() > MAX_BODY_SIZE {
            return Err(SwitchError::FrameTooLarge {
                size: HEADER_SIZE + member.len() + body.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(Self {
            message_type,
            serial,
            member: member.to_string(),
            body,
        })
    }

    pub fn call(serial: u64, method: &str, body: Vec<u8>) -> Result<Self, SwitchError> {
        Self::build(MessageType::Call, serial, method, body)
    }

    pub fn reply(serial: u64, method: &str, body: Vec<u8>) -> Result<Self, SwitchError> {
        Self::build(MessageType::Reply, serial, method, body)
    }

    /// Error reply echoing `method`; the body carries `message`.
    pub fn error(serial: u64, method: &str, message: &str) -> Result<Self, SwitchError> {
        let body = bincode::serialize(message)?;
        Self::build(MessageType::Error, serial, method, body)
    }

    pub fn event(name: &str, body: Vec<u8>) -> Result<Self, SwitchError> {
        Self::build(MessageType::Event, 0, name, body)
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the message carried by an `Error` frame.
    pub fn error_message(&self) -> Result<String, SwitchError> {
        if self.message_type != MessageType::Error {
            return Err(SwitchError::ProtocolViolation("not an error frame"));
        }
        Ok(bincode::deserialize(&self.body)?)
    }

    pub fn checksum(&self) -> u32 {
        checksum(self.member.as_bytes(), &self.body)
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            checksum: self.checksum(),
            message_type: self.message_type,
            member_length: self.member.len() as u32,
            serial: self.serial,
            body_length: self.body.len() as u64,
        }
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.member.len() + self.body.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.encoded_len());
        frame.extend_from_slice(&self.header().to_bytes());
        frame.extend_from_slice(self.member.as_bytes());
        frame.extend_from_slice(&self.body);
        frame
    }

    /// Rebuild a packet from a parsed header and exactly
    /// `header.content_length()` bytes of content.
    pub fn from_parts(header: &FrameHeader, content: &[u8]) -> Result<Self, SwitchError> {
        if content.len() as u64 != header.content_length() {
            return Err(SwitchError::InvalidHeader("content length mismatch"));
        }
        let member_len = header.member_length as usize;
        if member_len > MAX_MEMBER_LENGTH {
            return Err(SwitchError::MemberTooLong {
                size: member_len,
                max: MAX_MEMBER_LENGTH,
            });
        }
        let (member, body) = content.split_at(member_len);
        if checksum(member, body) != header.checksum {
            return Err(SwitchError::ChecksumMismatch);
        }
        let member = String::from_utf8(member.to_vec())?;
        Self::build(header.message_type, header.serial, &member, body.to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SwitchError> {
        let header = FrameHeader::from_bytes(bytes)?;
        Self::from_parts(&header, &bytes[HEADER_SIZE..])
    }
}

fn checksum(member: &[u8], body: &[u8]) -> u32 {
    if member.is_empty() && body.is_empty() {
        return 0;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(member);
    hasher.update(body);
    let hash = hasher.finalize();
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&hash.as_bytes()[0..4]);
    u32::from_le_bytes(raw)
}

impl Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.message_type)
            .field("serial", &self.serial)
            .field("member", &self.member)
            .field("body_len", &self.body.len())
            .finish()
    }
}
