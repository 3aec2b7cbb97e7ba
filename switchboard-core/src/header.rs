//! Fixed-size frame header.
//!
//! ```text
//! magic:          [u8; 4]  "SWB0"
//! checksum:       u32      first 4 bytes of blake3(member ‖ body), 0 if both empty
//! message_type:   u32      see `MessageType`
//! member_length:  u32
//! serial:         u64      call correlation id, 0 for events
//! body_length:    u64
//! ```
//!
//! All integers are little-endian.

use crate::error::SwitchError;
use crate::message::MessageType;

pub const MAGIC: [u8; 4] = *b"SWB0";
pub const HEADER_SIZE: usize = 32;

pub type FrameHeaderBytes = [u8; HEADER_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub checksum: u32,
    pub message_type: MessageType,
    pub member_length: u32,
    pub serial: u64,
    pub body_length: u64,
}

impl FrameHeader {
    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut buf: FrameHeaderBytes = [0; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.message_type as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.member_length.to_le_bytes());
        buf[16..24].copy_from_slice(&self.serial.to_le_bytes());
        buf[24..32].copy_from_slice(&self.body_length.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SwitchError> {
        if bytes.len() < HEADER_SIZE {
            return Err(SwitchError::InvalidHeader("short header"));
        }
        if bytes[0..4] != MAGIC {
            return Err(SwitchError::InvalidMagic);
        }
        let message_type = MessageType::try_from(read_u32(&bytes[8..12]))?;
        Ok(Self {
            checksum: read_u32(&bytes[4..8]),
            message_type,
            member_length: read_u32(&bytes[12..16]),
            serial: read_u64(&bytes[16..24]),
            body_length: read_u64(&bytes[24..32]),
        })
    }

    /// Bytes following the header: member name plus body.
    pub fn content_length(&self) -> u64 {
        self.member_length as u64 + self.body_length
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameHeader {
        FrameHeader {
            checksum: 0xDEAD_BEEF,
            message_type: MessageType::Call,
            member_length: 16,
            serial: 42,
            body_length: 8,
        }
    }

    #[test]
    fn layout_is_little_endian() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..4], b"SWB0");
        assert_eq!(&bytes[4..8], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[16..24], &42u64.to_le_bytes());
        assert_eq!(FrameHeader::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(SwitchError::InvalidMagic)
        ));
    }

    #[test]
    fn rejects_unknown_message_type() {
        let mut bytes = sample().to_bytes();
        bytes[8..12].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(SwitchError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn rejects_short_input() {
        assert!(FrameHeader::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn content_length_sums_member_and_body() {
        assert_eq!(sample().content_length(), 24);
    }
}
