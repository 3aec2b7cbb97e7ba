//! `tokio_util` codec turning a byte stream into [`Packet`]s.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::SwitchError;
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::packet::{MAX_FRAME_SIZE, Packet};

#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchCodec;

impl Decoder for SwitchCodec {
    type Item = Packet;
    type Error = SwitchError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, SwitchError> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let header = FrameHeader::from_bytes(&src[..HEADER_SIZE])?;
        let total = HEADER_SIZE as u64 + header.content_length();
        if total > MAX_FRAME_SIZE as u64 {
            return Err(SwitchError::FrameTooLarge {
                size: total as usize,
                max: MAX_FRAME_SIZE,
            });
        }
        let total = total as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let content = src.split_to(total - HEADER_SIZE);
        Packet::from_parts(&header, &content).map(Some)
    }
}

impl Encoder<Packet> for SwitchCodec {
    type Error = SwitchError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), SwitchError> {
        dst.reserve(item.encoded_len());
        dst.extend_from_slice(&item.to_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let pkt = Packet::call(1, "get_audio_port", Vec::new()).unwrap();
        let bytes = pkt.to_bytes();
        let mut codec = SwitchCodec;

        let mut buf = BytesMut::from(&bytes[..HEADER_SIZE - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        let mut buf = BytesMut::from(&bytes[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(pkt));
        assert!(buf.is_empty());
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let first = Packet::event("new_mode_online", vec![1, 0, 0, 0]).unwrap();
        let second = Packet::event("new_mode_online", vec![2, 0, 0, 0]).unwrap();
        let mut buf = BytesMut::new();
        let mut codec = SwitchCodec;
        codec.encode(first.clone(), &mut buf).unwrap();
        codec.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_an_error() {
        let mut header = Packet::call(1, "mark_face", Vec::new()).unwrap().header();
        header.body_length = MAX_FRAME_SIZE as u64;
        let mut buf = BytesMut::from(&header.to_bytes()[..]);
        assert!(matches!(
            SwitchCodec.decode(&mut buf),
            Err(SwitchError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn frames_split_across_reads() {
        let pkt = Packet::reply(9, "get_compose_port", vec![0xB9, 0x0B, 0, 0]).unwrap();
        let bytes = pkt.to_bytes();
        let mock = tokio_test::io::Builder::new()
            .read(&bytes[..5])
            .read(&bytes[5..HEADER_SIZE + 3])
            .read(&bytes[HEADER_SIZE + 3..])
            .build();

        let mut reader = FramedRead::new(mock, SwitchCodec);
        let decoded = tokio_test::assert_ok!(reader.next().await.unwrap());
        assert_eq!(decoded, pkt);
        assert!(reader.next().await.is_none());
    }
}
