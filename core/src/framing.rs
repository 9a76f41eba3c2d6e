//! Length-delimited multipart envelopes for the TCP transports.
//!
//! The original transport delivered multipart messages natively; over a byte
//! stream the broker frames them itself. An envelope is a `u32` big-endian
//! part count followed by each part as a `u32` big-endian length and its
//! bytes. Worker-channel envelopes are `[verb_frame, optional payload]`;
//! producer-channel envelopes are `[ascii_id, optional payload]`.

use crate::error::FramingError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub const MAX_PARTS: usize = 4;
pub const MAX_PART_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct MultipartCodec {
    max_parts: usize,
    max_part_len: usize,
}

impl MultipartCodec {
    pub fn new() -> Self {
        MultipartCodec {
            max_parts: MAX_PARTS,
            max_part_len: MAX_PART_LEN,
        }
    }
}

impl Default for MultipartCodec {
    fn default() -> Self {
        MultipartCodec::new()
    }
}

impl Decoder for MultipartCodec {
    type Item = Vec<Bytes>;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }
        let part_count = read_u32(src, 0) as usize;
        if part_count > self.max_parts {
            return Err(FramingError::TooManyParts(part_count, self.max_parts));
        }

        // Walk the length prefixes without consuming anything until the
        // whole envelope is buffered.
        let mut lengths = Vec::with_capacity(part_count);
        let mut cursor = 4;
        for _ in 0..part_count {
            if src.len() < cursor + 4 {
                return Ok(None);
            }
            let length = read_u32(src, cursor) as usize;
            if length > self.max_part_len {
                return Err(FramingError::OversizedPart(length, self.max_part_len));
            }
            lengths.push(length);
            cursor += 4 + length;
        }
        if src.len() < cursor {
            return Ok(None);
        }

        src.advance(4);
        let mut parts = Vec::with_capacity(part_count);
        for length in lengths {
            src.advance(4);
            parts.push(src.split_to(length).freeze());
        }
        Ok(Some(parts))
    }
}

impl Encoder<Vec<Bytes>> for MultipartCodec {
    type Error = FramingError;

    fn encode(&mut self, parts: Vec<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if parts.len() > self.max_parts {
            return Err(FramingError::TooManyParts(parts.len(), self.max_parts));
        }
        dst.reserve(4 + parts.iter().map(|part| 4 + part.len()).sum::<usize>());
        dst.put_u32(parts.len() as u32);
        for part in parts {
            if part.len() > self.max_part_len {
                return Err(FramingError::OversizedPart(part.len(), self.max_part_len));
            }
            dst.put_u32(part.len() as u32);
            dst.extend_from_slice(&part);
        }
        Ok(())
    }
}

fn read_u32(src: &BytesMut, at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&src[at..at + 4]);
    u32::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_waits_for_complete_envelope() {
        let mut codec = MultipartCodec::new();
        let mut wire = BytesMut::new();
        codec
            .encode(
                vec![Bytes::from_static(b"WORK_ITEM 5"), Bytes::from_static(b"pay")],
                &mut wire,
            )
            .unwrap();

        // Feed the bytes one short of complete: no frame yet.
        let mut partial = BytesMut::from(&wire[..wire.len() - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        // The full envelope decodes to the original parts.
        let parts = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(
            parts,
            vec![Bytes::from_static(b"WORK_ITEM 5"), Bytes::from_static(b"pay")]
        );
        assert!(wire.is_empty());
    }

    #[test]
    fn test_decode_rejects_excessive_part_count() {
        let mut codec = MultipartCodec::new();
        let mut wire = BytesMut::new();
        wire.put_u32(100);

        assert!(matches!(
            codec.decode(&mut wire),
            Err(FramingError::TooManyParts(100, _))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_part() {
        let mut codec = MultipartCodec::new();
        let mut wire = BytesMut::new();
        wire.put_u32(1);
        wire.put_u32(u32::MAX);

        assert!(matches!(
            codec.decode(&mut wire),
            Err(FramingError::OversizedPart(_, _))
        ));
    }

    #[test]
    fn test_two_envelopes_on_one_stream() {
        let mut codec = MultipartCodec::new();
        let mut wire = BytesMut::new();
        codec
            .encode(vec![Bytes::from_static(b"17")], &mut wire)
            .unwrap();
        codec
            .encode(vec![Bytes::from_static(b"18")], &mut wire)
            .unwrap();

        assert_eq!(
            codec.decode(&mut wire).unwrap().unwrap(),
            vec![Bytes::from_static(b"17")]
        );
        assert_eq!(
            codec.decode(&mut wire).unwrap().unwrap(),
            vec![Bytes::from_static(b"18")]
        );
        assert!(codec.decode(&mut wire).unwrap().is_none());
    }
}
