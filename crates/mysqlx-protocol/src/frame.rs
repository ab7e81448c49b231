//! X Protocol frame header.
//!
//! Every message on the wire is `u32 little-endian length` + `u8 type` +
//! payload, where the length counts the type byte and the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the full header (length prefix plus type byte).
pub const FRAME_HEADER_SIZE: usize = 5;

/// Default ceiling on a single frame (matches the server's
/// `mysqlx_max_allowed_packet` default).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Largest payload the `u32` length prefix can describe (it also counts
/// the type byte).
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - 1;

/// Header of one X Protocol frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of type byte plus payload.
    pub length: u32,
    /// Raw message type byte. Validation against the server or client
    /// enumeration happens one layer up.
    pub message_type: u8,
}

impl FrameHeader {
    /// Create a header for a payload of `payload_len` bytes.
    ///
    /// Fails when the payload is too long for the length prefix.
    pub fn new(message_type: u8, payload_len: usize) -> Result<Self, ProtocolError> {
        let length = u32::try_from(payload_len)
            .ok()
            .and_then(|len| len.checked_add(1))
            .ok_or(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            })?;
        Ok(Self {
            length,
            message_type,
        })
    }

    /// Parse a frame header.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::UnexpectedEof {
                needed: FRAME_HEADER_SIZE,
                available: src.remaining(),
            });
        }
        let length = src.get_u32_le();
        if length == 0 {
            return Err(ProtocolError::InvalidFrameLength(length));
        }
        let message_type = src.get_u8();
        Ok(Self {
            length,
            message_type,
        })
    }

    /// Encode the header.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.length);
        dst.put_u8(self.message_type);
    }

    /// Encode the header to a new `Bytes` buffer.
    #[must_use]
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Payload length (frame length minus the type byte).
    #[must_use]
    pub const fn payload_length(&self) -> usize {
        self.length.saturating_sub(1) as usize
    }

    /// Total bytes on the wire including the length prefix.
    #[must_use]
    pub const fn total_length(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.length as usize
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FrameHeader::new(11, 3).unwrap();
        let bytes = header.encode_to_bytes();
        assert_eq!(&bytes[..], &[0x04, 0x00, 0x00, 0x00, 0x0B]);
        assert_eq!(header.payload_length(), 3);
        assert_eq!(header.total_length(), 8);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FrameHeader::new(13, 1024).unwrap();
        let mut cursor = header.encode_to_bytes();
        assert_eq!(FrameHeader::decode(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_length_prefix_limit() {
        let header = FrameHeader::new(12, MAX_PAYLOAD_SIZE).unwrap();
        assert_eq!(header.length, u32::MAX);
        assert_eq!(header.payload_length(), MAX_PAYLOAD_SIZE);

        assert_eq!(
            FrameHeader::new(12, MAX_PAYLOAD_SIZE + 1),
            Err(ProtocolError::FrameTooLarge {
                size: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE,
            })
        );
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut cursor: &[u8] = &[0, 0, 0, 0, 0];
        assert_eq!(
            FrameHeader::decode(&mut cursor),
            Err(ProtocolError::InvalidFrameLength(0))
        );
    }

    #[test]
    fn test_short_header() {
        let mut cursor: &[u8] = &[1, 0, 0];
        assert!(matches!(
            FrameHeader::decode(&mut cursor),
            Err(ProtocolError::UnexpectedEof { needed: 5, available: 3 })
        ));
    }
}
