//! X Protocol frame codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use mysqlx_protocol::frame::{
    DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, FrameHeader, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// One frame: a raw message type and its payload.
///
/// The type byte is not validated here; the dispatch layer checks it
/// against the server message enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw message type byte.
    pub message_type: u8,
    /// Encoded payload.
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(message_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// Payload length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Frame codec for tokio-util framing.
///
/// Decodes length-prefixed frames from a byte buffer and encodes messages
/// back into frames. Payloads larger than the configured maximum are
/// rejected in both directions.
#[derive(Debug, Clone)]
pub struct XCodec {
    max_frame_size: usize,
}

impl XCodec {
    /// Create a codec with the default 64 MiB frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the maximum payload size accepted or produced.
    ///
    /// Values above what the length prefix can describe are capped.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size.min(MAX_PAYLOAD_SIZE);
        self
    }

    /// Configured maximum payload size.
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn check_size(&self, size: usize) -> Result<(), CodecError> {
        if size > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    /// Build the complete wire image of one outbound frame.
    ///
    /// The buffer is allocated fallibly; an allocation failure surfaces as
    /// [`CodecError::OutOfMemory`] instead of aborting the process.
    pub fn stage_frame(&self, message_type: u8, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.check_size(payload.len())?;
        let header = FrameHeader::new(message_type, payload.len())?;
        let total = FRAME_HEADER_SIZE + payload.len();
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(total)
            .map_err(|_| CodecError::OutOfMemory { requested: total })?;
        header.encode(&mut frame);
        frame.extend_from_slice(payload);
        Ok(frame)
    }
}

impl Default for XCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for XCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the length without consuming.
        let mut peek = &src[..FRAME_HEADER_SIZE];
        let header = FrameHeader::decode(&mut peek)?;
        self.check_size(header.payload_length())?;

        let total = header.total_length();
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(FRAME_HEADER_SIZE);
        let payload = frame.freeze();

        tracing::trace!(
            message_type = header.message_type,
            length = payload.len(),
            "decoded X Protocol frame"
        );

        Ok(Some(Message {
            message_type: header.message_type,
            payload,
        }))
    }
}

impl Encoder<Message> for XCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.check_size(item.payload.len())?;
        let header = FrameHeader::new(item.message_type, item.payload.len())?;

        dst.reserve(header.total_length());
        header.encode(dst);
        dst.put_slice(&item.payload);

        tracing::trace!(
            message_type = item.message_type,
            length = item.payload.len(),
            "encoded X Protocol frame"
        );

        Ok(())
    }
}

/// Bytes a frame with `payload_len` bytes of payload occupies on the wire.
#[must_use]
pub const fn frame_size(payload_len: usize) -> usize {
    LENGTH_PREFIX_SIZE + 1 + payload_len
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::ProtocolError;

    #[test]
    fn test_decode_frame() {
        let mut codec = XCodec::new();
        let mut data = BytesMut::new();
        data.put_u32_le(5);
        data.put_u8(13);
        data.put_slice(b"\x0a\x02hi");

        let msg = codec.decode(&mut data).unwrap().unwrap();
        assert_eq!(msg.message_type, 13);
        assert_eq!(&msg.payload[..], b"\x0a\x02hi");
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut codec = XCodec::new();
        let mut data = BytesMut::new();
        data.put_u32_le(10);
        data.put_u8(0);
        data.put_slice(b"abc");

        assert!(codec.decode(&mut data).unwrap().is_none());
        assert_eq!(data.len(), 8);

        data.put_slice(b"defghi");
        let msg = codec.decode(&mut data).unwrap().unwrap();
        assert_eq!(msg.len(), 9);
    }

    #[test]
    fn test_decode_empty_payload() {
        let mut codec = XCodec::new();
        let mut data = BytesMut::new();
        data.put_u32_le(1);
        data.put_u8(14);
        data.put_u32_le(1);
        data.put_u8(17);

        let first = codec.decode(&mut data).unwrap().unwrap();
        assert_eq!(first.message_type, 14);
        assert!(first.is_empty());
        let second = codec.decode(&mut data).unwrap().unwrap();
        assert_eq!(second.message_type, 17);
    }

    #[test]
    fn test_zero_length_is_protocol_error() {
        let mut codec = XCodec::new();
        let mut data = BytesMut::new();
        data.put_u32_le(0);
        data.put_u8(0);
        assert!(matches!(
            codec.decode(&mut data),
            Err(CodecError::Protocol(ProtocolError::InvalidFrameLength(0)))
        ));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut codec = XCodec::new().with_max_frame_size(16);
        let mut data = BytesMut::new();
        data.put_u32_le(100);
        data.put_u8(13);
        assert!(matches!(
            codec.decode(&mut data),
            Err(CodecError::FrameTooLarge { size: 99, max: 16 })
        ));

        let err = codec
            .encode(Message::new(12, vec![0u8; 17]), &mut BytesMut::new())
            .unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { size: 17, .. }));
    }

    #[test]
    fn test_max_frame_size_capped_by_length_prefix() {
        let codec = XCodec::new().with_max_frame_size(usize::MAX);
        assert_eq!(codec.max_frame_size(), MAX_PAYLOAD_SIZE);

        let codec = XCodec::new().with_max_frame_size(1024);
        assert_eq!(codec.max_frame_size(), 1024);
    }

    #[test]
    fn test_encode_matches_staged_frame() {
        let mut codec = XCodec::new();
        let mut dst = BytesMut::new();
        codec
            .encode(Message::new(12, Bytes::from_static(b"payload")), &mut dst)
            .unwrap();
        let staged = codec.stage_frame(12, b"payload").unwrap();
        assert_eq!(&dst[..], &staged[..]);
        assert_eq!(staged.len(), frame_size(7));
        assert_eq!(&staged[..5], &[8, 0, 0, 0, 12]);
    }
}
