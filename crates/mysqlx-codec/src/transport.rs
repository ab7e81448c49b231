//! Blocking frame transport.
//!
//! The engine runs one exchange at a time and blocks on every read, so the
//! transport is a plain synchronous send/receive pair rather than a stream.

use std::io::{Read, Write};

use bytes::BytesMut;
use mysqlx_protocol::ClientMessage;
use tokio_util::codec::Decoder;

use crate::error::CodecError;
use crate::frame_codec::{Message, XCodec};

/// Size of each read from the underlying stream.
const READ_CHUNK: usize = 16 * 1024;

/// Moves whole frames to and from the server.
pub trait Transport {
    /// Send one frame. Returns the number of bytes written, header included.
    fn send(&mut self, message_type: u8, payload: &[u8]) -> Result<usize, CodecError>;

    /// Block until one complete frame has arrived.
    fn receive(&mut self) -> Result<Message, CodecError>;

    /// Encode and send a client message.
    fn send_message<M: ClientMessage>(&mut self, message: &M) -> Result<usize, CodecError>
    where
        Self: Sized,
    {
        let payload = message.encode_to_bytes();
        self.send(M::MESSAGE_TYPE as u8, &payload)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message_type: u8, payload: &[u8]) -> Result<usize, CodecError> {
        (**self).send(message_type, payload)
    }

    fn receive(&mut self) -> Result<Message, CodecError> {
        (**self).receive()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message_type: u8, payload: &[u8]) -> Result<usize, CodecError> {
        (**self).send(message_type, payload)
    }

    fn receive(&mut self) -> Result<Message, CodecError> {
        (**self).receive()
    }
}

/// A [`Transport`] over any blocking byte stream (TCP, TLS, Unix socket).
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    codec: XCodec,
    read_buf: BytesMut,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self::with_codec(stream, XCodec::new())
    }

    /// Wrap a connected stream with a custom codec.
    pub fn with_codec(stream: S, codec: XCodec) -> Self {
        Self {
            stream,
            codec,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream. Buffered but unread bytes are lost.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn fill(&mut self) -> Result<(), CodecError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match self.stream.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            return Err(CodecError::ConnectionClosed);
        }
        self.read_buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, message_type: u8, payload: &[u8]) -> Result<usize, CodecError> {
        let frame = self.codec.stage_frame(message_type, payload)?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        tracing::trace!(message_type, length = payload.len(), "sent frame");
        Ok(frame.len())
    }

    fn receive(&mut self) -> Result<Message, CodecError> {
        loop {
            if let Some(message) = self.codec.decode(&mut self.read_buf)? {
                return Ok(message);
            }
            self.fill()?;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reads from a fixed script, records writes.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            // Hand out at most 3 bytes per read to exercise reassembly.
            let limit = buf.len().min(3);
            self.input.read(&mut buf[..limit])
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn duplex(input: Vec<u8>) -> Duplex {
        Duplex {
            input: Cursor::new(input),
            output: Vec::new(),
        }
    }

    #[test]
    fn test_receive_reassembles_split_reads() {
        let mut input = Vec::new();
        input.extend_from_slice(&[3, 0, 0, 0, 13, 0x0a, 0x00]);
        input.extend_from_slice(&[1, 0, 0, 0, 14]);
        let mut transport = StreamTransport::new(duplex(input));

        let row = transport.receive().unwrap();
        assert_eq!(row.message_type, 13);
        assert_eq!(&row.payload[..], &[0x0a, 0x00]);
        let done = transport.receive().unwrap();
        assert_eq!(done.message_type, 14);
        assert!(matches!(
            transport.receive(),
            Err(CodecError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_send_writes_one_frame() {
        let mut transport = StreamTransport::new(duplex(Vec::new()));
        let written = transport.send(1, &[]).unwrap();
        assert_eq!(written, 5);
        assert_eq!(transport.get_ref().output, vec![1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_send_message_uses_client_type() {
        let mut transport = StreamTransport::new(duplex(Vec::new()));
        transport
            .send_message(&mysqlx_protocol::CapabilitiesGet)
            .unwrap();
        assert_eq!(transport.into_inner().output, vec![1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_truncated_stream_is_closed_connection() {
        let mut transport = StreamTransport::new(duplex(vec![9, 0, 0, 0, 13, 1]));
        assert!(matches!(
            transport.receive(),
            Err(CodecError::ConnectionClosed)
        ));
    }
}
