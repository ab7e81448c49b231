//! Scripted in-memory transport.
//!
//! [`MockTransport`] plays the server side of an exchange without a socket.
//! Server frames are scripted up front and handed out one frame per
//! `receive`; every frame the client sends is recorded so tests can check
//! what went over the wire.
//!
//! ## Example
//!
//! ```rust
//! use mysqlx_codec::Transport;
//! use mysqlx_testing::fixtures;
//! use mysqlx_testing::mock_transport::MockTransport;
//!
//! let mut transport = MockTransport::builder()
//!     .frame(fixtures::notice_warning(2, 1287, "deprecated"))
//!     .frame(fixtures::ok())
//!     .build();
//!
//! transport.send(1, &[]).unwrap();
//! assert_eq!(transport.receive().unwrap().message_type, 11);
//! assert_eq!(transport.receive().unwrap().message_type, 0);
//! assert!(transport.receive().is_err());
//! assert_eq!(transport.sent_types(), vec![1]);
//! ```

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use mysqlx_codec::{CodecError, Message, Transport, XCodec};
use mysqlx_protocol::{ClientMessage, Decode, ProtocolError};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors raised while inspecting recorded frames.
#[derive(Debug, Error)]
pub enum MockTransportError {
    /// No frame was sent at the requested position.
    #[error("no frame sent at index {0}")]
    NoSuchFrame(usize),

    /// The frame at the requested position has another type.
    #[error("frame {index} has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Position in the send log.
        index: usize,
        /// Expected type byte.
        expected: u8,
        /// Recorded type byte.
        actual: u8,
    },

    /// The recorded payload does not decode as the requested shape.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type for mock transport inspection.
pub type Result<T> = std::result::Result<T, MockTransportError>;

/// Failure injected into every `send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The stream reports an IO error of this kind.
    Io(std::io::ErrorKind),
    /// Staging the frame fails to allocate.
    OutOfMemory,
}

/// Builder for [`MockTransport`].
#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    script: VecDeque<Bytes>,
    codec: XCodec,
    send_failure: Option<SendFailure>,
}

impl MockTransportBuilder {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one server frame.
    #[must_use]
    pub fn frame(mut self, message: Message) -> Self {
        let mut wire = BytesMut::new();
        match XCodec::new().encode(message, &mut wire) {
            Ok(()) => self.script.push_back(wire.freeze()),
            Err(e) => tracing::warn!(error = %e, "dropping unencodable scripted frame"),
        }
        self
    }

    /// Append several server frames.
    #[must_use]
    pub fn frames(self, messages: impl IntoIterator<Item = Message>) -> Self {
        messages.into_iter().fold(self, Self::frame)
    }

    /// Append raw bytes, delivered as-is. Used for malformed frames.
    #[must_use]
    pub fn raw(mut self, bytes: impl Into<Bytes>) -> Self {
        self.script.push_back(bytes.into());
        self
    }

    /// Use a codec with a custom frame limit on the client side.
    #[must_use]
    pub fn with_codec(mut self, codec: XCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Make every `send` fail.
    #[must_use]
    pub fn fail_sends(mut self, failure: SendFailure) -> Self {
        self.send_failure = Some(failure);
        self
    }

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        MockTransport {
            script: self.script,
            inbound: BytesMut::new(),
            codec: self.codec,
            send_failure: self.send_failure,
            sent: Vec::new(),
            received: 0,
        }
    }
}

/// A [`Transport`] that replays a script and records what it is sent.
///
/// Once the script is exhausted `receive` reports
/// [`CodecError::ConnectionClosed`], the same way a peer hang-up would.
#[derive(Debug)]
pub struct MockTransport {
    script: VecDeque<Bytes>,
    inbound: BytesMut,
    codec: XCodec,
    send_failure: Option<SendFailure>,
    sent: Vec<Message>,
    received: usize,
}

impl MockTransport {
    /// Start a script.
    #[must_use]
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// A transport that replays the given frames.
    #[must_use]
    pub fn with_frames(messages: impl IntoIterator<Item = Message>) -> Self {
        MockTransportBuilder::new().frames(messages).build()
    }

    /// Append frames to the remaining script.
    pub fn push_frames(&mut self, messages: impl IntoIterator<Item = Message>) {
        let extra = MockTransportBuilder::new().frames(messages);
        self.script.extend(extra.script);
    }

    /// Every frame sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    /// Type bytes of every frame sent so far.
    #[must_use]
    pub fn sent_types(&self) -> Vec<u8> {
        self.sent.iter().map(|m| m.message_type).collect()
    }

    /// Decode the frame at `index` of the send log as a client message.
    pub fn sent_message<M: ClientMessage + Decode>(&self, index: usize) -> Result<M> {
        let frame = self
            .sent
            .get(index)
            .ok_or(MockTransportError::NoSuchFrame(index))?;
        let expected = M::MESSAGE_TYPE as u8;
        if frame.message_type != expected {
            return Err(MockTransportError::TypeMismatch {
                index,
                expected,
                actual: frame.message_type,
            });
        }
        Ok(M::decode(frame.payload.clone())?)
    }

    /// Frames handed out by `receive` so far.
    #[must_use]
    pub fn received_count(&self) -> usize {
        self.received
    }

    /// Scripted frames not yet received.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len() + usize::from(!self.inbound.is_empty())
    }

    /// Check whether the whole script was consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.remaining() == 0
    }
}

impl Transport for MockTransport {
    fn send(&mut self, message_type: u8, payload: &[u8]) -> std::result::Result<usize, CodecError> {
        match self.send_failure {
            Some(SendFailure::Io(kind)) => return Err(std::io::Error::from(kind).into()),
            Some(SendFailure::OutOfMemory) => {
                return Err(CodecError::OutOfMemory {
                    requested: mysqlx_codec::frame_size(payload.len()),
                });
            }
            None => {}
        }

        let frame = self.codec.stage_frame(message_type, payload)?;
        let written = frame.len();
        let mut wire = BytesMut::from(&frame[..]);
        if let Some(message) = self.codec.decode(&mut wire)? {
            tracing::trace!(message_type, length = payload.len(), "mock transport recorded frame");
            self.sent.push(message);
        }
        Ok(written)
    }

    fn receive(&mut self) -> std::result::Result<Message, CodecError> {
        loop {
            if let Some(message) = self.codec.decode(&mut self.inbound)? {
                self.received += 1;
                return Ok(message);
            }
            match self.script.pop_front() {
                Some(chunk) => self.inbound.extend_from_slice(&chunk),
                None => return Err(CodecError::ConnectionClosed),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;
    use mysqlx_protocol::{Encode, StmtExecute};

    #[test]
    fn test_replays_script_in_order() {
        let mut transport = MockTransport::with_frames([fixtures::fetch_done(), fixtures::ok()]);
        assert_eq!(transport.remaining(), 2);
        assert_eq!(transport.receive().unwrap().message_type, 14);
        assert_eq!(transport.receive().unwrap().message_type, 0);
        assert!(transport.is_drained());
        assert_eq!(transport.received_count(), 2);
        assert!(matches!(
            transport.receive(),
            Err(CodecError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_records_sent_frames() {
        let mut transport = MockTransport::builder().build();
        let stmt = StmtExecute::sql("SELECT 1");
        let written = transport.send_message(&stmt).unwrap();
        assert_eq!(written, stmt.encode_to_bytes().len() + 5);

        let decoded: StmtExecute = transport.sent_message(0).unwrap();
        assert_eq!(decoded, stmt);
        assert!(matches!(
            transport.sent_message::<StmtExecute>(1),
            Err(MockTransportError::NoSuchFrame(1))
        ));
    }

    #[test]
    fn test_raw_bytes_can_split_frames() {
        let mut transport = MockTransport::builder()
            .raw(vec![1u8, 0])
            .raw(vec![0u8, 0, 14])
            .build();
        assert_eq!(transport.receive().unwrap().message_type, 14);
    }

    #[test]
    fn test_injected_send_failure() {
        let mut transport = MockTransport::builder()
            .fail_sends(SendFailure::OutOfMemory)
            .build();
        assert!(matches!(
            transport.send(12, b"x"),
            Err(CodecError::OutOfMemory { requested: 6 })
        ));
        assert!(transport.sent().is_empty());
    }
}
