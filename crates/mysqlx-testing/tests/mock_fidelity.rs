//! Mock transport fidelity tests.
//!
//! The scripted transport must hand out exactly what a stream-backed
//! transport would read off a socket carrying the same bytes.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use bytes::BytesMut;
use mysqlx_codec::{CodecError, StreamTransport, Transport, XCodec};
use mysqlx_protocol::FieldType;
use mysqlx_testing::{MockTransport, fixtures};
use tokio_util::codec::Encoder;

fn script() -> Vec<mysqlx_codec::Message> {
    let mut frames = vec![fixtures::notice_warning(1, 1003, "note")];
    frames.extend(fixtures::single_column_result(
        FieldType::Bytes,
        "name",
        [fixtures::field_string("alice"), fixtures::field_null()],
    ));
    frames
}

#[test]
fn test_mock_matches_stream_transport() {
    let mut wire = BytesMut::new();
    let mut codec = XCodec::new();
    for frame in script() {
        codec.encode(frame, &mut wire).unwrap();
    }

    let mut stream = StreamTransport::new(Cursor::new(wire.to_vec()));
    let mut mock = MockTransport::with_frames(script());

    loop {
        match (stream.receive(), mock.receive()) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(CodecError::ConnectionClosed), Err(CodecError::ConnectionClosed)) => break,
            (a, b) => panic!("transports diverged: {a:?} vs {b:?}"),
        }
    }
    assert_eq!(mock.received_count(), 6);
}

#[test]
fn test_oversized_scripted_frame_is_rejected_by_client_codec() {
    let mut mock = MockTransport::builder()
        .with_codec(XCodec::new().with_max_frame_size(4))
        .frame(fixtures::row([fixtures::field_string("too long for the limit")]))
        .build();
    assert!(matches!(
        mock.receive(),
        Err(CodecError::FrameTooLarge { max: 4, .. })
    ));
}
