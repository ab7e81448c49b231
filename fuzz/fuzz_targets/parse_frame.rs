#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mysqlx_codec::XCodec;
use mysqlx_protocol::{ServerMessage, ServerMessageType};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = XCodec::new().with_max_frame_size(64 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(message)) = codec.decode(&mut buf) {
        if let Ok(message_type) = ServerMessageType::from_u8(message.message_type) {
            let _ = ServerMessage::decode(message_type, message.payload);
        }
    }
});
