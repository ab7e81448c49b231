//! # mysqlx-codec
//!
//! Framing layer for X Protocol messages.
//!
//! This crate turns a raw byte stream into whole frames and back. Frames
//! are reassembled across short reads; outbound frames are staged into a
//! fallibly allocated buffer so that memory exhaustion surfaces as an error.
//!
//! ## Architecture
//!
//! ```text
//! Read + Write stream → XCodec (frame boundaries) → StreamTransport → dispatch loop
//! ```
//!
//! [`XCodec`] implements tokio-util's `Decoder`/`Encoder` over `BytesMut`,
//! so the same framing can back both the blocking [`StreamTransport`] and
//! scripted in-memory transports used in tests.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod frame_codec;
pub mod transport;

pub use error::CodecError;
pub use frame_codec::{Message, XCodec, frame_size};
pub use transport::{StreamTransport, Transport};
