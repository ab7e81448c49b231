//! # mysqlx-testing
//!
//! Test infrastructure for X Protocol engine development.
//!
//! The engine talks to the server only through the
//! [`Transport`](mysqlx_codec::Transport) trait, so every exchange can be
//! exercised against a scripted in-memory peer.
//!
//! ## Features
//!
//! - [`MockTransport`](mock_transport::MockTransport): replays scripted
//!   server frames and records client frames
//! - [`fixtures`]: ready-made server frames and row field payloads
//!
//! ## Example
//!
//! ```rust
//! use mysqlx_protocol::FieldType;
//! use mysqlx_testing::{fixtures, mock_transport::MockTransport};
//!
//! let transport = MockTransport::with_frames(fixtures::single_column_result(
//!     FieldType::Sint,
//!     "n",
//!     [fixtures::field_sint(1), fixtures::field_sint(2)],
//! ));
//! assert_eq!(transport.remaining(), 5);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_transport;

pub use mock_transport::{MockTransport, MockTransportBuilder, MockTransportError, SendFailure};
