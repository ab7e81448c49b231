//! # mysqlx-client
//!
//! Blocking MySQL X Protocol client engine.
//!
//! The crate is built in layers:
//!
//! - [`dispatch`] reads frames from a [`Transport`](mysqlx_codec::Transport)
//!   and routes each decoded message to a per-type handler slot. Handlers
//!   answer with a [`Continuation`] that tells the loop whether to read on.
//! - [`notice`] routes the payload of a `NOTICE` frame (warnings, session
//!   variable changes, session state changes) the same way.
//! - [`exchange`] pairs a request with the handler table that reads its
//!   response: capabilities, authentication, statement execution and
//!   connection close.
//! - [`crud`] builds document queries from X DevAPI clause strings.
//! - [`Session`] drives the exchanges over one connection and tracks
//!   whether that connection can still be used.
//!
//! ## Session states
//!
//! ```text
//! Connected -> Ready (via authenticate())
//! Ready -> Ready (via execute_sql(), find(), execute_streaming())
//! any -> closed (via close())
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysqlx_client::{Config, Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_connection_string("host=localhost;user=app;password=secret;schema=shop")?;
//!     let mut session = Session::connect(config)?.authenticate()?;
//!
//!     let result = session.execute_sql("SELECT name FROM users WHERE id = ?", &[&1])?;
//!     if let Some(set) = result.first() {
//!         let name: String = set.get(0, 0)?;
//!         println!("User: {name}");
//!     }
//!
//!     let mut orders = mysqlx_client::CollectionFind::new("shop", "orders");
//!     orders.criteria("total > :min")?.bind([("min", 100)])?.limit(10)?;
//!     let docs = session.find(&orders)?;
//!     println!("{} documents", docs.into_first().len());
//!
//!     session.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod continuation;
pub mod crud;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod notice;
pub mod result;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use config::{AuthMechanism, Config};
pub use continuation::Continuation;
pub use crud::{CollectionFind, CrudError, LockWait};
pub use dispatch::{Handlers, dispatch};
pub use error::{Error, Result};
pub use exchange::{ExecuteHooks, Field, ReadStatus, ResultStream};
pub use mysqlx_types::{FromValue, ToScalar, Value};
pub use notice::{ExecutionState, WarningNotice};
pub use result::{CapabilityMap, CapabilityValue, ColumnMeta, ErrorInfo, ExecuteResult, ExecuteSummary, ResultSet};
pub use session::Session;
pub use state::{Connected, ProtocolState, Ready, SessionState};
