//! Protocol exchanges.
//!
//! Each exchange is a request/response pair run in three steps:
//!
//! 1. `send_request` encodes and sends one client message;
//! 2. `init_read` binds the caller's hooks (an error hook always, plus
//!    exchange-specific ones);
//! 3. `read_response` runs the [dispatch loop](crate::dispatch) with the
//!    exchange's private handler table and per-call state, then turns the
//!    terminal signal into a `Result`.
//!
//! The handler table of every exchange routes `ERROR` the same way: the
//! error is recorded with defaults for absent fields, forwarded to the
//! caller's error hook and the loop stops with
//! [`Continuation::PassReturnFail`].

pub mod auth;
pub mod capabilities;
pub mod close;
pub mod stmt_execute;

use mysqlx_codec::Transport;
use mysqlx_protocol::{ClientMessage, ErrorMessage, NoticeFrame};

use crate::continuation::Continuation;
use crate::error::{Error, Result};
use crate::result::ErrorInfo;

pub use auth::{
    AuthContinueExchange, AuthContinueHook, AuthStartExchange, mysql41_auth_data, plain_auth_data,
};
pub use capabilities::{CapabilitiesGetExchange, CapabilitiesSetExchange};
pub use close::ConnectionCloseExchange;
pub use stmt_execute::{
    ExecuteHooks, Field, FieldHook, MetaHook, ReadStatus, ResultStream, StmtExecuteExchange,
};

/// Error hook: receives every server-reported error with defaults applied.
pub type ErrorHook<'h> = dyn FnMut(&ErrorInfo) + 'h;

/// Bookkeeping shared by every exchange's per-call state.
#[derive(Default)]
pub struct Outcome<'h> {
    error: Option<ErrorInfo>,
    failure: Option<Error>,
    on_error: Option<&'h mut ErrorHook<'h>>,
}

impl<'h> Outcome<'h> {
    /// Outcome with an optional caller error hook.
    pub fn new(on_error: Option<&'h mut ErrorHook<'h>>) -> Self {
        Self {
            error: None,
            failure: None,
            on_error,
        }
    }

    /// The server error recorded by the last read, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Record a server error and forward it to the caller's hook.
    pub fn record_error(&mut self, info: ErrorInfo) {
        tracing::debug!(code = info.code, sql_state = %info.sql_state, fatal = info.fatal, "server error");
        if let Some(hook) = self.on_error.as_deref_mut() {
            hook(&info);
        }
        self.error = Some(info);
    }

    /// Record a local failure that stops the exchange.
    pub fn fail(&mut self, error: Error) -> Continuation {
        tracing::debug!(error = %error, "exchange failed");
        self.failure = Some(error);
        Continuation::Fail
    }

    /// Turn a terminal signal into the exchange result.
    pub fn conclude(&mut self, signal: Continuation) -> Result<()> {
        if signal.is_success() {
            return Ok(());
        }
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        match self.error.clone() {
            Some(info) => Err(info.into()),
            None => Err(Error::Aborted(format!("handler returned {signal}"))),
        }
    }
}

impl std::fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcome")
            .field("error", &self.error)
            .field("failure", &self.failure)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Per-call state of an exchange.
pub trait ExchangeState {
    /// Record a server error.
    fn record_error(&mut self, info: ErrorInfo);
}

impl ExchangeState for Outcome<'_> {
    fn record_error(&mut self, info: ErrorInfo) {
        Outcome::record_error(self, info);
    }
}

/// `ERROR` slot shared by every exchange.
pub fn on_error<S: ExchangeState>(state: &mut S, error: ErrorMessage) -> Continuation {
    state.record_error(ErrorInfo::from(error));
    Continuation::PassReturnFail
}

/// `NOTICE` slot for exchanges that do not look inside notices.
pub fn skip_notice<S>(_state: &mut S, _notice: NoticeFrame) -> Continuation {
    Continuation::Again
}

/// Encode and send one client message.
pub(crate) fn send_request<T: Transport, M: ClientMessage>(transport: &mut T, message: &M) -> Result<usize> {
    let sent = transport.send_message(message)?;
    tracing::debug!(message = ?M::MESSAGE_TYPE, bytes = sent, "sent request");
    Ok(sent)
}
