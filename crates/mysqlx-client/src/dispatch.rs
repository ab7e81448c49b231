//! Message dispatch loop.
//!
//! Every exchange reads its response the same way: receive one frame,
//! check its type against the server message enumeration, decode the
//! payload and hand it to the exchange's handler for that type. The
//! handler's [`Continuation`] decides whether the loop reads on.
//!
//! A handler table is a record of optional function slots, one per server
//! message type, plus two catch-alls:
//!
//! - `unexpected` runs for a known type whose slot is empty. Without it the
//!   message is accepted silently and the loop stops with
//!   [`Continuation::Pass`].
//! - `unknown` runs for a type byte outside the enumeration, for
//!   diagnostics only. The loop fails with a protocol error either way.
//!
//! Handlers receive the exchange's per-call state by exclusive reference,
//! so each slot can update bookkeeping without shared ownership.

use bytes::Bytes;
use mysqlx_codec::Transport;
use mysqlx_protocol::resultset::{
    FetchDone, FetchDoneMoreOutParams, FetchDoneMoreResultsets, FetchSuspended,
};
use mysqlx_protocol::{
    AuthenticateContinue, AuthenticateOk, Capabilities, ColumnMetaData, ErrorMessage,
    NoticeFrame, OkMessage, Row, ServerMessage, ServerMessageType, StmtExecuteOk,
};

use crate::continuation::Continuation;
use crate::error::Result;

/// A handler slot for messages of shape `M`.
pub type Handler<S, M> = fn(&mut S, M) -> Continuation;

/// Catch-all for known types without a bound slot.
pub type UnexpectedHandler<S> = fn(&mut S, &ServerMessage) -> Continuation;

/// Diagnostic hook for type bytes outside the enumeration.
pub type UnknownHandler<S> = fn(&mut S, u8, &Bytes) -> Continuation;

/// Handler table bound for one exchange invocation.
pub struct Handlers<S> {
    /// `OK`.
    pub ok: Option<Handler<S, OkMessage>>,
    /// `ERROR`.
    pub error: Option<Handler<S, ErrorMessage>>,
    /// `CONN_CAPABILITIES`.
    pub capabilities: Option<Handler<S, Capabilities>>,
    /// `SESS_AUTHENTICATE_CONTINUE`.
    pub auth_continue: Option<Handler<S, AuthenticateContinue>>,
    /// `SESS_AUTHENTICATE_OK`.
    pub auth_ok: Option<Handler<S, AuthenticateOk>>,
    /// `NOTICE`.
    pub notice: Option<Handler<S, NoticeFrame>>,
    /// `RESULTSET_COLUMN_META_DATA`.
    pub column_meta: Option<Handler<S, ColumnMetaData>>,
    /// `RESULTSET_ROW`.
    pub row: Option<Handler<S, Row>>,
    /// `RESULTSET_FETCH_DONE`.
    pub fetch_done: Option<Handler<S, FetchDone>>,
    /// `RESULTSET_FETCH_SUSPENDED`.
    pub fetch_suspended: Option<Handler<S, FetchSuspended>>,
    /// `RESULTSET_FETCH_DONE_MORE_RESULTSETS`.
    pub fetch_done_more_resultsets: Option<Handler<S, FetchDoneMoreResultsets>>,
    /// `SQL_STMT_EXECUTE_OK`.
    pub stmt_execute_ok: Option<Handler<S, StmtExecuteOk>>,
    /// `RESULTSET_FETCH_DONE_MORE_OUT_PARAMS`.
    pub fetch_done_more_out_params: Option<Handler<S, FetchDoneMoreOutParams>>,
    /// Known type, empty slot.
    pub unexpected: Option<UnexpectedHandler<S>>,
    /// Type byte outside the enumeration.
    pub unknown: Option<UnknownHandler<S>>,
}

impl<S> Handlers<S> {
    /// A table with every slot empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ok: None,
            error: None,
            capabilities: None,
            auth_continue: None,
            auth_ok: None,
            notice: None,
            column_meta: None,
            row: None,
            fetch_done: None,
            fetch_suspended: None,
            fetch_done_more_resultsets: None,
            stmt_execute_ok: None,
            fetch_done_more_out_params: None,
            unexpected: None,
            unknown: None,
        }
    }

    /// Check whether the slot for `message_type` is bound.
    #[must_use]
    pub fn is_bound(&self, message_type: ServerMessageType) -> bool {
        use ServerMessageType as T;
        match message_type {
            T::Ok => self.ok.is_some(),
            T::Error => self.error.is_some(),
            T::ConnCapabilities => self.capabilities.is_some(),
            T::SessAuthenticateContinue => self.auth_continue.is_some(),
            T::SessAuthenticateOk => self.auth_ok.is_some(),
            T::Notice => self.notice.is_some(),
            T::ResultsetColumnMetaData => self.column_meta.is_some(),
            T::ResultsetRow => self.row.is_some(),
            T::ResultsetFetchDone => self.fetch_done.is_some(),
            T::ResultsetFetchSuspended => self.fetch_suspended.is_some(),
            T::ResultsetFetchDoneMoreResultsets => self.fetch_done_more_resultsets.is_some(),
            T::SqlStmtExecuteOk => self.stmt_execute_ok.is_some(),
            T::ResultsetFetchDoneMoreOutParams => self.fetch_done_more_out_params.is_some(),
        }
    }

    /// Route one decoded message and return the handler's signal.
    pub fn handle(&self, state: &mut S, message: ServerMessage) -> Continuation {
        if !self.is_bound(message.message_type()) {
            return match self.unexpected {
                Some(unexpected) => unexpected(state, &message),
                None => Continuation::Pass,
            };
        }
        match message {
            ServerMessage::Ok(m) => call(self.ok, state, m),
            ServerMessage::Error(m) => call(self.error, state, m),
            ServerMessage::Capabilities(m) => call(self.capabilities, state, m),
            ServerMessage::AuthenticateContinue(m) => call(self.auth_continue, state, m),
            ServerMessage::AuthenticateOk(m) => call(self.auth_ok, state, m),
            ServerMessage::Notice(m) => call(self.notice, state, m),
            ServerMessage::ColumnMetaData(m) => call(self.column_meta, state, m),
            ServerMessage::Row(m) => call(self.row, state, m),
            ServerMessage::FetchDone(m) => call(self.fetch_done, state, m),
            ServerMessage::FetchSuspended(m) => call(self.fetch_suspended, state, m),
            ServerMessage::FetchDoneMoreResultsets(m) => {
                call(self.fetch_done_more_resultsets, state, m)
            }
            ServerMessage::StmtExecuteOk(m) => call(self.stmt_execute_ok, state, m),
            ServerMessage::FetchDoneMoreOutParams(m) => {
                call(self.fetch_done_more_out_params, state, m)
            }
            _ => Continuation::Pass,
        }
    }
}

impl<S> Default for Handlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Handlers<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Handlers<S> {}

impl<S> std::fmt::Debug for Handlers<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("ok", &self.ok.is_some())
            .field("error", &self.error.is_some())
            .field("notice", &self.notice.is_some())
            .field("column_meta", &self.column_meta.is_some())
            .field("row", &self.row.is_some())
            .field("unexpected", &self.unexpected.is_some())
            .field("unknown", &self.unknown.is_some())
            .finish_non_exhaustive()
    }
}

fn call<S, M>(slot: Option<Handler<S, M>>, state: &mut S, message: M) -> Continuation {
    slot.map_or(Continuation::Pass, |handler| handler(state, message))
}

/// Read and dispatch messages until a handler returns a terminal signal.
///
/// Returns the terminal signal: one of [`Continuation::Pass`] or
/// [`Continuation::AsyncAgain`] on success, [`Continuation::Fail`] or
/// [`Continuation::PassReturnFail`] on failure. Transport failures and
/// protocol violations (an unknown type byte, an undecodable payload)
/// surface as `Err` and leave the connection unusable.
pub fn dispatch<T, S>(transport: &mut T, handlers: &Handlers<S>, state: &mut S) -> Result<Continuation>
where
    T: Transport + ?Sized,
{
    loop {
        let frame = transport.receive()?;
        let message_type = match ServerMessageType::from_u8(frame.message_type) {
            Ok(message_type) => message_type,
            Err(e) => {
                tracing::warn!(
                    message_type = frame.message_type,
                    length = frame.payload.len(),
                    "server sent an invalid message type"
                );
                if let Some(unknown) = handlers.unknown {
                    unknown(state, frame.message_type, &frame.payload);
                }
                return Err(e.into());
            }
        };

        let message = ServerMessage::decode(message_type, frame.payload).inspect_err(|e| {
            tracing::warn!(message = message_type.name(), error = %e, "undecodable server message");
        })?;
        let signal = handlers.handle(state, message);
        tracing::debug!(message = message_type.name(), signal = %signal, "dispatched server message");

        if signal.is_terminal() {
            return Ok(signal);
        }
    }
}
