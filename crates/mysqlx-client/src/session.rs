//! Session facade over the exchanges.

use std::marker::PhantomData;
use std::net::TcpStream;

use bytes::Bytes;
use mysqlx_codec::{CodecError, StreamTransport, Transport, XCodec};
use mysqlx_protocol::{Any, CapabilitiesSet, StmtExecute};
use mysqlx_types::ToScalar;

use crate::config::{AuthMechanism, Config};
use crate::crud::CollectionFind;
use crate::error::{Error, Result};
use crate::exchange::auth::AuthResponse;
use crate::exchange::{
    AuthContinueExchange, AuthContinueHook, AuthStartExchange, CapabilitiesGetExchange,
    CapabilitiesSetExchange, ConnectionCloseExchange, ExecuteHooks, ReadStatus, ResultStream,
    StmtExecuteExchange, plain_auth_data,
};
use crate::result::{CapabilityMap, ExecuteResult};
use crate::state::{Connected, ProtocolState, Ready, SessionState};

/// A client session over one transport.
///
/// The type parameter `S` tracks authentication: statements can only be
/// run on a `Session<T, Ready>`. At runtime the session also tracks a
/// [`ProtocolState`]; once a protocol error, an allocation failure or a
/// lost connection has left the byte stream in an unknown position, every
/// further call fails without touching the transport.
pub struct Session<T: Transport, S: SessionState> {
    transport: T,
    config: Config,
    state: ProtocolState,
    /// Row stream of the last streaming statement.
    stream: Option<ResultStream>,
    _state: PhantomData<S>,
}

impl Session<StreamTransport<TcpStream>, Connected> {
    /// Open a TCP connection to the configured server.
    pub fn connect(config: Config) -> Result<Self> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).map_err(CodecError::from)?;
        stream.set_nodelay(true).map_err(CodecError::from)?;
        tracing::info!(host = %config.host, port = config.port, "connected");
        let codec = XCodec::new().with_max_frame_size(config.max_frame_size);
        Ok(Self::new(StreamTransport::with_codec(stream, codec), config))
    }
}

impl<T: Transport> Session<T, Connected> {
    /// Wrap an established transport.
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            state: ProtocolState::Idle,
            stream: None,
            _state: PhantomData,
        }
    }

    /// Read the server's capabilities.
    pub fn capabilities(&mut self) -> Result<CapabilityMap> {
        self.begin()?;
        let result = get_capabilities(&mut self.transport);
        self.settle(result)
    }

    /// Change capabilities. Returns the server's acknowledgement text.
    pub fn set_capabilities<I, K, V>(&mut self, capabilities: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Any>,
    {
        let request = CapabilitiesSet::from_pairs(capabilities);
        self.begin()?;
        let result = set_capabilities(&mut self.transport, &request);
        self.settle(result)
    }

    /// Authenticate with the configured mechanism and credentials.
    pub fn authenticate(mut self) -> Result<Session<T, Ready>> {
        self.begin()?;
        let result = authenticate(&mut self.transport, &self.config);
        self.settle(result)?;
        Ok(self.into_ready())
    }

    /// Authenticate with any mechanism. `on_continue` answers each
    /// challenge the server sends.
    pub fn authenticate_with<'h>(
        mut self,
        mechanism: &str,
        auth_data: impl Into<Bytes>,
        on_continue: &'h mut AuthContinueHook<'h>,
    ) -> Result<Session<T, Ready>> {
        self.begin()?;
        let result = authenticate_with(&mut self.transport, mechanism, auth_data.into(), on_continue);
        self.settle(result)?;
        Ok(self.into_ready())
    }

    fn into_ready(self) -> Session<T, Ready> {
        tracing::info!(user = %self.config.user, schema = ?self.config.schema, "session authenticated");
        Session {
            transport: self.transport,
            config: self.config,
            state: self.state,
            stream: None,
            _state: PhantomData,
        }
    }
}

impl<T: Transport> Session<T, Ready> {
    /// Run one SQL statement and buffer every result set.
    ///
    /// ```rust,ignore
    /// let result = session.execute_sql("SELECT name FROM users WHERE id = ?", &[&42])?;
    /// let name: String = result.into_first().get(0, 0)?;
    /// ```
    pub fn execute_sql(&mut self, sql: &str, args: &[&dyn ToScalar]) -> Result<ExecuteResult> {
        let statement = self.statement(sql, args)?;
        self.execute(&statement)
    }

    /// Send a prepared `StmtExecute` and buffer every result set.
    pub fn execute(&mut self, statement: &StmtExecute) -> Result<ExecuteResult> {
        self.begin()?;
        self.stream = None;
        let result = execute_buffered(&mut self.transport, statement);
        self.settle(result)
    }

    /// Run one SQL statement, handing columns and fields to `hooks`.
    ///
    /// With a prefetch bound configured the call returns
    /// [`ReadStatus::PrefetchReached`] after that many rows; continue with
    /// [`fetch_more`](Self::fetch_more). Starting another exchange first
    /// discards the rest of the stream. [`ReadStatus::ServerSuspended`]
    /// ends the stream; the rows past that point are not fetched.
    pub fn execute_streaming(
        &mut self,
        statement: &StmtExecute,
        hooks: ExecuteHooks<'_>,
    ) -> Result<ReadStatus> {
        self.begin()?;
        let prefetch = self.config.prefetch();
        let stream = self.stream.insert(ResultStream::streaming());
        let result = StmtExecuteExchange::send_request(&mut self.transport, statement).and_then(|()| {
            StmtExecuteExchange::init_read(hooks).read_response(&mut self.transport, stream, prefetch)
        });
        self.settle(result)
    }

    /// Resume the current row stream.
    ///
    /// Returns [`ReadStatus::Completed`] without reading when nothing is
    /// pending.
    pub fn fetch_more(&mut self, hooks: ExecuteHooks<'_>) -> Result<ReadStatus> {
        self.check_usable()?;
        let Some(stream) = self.stream.as_mut() else {
            return Ok(ReadStatus::Completed);
        };
        if stream.is_complete() {
            return Ok(ReadStatus::Completed);
        }
        self.state = ProtocolState::AwaitingResponse;
        let prefetch = self.config.prefetch();
        let result = StmtExecuteExchange::init_read(hooks).read_response(&mut self.transport, stream, prefetch);
        self.settle(result)
    }

    /// The row stream of the last streaming statement.
    #[must_use]
    pub fn stream(&self) -> Option<&ResultStream> {
        self.stream.as_ref()
    }

    /// Run a document query and buffer its result.
    ///
    /// Builder errors are reported before anything is sent.
    pub fn find(&mut self, find: &CollectionFind) -> Result<ExecuteResult> {
        let message = find.finalize()?;
        tracing::debug!(collection = %message.collection.name, "executing find");
        self.begin()?;
        self.stream = None;
        let result = execute_buffered(&mut self.transport, &message);
        self.settle(result)
    }

    fn statement(&self, sql: &str, args: &[&dyn ToScalar]) -> Result<StmtExecute> {
        let mut statement = StmtExecute::sql(sql).with_compact_metadata(self.config.compact_metadata);
        for arg in args {
            statement = statement.with_arg(arg.to_scalar()?);
        }
        tracing::debug!(sql = sql, args = args.len(), "executing statement");
        Ok(statement)
    }
}

impl<T: Transport, S: SessionState> Session<T, S> {
    /// Close the connection.
    pub fn close(mut self) -> Result<()> {
        self.begin()?;
        let result = close(&mut self.transport);
        self.settle(result)?;
        self.state = ProtocolState::Closed;
        tracing::info!("session closed");
        Ok(())
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runtime protocol state.
    #[must_use]
    pub fn protocol_state(&self) -> ProtocolState {
        self.state
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn check_usable(&self) -> Result<()> {
        match self.state {
            ProtocolState::Poisoned => Err(Error::Poisoned),
            ProtocolState::Closed => Err(Error::ConnectionClosed),
            _ => Ok(()),
        }
    }

    /// Make the transport ready for a new request.
    fn begin(&mut self) -> Result<()> {
        self.check_usable()?;
        if self.state == ProtocolState::Suspended {
            let result = self.drain();
            self.settle(result)?;
        }
        self.state = ProtocolState::AwaitingResponse;
        Ok(())
    }

    /// Discard the rest of a suspended row stream.
    fn drain(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        tracing::debug!("discarding the rest of a suspended result stream");
        while !stream.is_complete() {
            StmtExecuteExchange::default().read_response(&mut self.transport, stream, None)?;
        }
        Ok(())
    }

    /// Derive the protocol state from an exchange result.
    fn settle<R>(&mut self, result: Result<R>) -> Result<R> {
        self.state = match &result {
            Err(Error::ConnectionClosed) => ProtocolState::Closed,
            Err(e) if e.is_fatal() => {
                tracing::warn!(error = %e, "session is no longer usable");
                ProtocolState::Poisoned
            }
            _ if self.stream.as_ref().is_some_and(|s| !s.is_complete()) => ProtocolState::Suspended,
            _ => ProtocolState::Idle,
        };
        result
    }
}

impl<T: Transport, S: SessionState> std::fmt::Debug for Session<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

fn get_capabilities<T: Transport>(transport: &mut T) -> Result<CapabilityMap> {
    CapabilitiesGetExchange::send_request(transport)?;
    CapabilitiesGetExchange::default().read_response(transport)
}

fn set_capabilities<T: Transport>(transport: &mut T, request: &CapabilitiesSet) -> Result<Option<String>> {
    CapabilitiesSetExchange::send_request(transport, request)?;
    CapabilitiesSetExchange::default().read_response(transport)
}

fn authenticate<T: Transport>(transport: &mut T, config: &Config) -> Result<()> {
    let schema = config.schema.as_deref().unwrap_or_default();
    let mechanism = config.auth_mechanism;
    let initial = match mechanism {
        AuthMechanism::Plain => plain_auth_data(schema, &config.user, &config.password),
        AuthMechanism::Mysql41 => Bytes::new(),
    };
    AuthStartExchange::send_request(transport, mechanism.name(), initial)?;
    let response = AuthStartExchange::default().read_response(transport)?;
    let response = match (mechanism, response) {
        (AuthMechanism::Mysql41, AuthResponse::Continue(salt)) => {
            AuthContinueExchange::send_request(transport, schema, &config.user, &config.password, &salt)?;
            AuthContinueExchange::default().read_response(transport)?
        }
        (_, response) => response,
    };
    match response {
        AuthResponse::Ok(_) => Ok(()),
        AuthResponse::Continue(_) => Err(Error::Authentication(format!(
            "unexpected challenge for {}",
            mechanism.name()
        ))),
    }
}

fn authenticate_with<'h, T: Transport>(
    transport: &mut T,
    mechanism: &str,
    auth_data: Bytes,
    on_continue: &'h mut AuthContinueHook<'h>,
) -> Result<()> {
    AuthStartExchange::send_request(transport, mechanism, auth_data)?;
    match AuthStartExchange::init_read(None, Some(on_continue)).read_response(transport)? {
        AuthResponse::Ok(_) => Ok(()),
        AuthResponse::Continue(_) => Err(Error::Authentication(format!(
            "challenge for {mechanism} left unanswered"
        ))),
    }
}

fn execute_buffered<T: Transport, M: mysqlx_protocol::ClientMessage>(
    transport: &mut T,
    request: &M,
) -> Result<ExecuteResult> {
    StmtExecuteExchange::send_request(transport, request)?;
    let mut stream = ResultStream::buffered();
    match StmtExecuteExchange::default().read_response(transport, &mut stream, None)? {
        ReadStatus::Completed => Ok(stream.into_result()),
        status => Err(Error::Aborted(format!("result truncated: {status:?}"))),
    }
}

fn close<T: Transport>(transport: &mut T) -> Result<()> {
    ConnectionCloseExchange::send_request(transport)?;
    ConnectionCloseExchange::default().read_response(transport)
}
