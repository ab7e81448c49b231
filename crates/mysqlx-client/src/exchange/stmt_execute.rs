//! Statement execution and row streaming.
//!
//! The same response machinery serves `SQL_STMT_EXECUTE` and the CRUD
//! requests: column metadata, rows, fetch markers and a closing
//! `SQL_STMT_EXECUTE_OK`, with notices interleaved anywhere.
//!
//! A [`ResultStream`] keeps what must survive between reads (columns,
//! `has_more_*` flags, buffered rows, the summary). It runs in one of two
//! modes:
//!
//! - **buffered**: every row is decoded into a [`ResultSet`] and the read
//!   runs through to `SQL_STMT_EXECUTE_OK`;
//! - **streaming**: each column goes to a metadata hook and each field of
//!   each row to a field hook. A prefetch bound stops the read after that
//!   many rows; the next `read_response` resumes where it stopped.

use bytes::Bytes;
use mysqlx_codec::Transport;
use mysqlx_protocol::resultset::{
    FetchDone, FetchDoneMoreOutParams, FetchDoneMoreResultsets, FetchSuspended,
};
use mysqlx_protocol::{
    ClientMessage, ColumnMetaData, ErrorMessage, NoticeFrame, ProtocolError, Row, Scalar,
    StmtExecuteOk,
};
use mysqlx_types::{TypeError, Value};

use super::{ErrorHook, ExchangeState, Outcome, on_error, send_request};
use crate::continuation::Continuation;
use crate::dispatch::{Handlers, dispatch};
use crate::error::{Error, Result};
use crate::notice::{
    ExecutionState, ExecutionStateHook, NoticeHandlers, VariableHook, WarningHook, WarningNotice,
    dispatch_notice,
};
use crate::result::{ColumnMeta, ErrorInfo, ExecuteResult, ExecuteSummary, ResultSet};

/// One field of a streamed row.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    /// Row number within the current result set, from 0.
    pub row: u64,
    /// Column position.
    pub index: usize,
    /// Column metadata.
    pub meta: &'a ColumnMeta,
    /// Raw field payload; empty for SQL `NULL`.
    pub raw: &'a Bytes,
}

impl Field<'_> {
    /// Decode the payload by the column's declared type.
    pub fn decode(&self) -> std::result::Result<Value, TypeError> {
        self.meta.decode(self.raw).inspect_err(|e| {
            tracing::warn!(column = %self.meta.name, error = %e, "field decode failed");
        })
    }
}

/// Column metadata hook.
pub type MetaHook<'h> = dyn FnMut(&ColumnMeta) -> Continuation + 'h;

/// Row field hook. Any signal other than `Pass` or `Again` stops the read.
pub type FieldHook<'h> = dyn for<'a> FnMut(Field<'a>) -> Continuation + 'h;

/// Caller hooks for one read.
#[derive(Default)]
pub struct ExecuteHooks<'h> {
    /// Server errors.
    pub on_error: Option<&'h mut ErrorHook<'h>>,
    /// Warning notices.
    pub on_warning: Option<&'h mut WarningHook<'h>>,
    /// Session variable changes.
    pub on_variable_changed: Option<&'h mut VariableHook<'h>>,
    /// Execution-state changes (rows affected, insert id, ...).
    pub on_execution_state: Option<&'h mut ExecutionStateHook<'h>>,
    /// Column metadata, streaming mode only.
    pub on_meta: Option<&'h mut MetaHook<'h>>,
    /// Row fields, streaming mode only.
    pub on_field: Option<&'h mut FieldHook<'h>>,
}

/// Why a read returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `SQL_STMT_EXECUTE_OK` arrived or the server reported an error. The
    /// response is fully consumed.
    Completed,
    /// The prefetch bound was reached. More rows may follow.
    PrefetchReached,
    /// The server suspended the cursor (`RESULTSET_FETCH_SUSPENDED`).
    ServerSuspended,
    /// A result set ended and another follows.
    MoreResultsets,
    /// A result set ended and output parameters follow.
    MoreOutParams,
    /// A hook ended the read early.
    Stopped,
    /// A zero prefetch bound in streaming mode: nothing was read.
    NotRead,
}

/// State of one statement response, kept across reads.
#[derive(Debug, Default)]
pub struct ResultStream {
    buffered: bool,
    columns: Vec<ColumnMeta>,
    field_count: usize,
    has_more_results: bool,
    has_more_rows_in_set: bool,
    set_open: bool,
    completed: bool,
    rows_in_set: u64,
    result_sets: Vec<ResultSet>,
    summary: ExecuteSummary,
}

impl ResultStream {
    /// Decode every row into result sets.
    #[must_use]
    pub fn buffered() -> Self {
        Self {
            buffered: true,
            ..Self::default()
        }
    }

    /// Hand columns and fields to hooks.
    #[must_use]
    pub fn streaming() -> Self {
        Self::default()
    }

    /// Check whether rows are decoded into result sets.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Columns of the current result set.
    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Number of columns announced for the current result set.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Check whether the server may still send result data.
    #[must_use]
    pub fn has_more_results(&self) -> bool {
        self.has_more_results
    }

    /// Check whether the current result set may still have rows.
    #[must_use]
    pub fn has_more_rows_in_set(&self) -> bool {
        self.has_more_rows_in_set
    }

    /// Check whether the response has been fully consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Summary accumulated so far.
    #[must_use]
    pub fn summary(&self) -> &ExecuteSummary {
        &self.summary
    }

    /// Take the buffered result sets and the summary.
    #[must_use]
    pub fn into_result(self) -> ExecuteResult {
        ExecuteResult {
            result_sets: self.result_sets,
            summary: self.summary,
        }
    }

    fn begin_set(&mut self) {
        self.columns.clear();
        self.field_count = 0;
        self.rows_in_set = 0;
        self.set_open = true;
        self.has_more_rows_in_set = true;
        if self.buffered {
            self.result_sets.push(ResultSet::default());
        }
    }

    fn end_set(&mut self) {
        self.set_open = false;
        self.has_more_rows_in_set = false;
    }
}

struct ExecState<'s, 'h> {
    outcome: Outcome<'h>,
    stream: &'s mut ResultStream,
    on_warning: Option<&'h mut WarningHook<'h>>,
    on_variable_changed: Option<&'h mut VariableHook<'h>>,
    on_execution_state: Option<&'h mut ExecutionStateHook<'h>>,
    on_meta: Option<&'h mut MetaHook<'h>>,
    on_field: Option<&'h mut FieldHook<'h>>,
    remaining: Option<u64>,
    status: ReadStatus,
    decode_error: Option<TypeError>,
}

impl ExchangeState for ExecState<'_, '_> {
    fn record_error(&mut self, info: ErrorInfo) {
        self.outcome.record_error(info);
    }
}

fn on_stmt_error(state: &mut ExecState<'_, '_>, error: ErrorMessage) -> Continuation {
    // Nothing follows an error for this statement.
    state.stream.completed = true;
    state.stream.has_more_results = false;
    state.stream.end_set();
    state.status = ReadStatus::Completed;
    on_error(state, error)
}

fn on_notice(state: &mut ExecState<'_, '_>, frame: NoticeFrame) -> Continuation {
    let mut warning: Option<WarningNotice> = None;
    let mut variable: Option<(String, Scalar)> = None;
    let mut changes: Vec<(ExecutionState, u64)> = Vec::new();

    let routed = {
        let mut collect_warning = |w: WarningNotice| {
            warning = Some(w);
            Continuation::Again
        };
        let mut collect_variable = |name: &str, value: &Scalar| {
            variable = Some((name.to_string(), value.clone()));
            Continuation::Again
        };
        let mut collect_state = |s: ExecutionState, v: u64| changes.push((s, v));
        let mut handlers = NoticeHandlers {
            warning: Some(&mut collect_warning),
            variable_changed: Some(&mut collect_variable),
            execution_state: Some(&mut collect_state),
        };
        dispatch_notice(&frame, &mut handlers)
    };
    if let Err(e) = routed {
        return state.outcome.fail(e.into());
    }

    let mut signal = Continuation::Again;
    if let Some(w) = warning {
        if let Some(hook) = state.on_warning.as_deref_mut() {
            signal = hook(w.clone());
        }
        state.stream.summary.warnings.push(w);
    }
    if let Some((name, value)) = variable {
        if let Some(hook) = state.on_variable_changed.as_deref_mut() {
            signal = hook(&name, &value);
        }
    }
    for (change, value) in changes {
        state.stream.summary.record_state(change, value);
        if let Some(hook) = state.on_execution_state.as_deref_mut() {
            hook(change, value);
        }
    }
    if signal.is_terminal() {
        state.status = ReadStatus::Stopped;
    }
    signal
}

fn on_column_meta(state: &mut ExecState<'_, '_>, message: ColumnMetaData) -> Continuation {
    if !state.stream.set_open {
        state.stream.begin_set();
    }
    state.stream.has_more_results = true;
    state.stream.field_count += 1;

    let column = match ColumnMeta::from_metadata(&message) {
        Ok(column) => column,
        Err(e) => return state.outcome.fail(e.into()),
    };
    tracing::trace!(name = %column.name, field_type = column.field_type.name(), "column metadata");

    let signal = if state.stream.buffered {
        if let Some(set) = state.stream.result_sets.last_mut() {
            set.columns.push(column.clone());
        }
        Continuation::Again
    } else {
        match state.on_meta.as_deref_mut() {
            Some(hook) => hook(&column),
            None => Continuation::Again,
        }
    };
    state.stream.columns.push(column);
    if signal.is_terminal() {
        state.status = ReadStatus::Stopped;
    }
    signal
}

fn on_row(state: &mut ExecState<'_, '_>, message: Row) -> Continuation {
    state.stream.has_more_results = true;
    if message.fields.len() != state.stream.columns.len() {
        tracing::warn!(
            fields = message.fields.len(),
            columns = state.stream.columns.len(),
            "row does not match column metadata"
        );
        return state.outcome.fail(
            ProtocolError::MissingField {
                message: "Row",
                field: "field",
            }
            .into(),
        );
    }
    let row_number = state.stream.rows_in_set;
    state.stream.rows_in_set += 1;

    if state.stream.buffered {
        let mut values = Vec::with_capacity(message.fields.len());
        for (raw, meta) in message.fields.iter().zip(&state.stream.columns) {
            match meta.decode(raw) {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(column = %meta.name, error = %e, "field decode failed");
                    values.push(Value::Null);
                    state.decode_error.get_or_insert(e);
                }
            }
        }
        if let Some(set) = state.stream.result_sets.last_mut() {
            set.rows.push(values);
        }
        return Continuation::Again;
    }

    let Some(hook) = state.on_field.as_deref_mut() else {
        return Continuation::Again;
    };
    for (index, (raw, meta)) in message.fields.iter().zip(&state.stream.columns).enumerate() {
        let signal = hook(Field {
            row: row_number,
            index,
            meta,
            raw,
        });
        if !matches!(signal, Continuation::Pass | Continuation::Again) {
            tracing::debug!(index, signal = %signal, "field hook stopped the read");
            state.status = ReadStatus::Stopped;
            return signal;
        }
    }
    match state.remaining.as_mut() {
        Some(remaining) => {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                state.status = ReadStatus::PrefetchReached;
                Continuation::Pass
            } else {
                Continuation::Again
            }
        }
        None => Continuation::Again,
    }
}

fn on_fetch_done(state: &mut ExecState<'_, '_>, _message: FetchDone) -> Continuation {
    state.stream.has_more_results = false;
    state.stream.end_set();
    // STMT_EXECUTE_OK follows.
    Continuation::Again
}

fn on_fetch_suspended(state: &mut ExecState<'_, '_>, _message: FetchSuspended) -> Continuation {
    // Nothing follows until the cursor is fetched again, which this client
    // never does, so the response ends here.
    state.stream.has_more_results = true;
    state.stream.end_set();
    state.stream.completed = true;
    state.status = ReadStatus::ServerSuspended;
    Continuation::Pass
}

fn on_fetch_done_more_resultsets(
    state: &mut ExecState<'_, '_>,
    _message: FetchDoneMoreResultsets,
) -> Continuation {
    state.stream.has_more_results = true;
    state.stream.end_set();
    state.stream.summary.has_more_resultsets = true;
    if state.stream.buffered {
        Continuation::Again
    } else {
        state.status = ReadStatus::MoreResultsets;
        Continuation::Pass
    }
}

fn on_stmt_execute_ok(state: &mut ExecState<'_, '_>, _message: StmtExecuteOk) -> Continuation {
    state.stream.has_more_results = false;
    state.stream.completed = true;
    state.stream.end_set();
    state.status = ReadStatus::Completed;
    Continuation::Pass
}

fn on_fetch_done_more_out_params(
    state: &mut ExecState<'_, '_>,
    _message: FetchDoneMoreOutParams,
) -> Continuation {
    state.stream.has_more_results = true;
    state.stream.end_set();
    if state.stream.buffered {
        Continuation::Again
    } else {
        state.status = ReadStatus::MoreOutParams;
        Continuation::Pass
    }
}

fn handlers<'s, 'h>() -> Handlers<ExecState<'s, 'h>> {
    Handlers {
        error: Some(on_stmt_error),
        notice: Some(on_notice),
        column_meta: Some(on_column_meta),
        row: Some(on_row),
        fetch_done: Some(on_fetch_done),
        fetch_suspended: Some(on_fetch_suspended),
        fetch_done_more_resultsets: Some(on_fetch_done_more_resultsets),
        stmt_execute_ok: Some(on_stmt_execute_ok),
        fetch_done_more_out_params: Some(on_fetch_done_more_out_params),
        ..Handlers::new()
    }
}

/// Statement execution exchange.
#[derive(Default)]
pub struct StmtExecuteExchange<'h> {
    hooks: ExecuteHooks<'h>,
}

impl<'h> StmtExecuteExchange<'h> {
    /// Send a statement request: `SQL_STMT_EXECUTE` or one of the CRUD
    /// messages that share its response.
    pub fn send_request<T: Transport, M: ClientMessage>(transport: &mut T, request: &M) -> Result<()> {
        send_request(transport, request).map(drop)
    }

    /// Bind the caller's hooks for the next read.
    #[must_use]
    pub fn init_read(hooks: ExecuteHooks<'h>) -> Self {
        Self { hooks }
    }

    /// Read the response into `stream`.
    ///
    /// In streaming mode `prefetch` bounds the rows delivered to the field
    /// hook before the read returns [`ReadStatus::PrefetchReached`]; `None`
    /// is unbounded and `Some(0)` reads nothing. Buffered streams ignore
    /// it and read through to the end.
    ///
    /// Fields that fail to decode in buffered mode become `Null`; the read
    /// still consumes the whole response and then reports the first decode
    /// error.
    pub fn read_response<T: Transport>(
        self,
        transport: &mut T,
        stream: &mut ResultStream,
        prefetch: Option<u64>,
    ) -> Result<ReadStatus> {
        if stream.completed {
            return Ok(ReadStatus::Completed);
        }
        if !stream.buffered && prefetch == Some(0) {
            return Ok(ReadStatus::NotRead);
        }
        let hooks = self.hooks;
        let mut state = ExecState {
            outcome: Outcome::new(hooks.on_error),
            stream,
            on_warning: hooks.on_warning,
            on_variable_changed: hooks.on_variable_changed,
            on_execution_state: hooks.on_execution_state,
            on_meta: hooks.on_meta,
            on_field: hooks.on_field,
            remaining: None,
            status: ReadStatus::Stopped,
            decode_error: None,
        };
        if !state.stream.buffered {
            state.remaining = prefetch;
        }
        tracing::debug!(prefetch = ?state.remaining, buffered = state.stream.buffered, "reading statement response");

        let signal = dispatch(transport, &handlers(), &mut state)?;
        state.outcome.conclude(signal)?;
        if let Some(e) = state.decode_error.take() {
            return Err(Error::Type(e));
        }
        Ok(state.status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::{FieldType, StateParameter, StmtExecute};
    use mysqlx_testing::{MockTransport, fixtures};

    fn three_rows() -> Vec<mysqlx_codec::Message> {
        fixtures::single_column_result(
            FieldType::Sint,
            "n",
            [fixtures::field_sint(1), fixtures::field_sint(2), fixtures::field_sint(3)],
        )
    }

    #[test]
    fn test_buffered_collects_rows_and_summary() {
        let mut frames = vec![fixtures::column(FieldType::Sint, "n")];
        frames.push(fixtures::row([fixtures::field_sint(-7)]));
        frames.push(fixtures::row([fixtures::field_null()]));
        frames.push(fixtures::notice_warning(2, 1287, "deprecated"));
        frames.push(fixtures::fetch_done());
        frames.push(fixtures::rows_affected(0));
        frames.push(fixtures::notice_state_changed(
            StateParameter::RowsFound,
            Scalar::Uint(2),
        ));
        frames.push(fixtures::stmt_execute_ok());
        let mut transport = MockTransport::with_frames(frames);

        StmtExecuteExchange::send_request(&mut transport, &StmtExecute::sql("SELECT n FROM t")).unwrap();
        let mut stream = ResultStream::buffered();
        let status = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap();

        assert_eq!(status, ReadStatus::Completed);
        assert!(stream.is_complete());
        assert!(!stream.has_more_results());
        let result = stream.into_result();
        let set = result.first().unwrap();
        assert_eq!(set.rows, vec![vec![Value::Int(-7)], vec![Value::Null]]);
        assert_eq!(result.summary.rows_found, 2);
        assert_eq!(result.summary.warnings.len(), 1);
        assert_eq!(result.summary.warnings[0].code, 1287);
    }

    #[test]
    fn test_buffered_multiple_resultsets() {
        let mut transport = MockTransport::with_frames([
            fixtures::column(FieldType::Sint, "a"),
            fixtures::row([fixtures::field_sint(1)]),
            fixtures::fetch_done_more_resultsets(),
            fixtures::column(FieldType::Bytes, "b"),
            fixtures::column(FieldType::Double, "c"),
            fixtures::row([fixtures::field_string("x"), fixtures::field_double(0.5)]),
            fixtures::fetch_done(),
            fixtures::stmt_execute_ok(),
        ]);
        let mut stream = ResultStream::buffered();
        StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap();
        let result = stream.into_result();
        assert_eq!(result.result_sets.len(), 2);
        assert!(result.summary.has_more_resultsets);
        assert_eq!(result.result_sets[1].columns.len(), 2);
        assert_eq!(result.result_sets[1].get::<String>(0, 0).unwrap(), "x");
        assert_eq!(result.result_sets[1].get::<f64>(0, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_prefetch_suspends_and_resumes() {
        let mut transport = MockTransport::with_frames(three_rows());
        let mut stream = ResultStream::streaming();
        let mut seen = Vec::new();

        {
            let mut on_field = |field: Field<'_>| {
                seen.push(field.decode().unwrap());
                Continuation::Again
            };
            let status = StmtExecuteExchange::init_read(ExecuteHooks {
                on_field: Some(&mut on_field),
                ..ExecuteHooks::default()
            })
            .read_response(&mut transport, &mut stream, Some(2))
            .unwrap();
            assert_eq!(status, ReadStatus::PrefetchReached);
        }
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2)]);
        // Third row, FETCH_DONE and STMT_EXECUTE_OK are still queued.
        assert_eq!(transport.received_count(), 3);
        assert!(stream.has_more_results());
        assert!(!stream.is_complete());

        {
            let mut on_field = |field: Field<'_>| {
                seen.push(field.decode().unwrap());
                Continuation::Again
            };
            let status = StmtExecuteExchange::init_read(ExecuteHooks {
                on_field: Some(&mut on_field),
                ..ExecuteHooks::default()
            })
            .read_response(&mut transport, &mut stream, Some(2))
            .unwrap();
            assert_eq!(status, ReadStatus::Completed);
        }
        assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(stream.is_complete());
        assert!(transport.is_drained());

        // A finished stream is not read again.
        let status = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, Some(1))
            .unwrap();
        assert_eq!(status, ReadStatus::Completed);
    }

    #[test]
    fn test_zero_prefetch_reads_nothing() {
        let mut transport = MockTransport::with_frames(three_rows());
        let mut stream = ResultStream::streaming();
        let status = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, Some(0))
            .unwrap();
        assert_eq!(status, ReadStatus::NotRead);
        assert_eq!(transport.received_count(), 0);
    }

    #[test]
    fn test_meta_hook_receives_factory_output() {
        let mut meta = ColumnMetaData::new(FieldType::Double, Bytes::from_static(b"price"));
        meta.fractional_digits = Some(2);
        meta.table = Some(Bytes::from_static(b"items"));
        let mut transport = MockTransport::with_frames([
            fixtures::column_meta(meta),
            fixtures::fetch_done(),
            fixtures::stmt_execute_ok(),
        ]);
        let mut names = Vec::new();
        let mut on_meta = |column: &ColumnMeta| {
            names.push((column.table.clone(), column.name.clone(), column.fractional_digits));
            Continuation::Again
        };
        let mut stream = ResultStream::streaming();
        StmtExecuteExchange::init_read(ExecuteHooks {
            on_meta: Some(&mut on_meta),
            ..ExecuteHooks::default()
        })
        .read_response(&mut transport, &mut stream, None)
        .unwrap();
        assert_eq!(names, vec![("items".to_string(), "price".to_string(), 2)]);
        assert_eq!(stream.field_count(), 1);
    }

    #[test]
    fn test_unknown_column_type_fails() {
        let meta = ColumnMetaData {
            field_type: Some(99),
            ..ColumnMetaData::default()
        };
        let mut transport = MockTransport::with_frames([fixtures::column_meta(meta)]);
        let mut stream = ResultStream::buffered();
        let err = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_field_hook_failure_stops_read() {
        let mut transport = MockTransport::with_frames(three_rows());
        let mut on_field = |_: Field<'_>| Continuation::Fail;
        let mut stream = ResultStream::streaming();
        let err = StmtExecuteExchange::init_read(ExecuteHooks {
            on_field: Some(&mut on_field),
            ..ExecuteHooks::default()
        })
        .read_response(&mut transport, &mut stream, None)
        .unwrap_err();
        assert!(matches!(err, Error::Aborted(_)));
        assert_eq!(transport.received_count(), 2);
    }

    #[test]
    fn test_decode_error_surfaces_after_full_read() {
        let mut transport = MockTransport::with_frames([
            fixtures::column(FieldType::Sint, "n"),
            fixtures::row([Bytes::from_static(b"\xff")]),
            fixtures::row([fixtures::field_sint(4)]),
            fixtures::fetch_done(),
            fixtures::stmt_execute_ok(),
        ]);
        let mut stream = ResultStream::buffered();
        let err = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap_err();
        assert!(transport.is_drained());
        assert!(matches!(err, Error::Type(_)));
        assert!(stream.is_complete());
        let set = stream.into_result().into_first();
        assert_eq!(set.rows, vec![vec![Value::Null], vec![Value::Int(4)]]);
    }

    #[test]
    fn test_error_mid_stream_completes() {
        let mut transport = MockTransport::with_frames([
            fixtures::column(FieldType::Sint, "n"),
            fixtures::row([fixtures::field_sint(1)]),
            fixtures::error(1317, "70100", "Query execution was interrupted"),
        ]);
        let mut stream = ResultStream::buffered();
        let err = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap_err();
        assert!(err.is_server_error(1317));
        assert!(stream.is_complete());
    }

    #[test]
    fn test_streaming_stops_between_resultsets() {
        let mut transport = MockTransport::with_frames([
            fixtures::column(FieldType::Sint, "a"),
            fixtures::row([fixtures::field_sint(1)]),
            fixtures::fetch_done_more_resultsets(),
            fixtures::column(FieldType::Sint, "b"),
            fixtures::fetch_done_more_out_params(),
            fixtures::fetch_suspended(),
        ]);
        let mut stream = ResultStream::streaming();
        let mut read = || {
            StmtExecuteExchange::default()
                .read_response(&mut transport, &mut stream, None)
                .unwrap()
        };
        assert_eq!(read(), ReadStatus::MoreResultsets);
        assert_eq!(read(), ReadStatus::MoreOutParams);
        assert_eq!(read(), ReadStatus::ServerSuspended);
        assert!(stream.has_more_results());
        assert_eq!(stream.columns()[0].name, "b");
    }

    #[test]
    fn test_server_suspension_ends_the_response() {
        let mut transport = MockTransport::with_frames([
            fixtures::column(FieldType::Sint, "n"),
            fixtures::row([fixtures::field_sint(1)]),
            fixtures::fetch_suspended(),
        ]);
        let mut stream = ResultStream::streaming();
        let status = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap();
        assert_eq!(status, ReadStatus::ServerSuspended);
        assert!(stream.is_complete());
        assert!(!stream.has_more_rows_in_set());

        // A completed stream never touches the transport again.
        let status = StmtExecuteExchange::default()
            .read_response(&mut transport, &mut stream, None)
            .unwrap();
        assert_eq!(status, ReadStatus::Completed);
        assert_eq!(transport.received_count(), 3);
    }
}
