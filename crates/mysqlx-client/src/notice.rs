//! Notice sub-dispatcher.
//!
//! A `NOTICE` frame wraps one of three payloads. Only local-scope frames
//! that carry both a type and a payload are routed; everything else is
//! skipped with [`Continuation::Again`].

use mysqlx_protocol::notice::{SessionVariableChanged, Warning};
use mysqlx_protocol::{
    Decode, NoticeFrame, NoticeScope, NoticeType, ProtocolError, Scalar, SessionStateChanged,
    StateParameter, WarningLevel,
};

use crate::continuation::Continuation;

/// Warning code used when the server leaves it out.
pub const DEFAULT_WARNING_CODE: u32 = 1000;

/// A warning notice with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningNotice {
    /// Level; `Warning` when absent.
    pub level: WarningLevel,
    /// MySQL warning code; 1000 when absent.
    pub code: u32,
    /// Message; empty when absent.
    pub message: String,
}

impl From<Warning> for WarningNotice {
    fn from(warning: Warning) -> Self {
        Self {
            level: warning
                .level
                .and_then(WarningLevel::from_u32)
                .unwrap_or_default(),
            code: warning.code.unwrap_or(DEFAULT_WARNING_CODE),
            message: warning.msg.unwrap_or_default(),
        }
    }
}

/// Execution-state categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// `GENERATED_INSERT_ID`.
    GeneratedInsertId,
    /// `ROWS_AFFECTED`.
    RowsAffected,
    /// `ROWS_FOUND`.
    RowsFound,
    /// `ROWS_MATCHED`.
    RowsMatched,
}

impl ExecutionState {
    /// Map a state parameter to its category. Parameters that are observed
    /// but not surfaced map to `None`.
    #[must_use]
    pub fn from_parameter(param: StateParameter) -> Option<Self> {
        match param {
            StateParameter::GeneratedInsertId => Some(Self::GeneratedInsertId),
            StateParameter::RowsAffected => Some(Self::RowsAffected),
            StateParameter::RowsFound => Some(Self::RowsFound),
            StateParameter::RowsMatched => Some(Self::RowsMatched),
            StateParameter::CurrentSchema
            | StateParameter::AccountExpired
            | StateParameter::TrxCommitted
            | StateParameter::TrxRolledback
            | StateParameter::ProducedMessage
            | StateParameter::ClientIdAssigned => None,
        }
    }
}

/// Warning hook.
pub type WarningHook<'h> = dyn FnMut(WarningNotice) -> Continuation + 'h;

/// Session variable hook.
pub type VariableHook<'h> = dyn FnMut(&str, &Scalar) -> Continuation + 'h;

/// Execution-state hook.
pub type ExecutionStateHook<'h> = dyn FnMut(ExecutionState, u64) + 'h;

/// Optional hooks for the three notice payloads.
#[derive(Default)]
pub struct NoticeHandlers<'h> {
    /// Receives warnings. Absent: the notice yields [`Continuation::Pass`].
    pub warning: Option<&'h mut WarningHook<'h>>,
    /// Receives session variable changes that carry both name and value.
    pub variable_changed: Option<&'h mut VariableHook<'h>>,
    /// Receives execution-state changes.
    pub execution_state: Option<&'h mut ExecutionStateHook<'h>>,
}

impl std::fmt::Debug for NoticeHandlers<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeHandlers")
            .field("warning", &self.warning.is_some())
            .field("variable_changed", &self.variable_changed.is_some())
            .field("execution_state", &self.execution_state.is_some())
            .finish()
    }
}

/// Route one notice frame.
///
/// Fails only when the embedded payload does not decode.
pub fn dispatch_notice(
    frame: &NoticeFrame,
    handlers: &mut NoticeHandlers<'_>,
) -> Result<Continuation, ProtocolError> {
    let (Some(NoticeScope::Local), Some(notice_type), Some(payload)) =
        (frame.scope(), frame.notice_type, frame.payload.as_ref())
    else {
        tracing::trace!(scope = ?frame.scope, notice_type = ?frame.notice_type, "skipping notice");
        return Ok(Continuation::Again);
    };

    match NoticeType::from_u32(notice_type) {
        Some(NoticeType::Warning) => {
            let warning = WarningNotice::from(Warning::decode(payload.clone())?);
            tracing::debug!(code = warning.code, level = ?warning.level, "warning notice");
            Ok(match handlers.warning.as_deref_mut() {
                Some(hook) => hook(warning),
                None => Continuation::Pass,
            })
        }
        Some(NoticeType::SessionVariableChanged) => {
            let changed = SessionVariableChanged::decode(payload.clone())?;
            Ok(match (handlers.variable_changed.as_deref_mut(), &changed.param, &changed.value) {
                (Some(hook), Some(param), Some(value)) => hook(param, value),
                _ => Continuation::Again,
            })
        }
        Some(NoticeType::SessionStateChanged) => {
            let changed = SessionStateChanged::decode(payload.clone())?;
            Ok(inspect_state_change(&changed, handlers.execution_state.as_deref_mut()))
        }
        None => {
            tracing::warn!(notice_type, "ignoring unknown notice type");
            Ok(Continuation::Again)
        }
    }
}

/// Classify a session state change and forward execution-state categories.
///
/// The hook runs only when both parameter and value are present; the value
/// is read as an unsigned integer. Always yields [`Continuation::Again`].
pub fn inspect_state_change(
    changed: &SessionStateChanged,
    hook: Option<&mut ExecutionStateHook<'_>>,
) -> Continuation {
    let Some(param) = changed.param else {
        return Continuation::Again;
    };
    match StateParameter::from_u32(param) {
        Some(known) => match (ExecutionState::from_parameter(known), hook, &changed.value) {
            (Some(state), Some(hook), Some(value)) => {
                let value = value.to_uint();
                tracing::debug!(?state, value, "execution state changed");
                hook(state, value);
            }
            (state, _, value) => {
                tracing::trace!(param = ?known, surfaced = state.is_some(), value = ?value, "session state changed");
            }
        },
        None => tracing::debug!(param, "unknown session state parameter"),
    }
    Continuation::Again
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mysqlx_protocol::Encode;

    fn local(notice_type: NoticeType, payload: &impl Encode) -> NoticeFrame {
        NoticeFrame::local(notice_type, payload)
    }

    #[test]
    fn test_warning_defaults() {
        let mut seen = Vec::new();
        let mut hook = |w: WarningNotice| {
            seen.push(w);
            Continuation::Again
        };
        let mut handlers = NoticeHandlers {
            warning: Some(&mut hook),
            ..NoticeHandlers::default()
        };
        let frame = local(NoticeType::Warning, &Warning::default());
        assert_eq!(dispatch_notice(&frame, &mut handlers).unwrap(), Continuation::Again);
        drop(handlers);
        assert_eq!(
            seen,
            vec![WarningNotice {
                level: WarningLevel::Warning,
                code: 1000,
                message: String::new(),
            }]
        );
    }

    #[test]
    fn test_warning_without_hook_passes() {
        let frame = local(NoticeType::Warning, &Warning::default());
        let signal = dispatch_notice(&frame, &mut NoticeHandlers::default()).unwrap();
        assert_eq!(signal, Continuation::Pass);
    }

    #[test]
    fn test_non_local_or_incomplete_frames_are_skipped() {
        let mut global = local(NoticeType::Warning, &Warning::default());
        global.scope = Some(NoticeScope::Global as u32);
        let mut untyped = local(NoticeType::Warning, &Warning::default());
        untyped.notice_type = None;
        let empty = NoticeFrame {
            notice_type: Some(1),
            scope: Some(2),
            payload: None,
        };
        for frame in [global, untyped, empty] {
            let signal = dispatch_notice(&frame, &mut NoticeHandlers::default()).unwrap();
            assert_eq!(signal, Continuation::Again);
        }
    }

    #[test]
    fn test_variable_change_needs_name_and_value() {
        let mut calls = 0;
        let mut hook = |name: &str, value: &Scalar| {
            assert_eq!(name, "autocommit");
            assert_eq!(value, &Scalar::Bool(true));
            calls += 1;
            Continuation::Pass
        };
        let mut handlers = NoticeHandlers {
            variable_changed: Some(&mut hook),
            ..NoticeHandlers::default()
        };

        let partial = local(
            NoticeType::SessionVariableChanged,
            &SessionVariableChanged {
                param: Some("autocommit".into()),
                value: None,
            },
        );
        assert_eq!(dispatch_notice(&partial, &mut handlers).unwrap(), Continuation::Again);

        let full = local(
            NoticeType::SessionVariableChanged,
            &SessionVariableChanged {
                param: Some("autocommit".into()),
                value: Some(Scalar::Bool(true)),
            },
        );
        assert_eq!(dispatch_notice(&full, &mut handlers).unwrap(), Continuation::Pass);
        drop(handlers);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_execution_state_categories() {
        let mut seen = Vec::new();
        let mut hook = |state: ExecutionState, value: u64| seen.push((state, value));
        let mut handlers = NoticeHandlers {
            execution_state: Some(&mut hook),
            ..NoticeHandlers::default()
        };
        let changes = [
            SessionStateChanged::new(StateParameter::RowsAffected, Scalar::Uint(3)),
            SessionStateChanged::new(StateParameter::GeneratedInsertId, Scalar::Sint(42)),
            SessionStateChanged::new(StateParameter::TrxCommitted, Scalar::Uint(1)),
            SessionStateChanged::new(StateParameter::RowsMatched, Scalar::string("7")),
            SessionStateChanged {
                param: Some(StateParameter::RowsFound as u32),
                value: None,
            },
        ];
        for changed in &changes {
            let frame = local(NoticeType::SessionStateChanged, changed);
            assert_eq!(dispatch_notice(&frame, &mut handlers).unwrap(), Continuation::Again);
        }
        drop(handlers);
        assert_eq!(
            seen,
            vec![
                (ExecutionState::RowsAffected, 3),
                (ExecutionState::GeneratedInsertId, 42),
                (ExecutionState::RowsMatched, 7),
            ]
        );
    }

    #[test]
    fn test_unknown_notice_type_is_ignored() {
        let frame = NoticeFrame {
            notice_type: Some(99),
            scope: Some(2),
            payload: Some(Bytes::from_static(b"\x08\x01")),
        };
        let signal = dispatch_notice(&frame, &mut NoticeHandlers::default()).unwrap();
        assert_eq!(signal, Continuation::Again);
    }

    #[test]
    fn test_malformed_payload_is_protocol_error() {
        let frame = NoticeFrame {
            notice_type: Some(1),
            scope: Some(2),
            payload: Some(Bytes::from_static(b"\x08")),
        };
        assert!(dispatch_notice(&frame, &mut NoticeHandlers::default()).is_err());
    }
}
