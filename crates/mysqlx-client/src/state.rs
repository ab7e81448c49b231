//! Session state types.
//!
//! Authentication is tracked at compile time: a [`Session`](crate::Session)
//! starts out [`Connected`] and becomes [`Ready`] once an authentication
//! exchange succeeds. Only a ready session can execute statements.
//!
//! ## State Transitions
//!
//! ```text
//! Connected -> Ready (via authenticate())
//! Ready -> Suspended (a prefetch bound stopped a row stream)
//! Suspended -> Ready (via fetch_more() reaching STMT_EXECUTE_OK)
//! any -> Poisoned (protocol error, out of memory, lost connection)
//! any -> Closed (via close())
//! ```

/// Marker trait for session states.
///
/// This trait is sealed to prevent external implementations.
pub trait SessionState: private::Sealed {}

/// Transport established, not yet authenticated.
///
/// Capabilities can be read and changed in this state.
#[derive(Debug)]
pub struct Connected;

/// Authenticated and ready for statements.
#[derive(Debug)]
pub struct Ready;

impl SessionState for Connected {}
impl SessionState for Ready {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Ready {}
}

/// Runtime protocol state of one connection.
///
/// Only one exchange is in flight at a time, so this tracks where the
/// current one stands and whether the transport may be used at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    /// No exchange in flight.
    #[default]
    Idle,
    /// A request was sent and its response is being read.
    AwaitingResponse,
    /// A row stream stopped at its prefetch bound. Only `fetch_more` may
    /// touch the transport until the stream completes.
    Suspended,
    /// A protocol error left the byte stream in an unknown position.
    Poisoned,
    /// The connection was closed.
    Closed,
}

impl ProtocolState {
    /// Check if the connection can carry another exchange.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Poisoned | Self::Closed)
    }

    /// Check if a response is still pending on the wire.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::AwaitingResponse | Self::Suspended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_state_default() {
        assert_eq!(ProtocolState::default(), ProtocolState::Idle);
    }

    #[test]
    fn test_protocol_state_is_usable() {
        assert!(ProtocolState::Idle.is_usable());
        assert!(ProtocolState::AwaitingResponse.is_usable());
        assert!(ProtocolState::Suspended.is_usable());
        assert!(!ProtocolState::Poisoned.is_usable());
        assert!(!ProtocolState::Closed.is_usable());
    }

    #[test]
    fn test_protocol_state_is_busy() {
        assert!(!ProtocolState::Idle.is_busy());
        assert!(ProtocolState::AwaitingResponse.is_busy());
        assert!(ProtocolState::Suspended.is_busy());
        assert!(!ProtocolState::Poisoned.is_busy());
    }
}
