//! Connection close.

use mysqlx_codec::Transport;
use mysqlx_protocol::{ConnectionClose, OkMessage};

use super::{ErrorHook, Outcome, on_error, send_request, skip_notice};
use crate::continuation::Continuation;
use crate::dispatch::{Handlers, dispatch};
use crate::error::Result;

fn on_close_ok(_outcome: &mut Outcome<'_>, _message: OkMessage) -> Continuation {
    Continuation::Pass
}

fn handlers<'h>() -> Handlers<Outcome<'h>> {
    Handlers {
        ok: Some(on_close_ok),
        error: Some(on_error),
        notice: Some(skip_notice),
        ..Handlers::new()
    }
}

/// Asks the server to close the connection.
#[derive(Default)]
pub struct ConnectionCloseExchange<'h> {
    on_error: Option<&'h mut ErrorHook<'h>>,
}

impl<'h> ConnectionCloseExchange<'h> {
    /// Send `CON_CLOSE`.
    pub fn send_request<T: Transport>(transport: &mut T) -> Result<()> {
        send_request(transport, &ConnectionClose).map(drop)
    }

    /// Bind the caller's error hook.
    #[must_use]
    pub fn init_read(on_error: Option<&'h mut ErrorHook<'h>>) -> Self {
        Self { on_error }
    }

    /// Wait for the server's `OK`.
    pub fn read_response<T: Transport>(self, transport: &mut T) -> Result<()> {
        let mut outcome = Outcome::new(self.on_error);
        let signal = dispatch(transport, &handlers(), &mut outcome)?;
        outcome.conclude(signal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::ClientMessageType;
    use mysqlx_testing::{MockTransport, fixtures};

    #[test]
    fn test_close_skips_notices_until_ok() {
        let mut transport = MockTransport::with_frames([
            fixtures::notice_warning(2, 1, "bye"),
            fixtures::ok_with("bye!"),
        ]);
        ConnectionCloseExchange::send_request(&mut transport).unwrap();
        ConnectionCloseExchange::default()
            .read_response(&mut transport)
            .unwrap();
        assert_eq!(transport.sent_types(), vec![ClientMessageType::ConClose as u8]);
        assert!(transport.is_drained());
    }

    #[test]
    fn test_close_error_uses_defaults() {
        let mut transport = MockTransport::with_frames([fixtures::error_empty()]);
        let err = ConnectionCloseExchange::default()
            .read_response(&mut transport)
            .unwrap_err();
        assert!(err.is_server_error(2000));
        assert_eq!(err.sql_state(), Some("HY000"));
    }
}
