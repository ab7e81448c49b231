//! Capability negotiation: `CapabilitiesGet` and `CapabilitiesSet`.

use mysqlx_codec::Transport;
use mysqlx_protocol::{Capabilities, CapabilitiesGet, CapabilitiesSet, OkMessage};

use super::{ErrorHook, ExchangeState, Outcome, on_error, send_request, skip_notice};
use crate::continuation::Continuation;
use crate::dispatch::{Handlers, dispatch};
use crate::error::Result;
use crate::result::{CapabilityMap, CapabilityValue, ErrorInfo};

#[derive(Debug, Default)]
struct GetState<'h> {
    outcome: Outcome<'h>,
    capabilities: Option<CapabilityMap>,
}

impl ExchangeState for GetState<'_> {
    fn record_error(&mut self, info: ErrorInfo) {
        self.outcome.record_error(info);
    }
}

fn on_capabilities(state: &mut GetState<'_>, message: Capabilities) -> Continuation {
    let map: CapabilityMap = message
        .capabilities
        .into_iter()
        .map(|c| (c.name, CapabilityValue::from(c.value)))
        .collect();
    tracing::debug!(count = map.len(), "server capabilities");
    state.capabilities = Some(map);
    Continuation::Pass
}

/// Reads the server's capability list.
#[derive(Default)]
pub struct CapabilitiesGetExchange<'h> {
    on_error: Option<&'h mut ErrorHook<'h>>,
}

impl<'h> CapabilitiesGetExchange<'h> {
    /// Send `CON_CAPABILITIES_GET`.
    pub fn send_request<T: Transport>(transport: &mut T) -> Result<()> {
        send_request(transport, &CapabilitiesGet).map(drop)
    }

    /// Bind the caller's error hook.
    #[must_use]
    pub fn init_read(on_error: Option<&'h mut ErrorHook<'h>>) -> Self {
        Self { on_error }
    }

    /// Read `CONN_CAPABILITIES` and materialize it by name.
    pub fn read_response<T: Transport>(self, transport: &mut T) -> Result<CapabilityMap> {
        let mut state = GetState {
            outcome: Outcome::new(self.on_error),
            capabilities: None,
        };
        let signal = dispatch(transport, &get_handlers(), &mut state)?;
        state.outcome.conclude(signal)?;
        // Accepted without a CAPABILITIES frame: nothing to report.
        Ok(state.capabilities.unwrap_or_default())
    }
}

fn get_handlers<'h>() -> Handlers<GetState<'h>> {
    Handlers {
        error: Some(on_error),
        capabilities: Some(on_capabilities),
        notice: Some(skip_notice),
        ..Handlers::new()
    }
}

#[derive(Debug, Default)]
struct SetState<'h> {
    outcome: Outcome<'h>,
    acknowledgement: Option<OkMessage>,
}

impl ExchangeState for SetState<'_> {
    fn record_error(&mut self, info: ErrorInfo) {
        self.outcome.record_error(info);
    }
}

fn on_set_ok(state: &mut SetState<'_>, message: OkMessage) -> Continuation {
    state.acknowledgement = Some(message);
    Continuation::Pass
}

fn set_handlers<'h>() -> Handlers<SetState<'h>> {
    Handlers {
        ok: Some(on_set_ok),
        error: Some(on_error),
        notice: Some(skip_notice),
        ..Handlers::new()
    }
}

/// Changes capabilities.
#[derive(Default)]
pub struct CapabilitiesSetExchange<'h> {
    on_error: Option<&'h mut ErrorHook<'h>>,
}

impl<'h> CapabilitiesSetExchange<'h> {
    /// Send `CON_CAPABILITIES_SET`.
    pub fn send_request<T: Transport>(transport: &mut T, request: &CapabilitiesSet) -> Result<()> {
        send_request(transport, request).map(drop)
    }

    /// Bind the caller's error hook.
    #[must_use]
    pub fn init_read(on_error: Option<&'h mut ErrorHook<'h>>) -> Self {
        Self { on_error }
    }

    /// Read the acknowledgement. Returns the `OK` text, if the server sent
    /// any.
    pub fn read_response<T: Transport>(self, transport: &mut T) -> Result<Option<String>> {
        let mut state = SetState {
            outcome: Outcome::new(self.on_error),
            acknowledgement: None,
        };
        let signal = dispatch(transport, &set_handlers(), &mut state)?;
        state.outcome.conclude(signal)?;
        Ok(state.acknowledgement.and_then(|ok| ok.msg))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::{Any, ClientMessageType, Scalar};
    use mysqlx_testing::{MockTransport, fixtures};

    #[test]
    fn test_get_materializes_capabilities() {
        let mut transport = MockTransport::with_frames([
            fixtures::notice_warning(2, 1, "hello"),
            fixtures::capabilities([
                (
                    "authentication.mechanisms",
                    Any::Array(vec![
                        Any::Scalar(Scalar::string("MYSQL41")),
                        Any::Scalar(Scalar::string("PLAIN")),
                    ]),
                ),
                ("tls", Any::Scalar(Scalar::Bool(false))),
            ]),
        ]);
        CapabilitiesGetExchange::send_request(&mut transport).unwrap();
        let caps = CapabilitiesGetExchange::init_read(None)
            .read_response(&mut transport)
            .unwrap();

        assert_eq!(transport.sent_types(), vec![ClientMessageType::ConCapabilitiesGet as u8]);
        assert_eq!(
            caps["authentication.mechanisms"].as_str_list().unwrap(),
            vec!["MYSQL41", "PLAIN"]
        );
        assert_eq!(caps["tls"].as_scalar(), Some(&Scalar::Bool(false)));
        assert!(transport.is_drained());
    }

    #[test]
    fn test_set_error_reaches_hook() {
        let mut transport = MockTransport::with_frames([fixtures::error(5001, "HY000", "bad cap")]);
        let mut codes = Vec::new();
        let mut hook = |info: &ErrorInfo| codes.push(info.code);
        let request = CapabilitiesSet::from_pairs([("tls", Any::Scalar(Scalar::Bool(true)))]);
        CapabilitiesSetExchange::send_request(&mut transport, &request).unwrap();
        let err = CapabilitiesSetExchange::init_read(Some(&mut hook))
            .read_response(&mut transport)
            .unwrap_err();
        assert!(err.is_server_error(5001));
        assert_eq!(codes, vec![5001]);
    }

    #[test]
    fn test_set_ok() {
        let mut transport = MockTransport::with_frames([fixtures::ok()]);
        let ack = CapabilitiesSetExchange::init_read(None)
            .read_response(&mut transport)
            .unwrap();
        assert_eq!(ack, None);
    }
}
