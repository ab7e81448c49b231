//! Authentication: `AuthenticateStart` and `AuthenticateContinue`.
//!
//! A start exchange may answer server challenges on its own when the caller
//! binds a continuation hook: every `AUTH_CONTINUE` is handed to the hook,
//! and the bytes it returns go back as an `AuthenticateContinue` before the
//! loop resumes. Without a hook the challenge is returned to the caller,
//! who can answer it with a separate [`AuthContinueExchange`].

use bytes::{BufMut, Bytes, BytesMut};
use mysqlx_codec::Transport;
use mysqlx_protocol::{AuthenticateContinue, AuthenticateOk, AuthenticateStart};
use sha1::{Digest, Sha1};

use super::{ErrorHook, ExchangeState, Outcome, on_error, send_request, skip_notice};
use crate::continuation::Continuation;
use crate::dispatch::{Handlers, dispatch};
use crate::error::{Error, Result};
use crate::result::ErrorInfo;

/// Length of a `MYSQL41` scramble and of the salt it is built from.
pub const SCRAMBLE_LENGTH: usize = 20;

/// Continuation hook: receives the server challenge and returns the signal
/// for the loop plus the response to send, if any.
pub type AuthContinueHook<'h> = dyn FnMut(&[u8]) -> (Continuation, Option<Bytes>) + 'h;

/// What the server answered last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// A challenge that still needs an answer.
    Continue(Bytes),
    /// Authentication succeeded, with optional final mechanism data.
    Ok(Option<Bytes>),
}

/// `SHA1(password) XOR SHA1(salt ++ SHA1(SHA1(password)))`.
#[must_use]
pub fn mysql41_scramble(password: &[u8], salt: &[u8]) -> [u8; SCRAMBLE_LENGTH] {
    let salt = &salt[..salt.len().min(SCRAMBLE_LENGTH)];
    let stage1 = Sha1::digest(password);
    let stage2 = Sha1::digest(stage1);
    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stage2);
    let mask = hasher.finalize();

    let mut out = [0u8; SCRAMBLE_LENGTH];
    for (o, (a, b)) in out.iter_mut().zip(stage1.iter().zip(mask.iter())) {
        *o = a ^ b;
    }
    out
}

/// Answer to a `MYSQL41` challenge: `schema\0user\0*<hex scramble>\0`.
///
/// The scramble is left out when the password is empty.
#[must_use]
pub fn mysql41_auth_data(schema: &str, user: &str, password: &str, salt: &[u8]) -> Bytes {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut buf = BytesMut::with_capacity(schema.len() + user.len() + SCRAMBLE_LENGTH * 2 + 4);
    buf.put_slice(schema.as_bytes());
    buf.put_u8(0);
    buf.put_slice(user.as_bytes());
    buf.put_u8(0);
    if !password.is_empty() {
        buf.put_u8(b'*');
        for byte in mysql41_scramble(password.as_bytes(), salt) {
            buf.put_u8(HEX[usize::from(byte >> 4)]);
            buf.put_u8(HEX[usize::from(byte & 0x0f)]);
        }
    }
    buf.put_u8(0);
    buf.freeze()
}

/// `PLAIN` initial data: `schema\0user\0password`.
#[must_use]
pub fn plain_auth_data(schema: &str, user: &str, password: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(schema.len() + user.len() + password.len() + 2);
    buf.put_slice(schema.as_bytes());
    buf.put_u8(0);
    buf.put_slice(user.as_bytes());
    buf.put_u8(0);
    buf.put_slice(password.as_bytes());
    buf.freeze()
}

#[derive(Default)]
struct AuthState<'h> {
    outcome: Outcome<'h>,
    on_continue: Option<&'h mut AuthContinueHook<'h>>,
    // Hook answer waiting to be sent, with the signal to apply afterwards.
    pending: Option<(Continuation, Bytes)>,
    response: Option<AuthResponse>,
}

impl ExchangeState for AuthState<'_> {
    fn record_error(&mut self, info: ErrorInfo) {
        self.outcome.record_error(info);
    }
}

fn start_on_auth_continue(state: &mut AuthState<'_>, message: AuthenticateContinue) -> Continuation {
    tracing::debug!(length = message.auth_data.len(), "authentication challenge");
    let Some(hook) = state.on_continue.as_deref_mut() else {
        state.response = Some(AuthResponse::Continue(message.auth_data));
        return Continuation::Pass;
    };
    let (signal, answer) = hook(&message.auth_data);
    state.response = Some(AuthResponse::Continue(message.auth_data));
    match answer {
        Some(data) => {
            // Leave the loop so the answer can go out on the transport.
            state.pending = Some((signal, data));
            Continuation::Pass
        }
        None => signal,
    }
}

fn continue_on_auth_continue(state: &mut AuthState<'_>, message: AuthenticateContinue) -> Continuation {
    state.response = Some(AuthResponse::Continue(message.auth_data));
    Continuation::Pass
}

fn on_auth_ok(state: &mut AuthState<'_>, message: AuthenticateOk) -> Continuation {
    tracing::debug!("authentication succeeded");
    state.response = Some(AuthResponse::Ok(message.auth_data));
    Continuation::Pass
}

fn start_handlers<'h>() -> Handlers<AuthState<'h>> {
    Handlers {
        error: Some(on_error),
        auth_continue: Some(start_on_auth_continue),
        auth_ok: Some(on_auth_ok),
        notice: Some(skip_notice),
        ..Handlers::new()
    }
}

fn continue_handlers<'h>() -> Handlers<AuthState<'h>> {
    Handlers {
        error: Some(on_error),
        auth_continue: Some(continue_on_auth_continue),
        auth_ok: Some(on_auth_ok),
        notice: Some(skip_notice),
        ..Handlers::new()
    }
}

fn finish(mut state: AuthState<'_>, signal: Continuation) -> Result<AuthResponse> {
    state.outcome.conclude(signal)?;
    // A bare PASS without either message means the exchange ended early.
    state.response.ok_or_else(|| {
        Error::Authentication("server ended the exchange without a response".into())
    })
}

/// First authentication step.
#[derive(Default)]
pub struct AuthStartExchange<'h> {
    on_error: Option<&'h mut ErrorHook<'h>>,
    on_continue: Option<&'h mut AuthContinueHook<'h>>,
}

impl<'h> AuthStartExchange<'h> {
    /// Send `SESS_AUTHENTICATE_START`.
    pub fn send_request<T: Transport>(
        transport: &mut T,
        mechanism: &str,
        auth_data: impl Into<Bytes>,
    ) -> Result<()> {
        tracing::debug!(mechanism, "starting authentication");
        send_request(transport, &AuthenticateStart::new(mechanism, auth_data)).map(drop)
    }

    /// Bind the caller's hooks.
    #[must_use]
    pub fn init_read(
        on_error: Option<&'h mut ErrorHook<'h>>,
        on_continue: Option<&'h mut AuthContinueHook<'h>>,
    ) -> Self {
        Self {
            on_error,
            on_continue,
        }
    }

    /// Read until the server accepts, fails, or sends a challenge nobody
    /// answers.
    pub fn read_response<T: Transport>(self, transport: &mut T) -> Result<AuthResponse> {
        let mut state = AuthState {
            outcome: Outcome::new(self.on_error),
            on_continue: self.on_continue,
            pending: None,
            response: None,
        };
        let handlers = start_handlers();
        let signal = loop {
            let signal = dispatch(transport, &handlers, &mut state)?;
            let Some((after, auth_data)) = state.pending.take() else {
                break signal;
            };
            if let Err(e) = send_request(transport, &AuthenticateContinue { auth_data }) {
                break state.outcome.fail(e);
            }
            if after.is_terminal() {
                break after;
            }
        };
        finish(state, signal)
    }
}

/// Answer to a challenge.
#[derive(Default)]
pub struct AuthContinueExchange<'h> {
    on_error: Option<&'h mut ErrorHook<'h>>,
}

impl<'h> AuthContinueExchange<'h> {
    /// Send the `MYSQL41` answer built from the credentials and the salt.
    pub fn send_request<T: Transport>(
        transport: &mut T,
        schema: &str,
        user: &str,
        password: &str,
        salt: &[u8],
    ) -> Result<()> {
        let auth_data = mysql41_auth_data(schema, user, password, salt);
        send_request(transport, &AuthenticateContinue { auth_data }).map(drop)
    }

    /// Bind the caller's error hook.
    #[must_use]
    pub fn init_read(on_error: Option<&'h mut ErrorHook<'h>>) -> Self {
        Self { on_error }
    }

    /// Read the server's verdict.
    pub fn read_response<T: Transport>(self, transport: &mut T) -> Result<AuthResponse> {
        let mut state = AuthState {
            outcome: Outcome::new(self.on_error),
            ..AuthState::default()
        };
        let signal = dispatch(transport, &continue_handlers(), &mut state)?;
        finish(state, signal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysqlx_protocol::ClientMessageType;
    use mysqlx_testing::{MockTransport, SendFailure, fixtures};

    const SALT: &[u8] = b"abcdefghijklmnopqrst";

    #[test]
    fn test_scramble_vector() {
        let data = mysql41_auth_data("shop", "app", "secret", SALT);
        assert_eq!(
            &data[..],
            &b"shop\0app\0*8817c50fa779daef010ee7577825b0847df9842e\0"[..]
        );
    }

    #[test]
    fn test_scramble_verifies_like_the_server() {
        let password = b"pa55word";
        let scramble = mysql41_scramble(password, SALT);
        let stage2 = Sha1::digest(Sha1::digest(password));
        let mut hasher = Sha1::new();
        hasher.update(SALT);
        hasher.update(stage2);
        let mask = hasher.finalize();
        let stage1: Vec<u8> = scramble.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect();
        assert_eq!(Sha1::digest(&stage1), stage2);
    }

    #[test]
    fn test_empty_password_and_long_salt() {
        assert_eq!(&mysql41_auth_data("", "root", "", SALT)[..], b"\0root\0\0");
        let mut padded = SALT.to_vec();
        padded.push(0);
        assert_eq!(mysql41_scramble(b"x", &padded), mysql41_scramble(b"x", SALT));
        assert_eq!(&plain_auth_data("s", "u", "p")[..], b"s\0u\0p");
    }

    #[test]
    fn test_start_hook_answers_challenge() {
        let mut transport = MockTransport::with_frames([
            fixtures::auth_continue(SALT.to_vec()),
            fixtures::notice_warning(2, 1, "ignored"),
            fixtures::auth_ok(),
        ]);
        let mut challenges = Vec::new();
        let mut hook = |challenge: &[u8]| {
            challenges.push(challenge.to_vec());
            (Continuation::Again, Some(mysql41_auth_data("", "root", "pw", challenge)))
        };
        AuthStartExchange::send_request(&mut transport, "MYSQL41", Bytes::new()).unwrap();
        let response = AuthStartExchange::init_read(None, Some(&mut hook))
            .read_response(&mut transport)
            .unwrap();

        assert_eq!(response, AuthResponse::Ok(None));
        assert_eq!(challenges, vec![SALT.to_vec()]);
        assert_eq!(
            transport.sent_types(),
            vec![
                ClientMessageType::SessAuthenticateStart as u8,
                ClientMessageType::SessAuthenticateContinue as u8,
            ]
        );
        let answer: AuthenticateContinue = transport.sent_message(1).unwrap();
        assert_eq!(answer.auth_data, mysql41_auth_data("", "root", "pw", SALT));
    }

    #[test]
    fn test_start_without_hook_returns_challenge() {
        let mut transport = MockTransport::with_frames([fixtures::auth_continue(SALT.to_vec())]);
        let response = AuthStartExchange::init_read(None, None)
            .read_response(&mut transport)
            .unwrap();
        assert_eq!(response, AuthResponse::Continue(Bytes::from_static(SALT)));
    }

    #[test]
    fn test_failed_answer_send_fails_exchange() {
        let mut transport = MockTransport::builder()
            .frame(fixtures::auth_continue(SALT.to_vec()))
            .fail_sends(SendFailure::OutOfMemory)
            .build();
        let mut hook = |_: &[u8]| (Continuation::Again, Some(Bytes::from_static(b"x")));
        let err = AuthStartExchange::init_read(None, Some(&mut hook))
            .read_response(&mut transport)
            .unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { .. }));
    }

    #[test]
    fn test_continue_rejected() {
        let mut transport =
            MockTransport::with_frames([fixtures::error(1045, "28000", "Access denied")]);
        AuthContinueExchange::send_request(&mut transport, "", "root", "wrong", SALT).unwrap();
        let err = AuthContinueExchange::init_read(None)
            .read_response(&mut transport)
            .unwrap_err();
        assert!(err.is_server_error(1045));
        assert_eq!(err.sql_state(), Some("28000"));
    }
}
