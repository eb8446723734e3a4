//! Named-call routing for session operations.
//!
//! The connection layer hands every decoded call to a [`Dispatcher`] along
//! with the caller's [`Session`]. The flow per call is:
//!   1. Decode the [`ApiRequest`] envelope
//!   2. Route by `action`: `"Login"` → handshake, `"Ping"` → keepalive
//!   3. Turn the handler result into an [`ApiReply`] (handler errors become
//!      error replies, they never tear the connection down)
//!   4. Encode the reply
//!
//! Calls for one session should be dispatched one at a time; the dispatcher
//! itself adds no per-session ordering.

use rpcforge_protocol::{
    ApiReply, ApiRequest, Codec, JsonCodec, Parameters, ProtocolError,
};
use rpcforge_session::{
    ApiError, CredentialVerifier, HandshakeHandler, KeepaliveHandler,
    KeyDeriver, RandomKeyDeriver, Session, SessionConfig,
};
use serde::Serialize;
use serde_json::Value;

use crate::RpcForgeError;

/// Remote name of the login operation.
pub const LOGIN: &str = "Login";

/// Remote name of the heartbeat operation.
pub const PING: &str = "Ping";

/// Reply code for an `action` no handler is registered for.
pub const UNKNOWN_ACTION: u16 = 404;

/// Routes `Login` and `Ping` calls to their handlers.
///
/// Shared by every connection task, typically behind an `Arc`.
pub struct Dispatcher<V, K = RandomKeyDeriver, C = JsonCodec> {
    handshake: HandshakeHandler<V, K>,
    keepalive: KeepaliveHandler,
    codec: C,
}

impl<V: CredentialVerifier> Dispatcher<V> {
    /// Builds a JSON dispatcher whose handlers share `config`.
    ///
    /// `config` is validated once here; the handlers then receive an
    /// in-range copy, so any clamping warning is logged a single time.
    pub fn new(config: SessionConfig, verifier: V) -> Self {
        let config = config.validated();
        Self {
            handshake: HandshakeHandler::new(config.clone(), verifier),
            keepalive: KeepaliveHandler::new(config),
            codec: JsonCodec,
        }
    }
}

impl<V, K, C> Dispatcher<V, K, C>
where
    V: CredentialVerifier,
    K: KeyDeriver,
    C: Codec,
{
    /// Assembles a dispatcher from individually configured parts.
    pub fn from_parts(
        handshake: HandshakeHandler<V, K>,
        keepalive: KeepaliveHandler,
        codec: C,
    ) -> Self {
        Self {
            handshake,
            keepalive,
            codec,
        }
    }

    pub fn handshake(&self) -> &HandshakeHandler<V, K> {
        &self.handshake
    }

    pub fn keepalive(&self) -> &KeepaliveHandler {
        &self.keepalive
    }

    /// Decodes one call, runs it against `session`, and encodes the reply.
    ///
    /// # Errors
    /// Only plumbing failures: undecodable input or an unencodable reply.
    /// A refused login is an `Ok` carrying an error reply.
    pub async fn dispatch(
        &self,
        session: &Session,
        data: &[u8],
    ) -> Result<Vec<u8>, RpcForgeError> {
        let request: ApiRequest = self.codec.decode(data).inspect_err(|e| {
            tracing::debug!(conn = %session.id(), error = %e, "failed to decode call");
        })?;
        let reply = self.call(session, request).await?;
        Ok(self.codec.encode(&reply)?)
    }

    /// Runs an already decoded call.
    pub async fn call(
        &self,
        session: &Session,
        request: ApiRequest,
    ) -> Result<ApiReply, RpcForgeError> {
        let ApiRequest { action, args } = request;

        // Outer: the handler's verdict. Inner: shaping the payload.
        let outcome: Result<Result<Value, ProtocolError>, ApiError> =
            match action.as_str() {
                LOGIN => {
                    let user = string_arg(&args, "user");
                    let pass = string_arg(&args, "pass");
                    self.handshake
                        .login(session, &user, &pass)
                        .await
                        .map(|response| to_data(&response))
                }
                PING => self
                    .keepalive
                    .ping(session, args)
                    .map(|response| to_data(&response)),
                other => {
                    tracing::debug!(conn = %session.id(), action = other, "unknown action");
                    return Ok(ApiReply::Err {
                        code: UNKNOWN_ACTION,
                        message: format!("unknown action: {other}"),
                    });
                }
            };

        Ok(match outcome {
            Ok(data) => ApiReply::Ok { data: data? },
            Err(e) => {
                tracing::debug!(
                    conn = %session.id(),
                    %action,
                    code = e.code(),
                    error = %e,
                    "call failed"
                );
                ApiReply::Err {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        })
    }
}

/// Reads a string argument; missing or `null` is empty, scalars are
/// stringified.
fn string_arg(args: &Parameters, name: &str) -> String {
    match args.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(ProtocolError::Encode)
}
