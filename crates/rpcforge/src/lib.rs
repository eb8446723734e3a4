//! # rpcforge
//!
//! Login handshake and keepalive core for RPC servers.
//!
//! Every connection gets a [`Session`]. Remote `Login` calls establish an
//! identity and a session key through a pluggable [`CredentialVerifier`] and
//! [`KeyDeriver`]; remote `Ping` calls confirm liveness and report server
//! time. The [`Dispatcher`] routes decoded calls to those handlers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpcforge::prelude::*;
//!
//! # async fn run(frame: &[u8]) -> Result<(), RpcForgeError> {
//! init_logging("info")?;
//! let dispatcher = Dispatcher::new(SessionConfig::default(), AcceptAll);
//!
//! // Per accepted connection:
//! let session = Session::with_tracing(ConnectionId::new(1));
//!
//! // Per received frame:
//! let reply = dispatcher.dispatch(&session, frame).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
mod logging;

pub use dispatch::{Dispatcher, LOGIN, PING, UNKNOWN_ACTION};
pub use error::RpcForgeError;
pub use logging::init_logging;

pub use rpcforge_protocol::{
    ApiReply, ApiRequest, Codec, ConnectionId, JsonCodec, LoginOverrides,
    LoginResponse, Parameters, PingResponse, ProtocolError,
};
pub use rpcforge_session::{
    AcceptAll, ApiError, AttributeValue, CredentialVerifier,
    DiagnosticContext, HandshakeHandler, KEY_ATTRIBUTE, KeepaliveHandler,
    KeyDeriver, LogSink, RandomKeyDeriver, SERVER_TIME, Session,
    SessionConfig, TracingSink,
};

/// Everything needed to wire rpcforge into a server.
pub mod prelude {
    pub use crate::{
        AcceptAll, ApiError, ApiReply, ApiRequest, ConnectionId,
        CredentialVerifier, Dispatcher, KeyDeriver, LoginOverrides,
        Parameters, RpcForgeError, Session, SessionConfig, init_logging,
    };
}
