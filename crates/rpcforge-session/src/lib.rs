//! Per-connection session handling for rpcforge.
//!
//! This crate is the handshake/keepalive core of the framework:
//!
//! 1. **Session state** — identity, key material, and a string-keyed
//!    attribute bag owned by one connection ([`Session`]).
//! 2. **Login** — validates input, asks a pluggable [`CredentialVerifier`],
//!    merges its overrides, derives a key through a pluggable
//!    [`KeyDeriver`], and commits the result ([`HandshakeHandler`]).
//! 3. **Heartbeat** — echoes the caller's parameters with the server time
//!    ([`KeepaliveHandler`]).
//! 4. **Diagnostics** — a lazily computed, compute-once log label per
//!    session ([`DiagnosticContext`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← routes "Login" / "Ping" calls to the handlers
//!     ↕
//! Session Layer (this crate)  ← identity, keys, liveness
//!     ↕
//! Protocol Layer (below)  ← ConnectionId, LoginOverrides, PingResponse
//! ```
//!
//! The connection layer owns the [`Session`] values: it creates one per
//! accepted connection and drops it on close. Handlers only ever borrow it.

mod auth;
mod diagnostic;
mod error;
mod handshake;
mod keepalive;
mod key;
mod session;

pub use auth::{AcceptAll, CredentialVerifier};
pub use diagnostic::{DiagnosticContext, LogSink, TracingSink};
pub use error::ApiError;
pub use handshake::HandshakeHandler;
pub use keepalive::{KeepaliveHandler, SERVER_TIME};
pub use key::{KeyDeriver, RandomKeyDeriver};
pub use session::{AttributeValue, KEY_ATTRIBUTE, Session, SessionConfig};
