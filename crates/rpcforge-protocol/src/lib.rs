//! Wire-level types for rpcforge.
//!
//! This crate defines what a session call looks like once it leaves the
//! transport:
//!
//! - **Types** ([`ApiRequest`], [`ApiReply`], [`LoginOverrides`],
//!   [`LoginResponse`], [`PingResponse`]) — the call envelope and the
//!   structured payloads of the two built-in session operations.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ApiRequest) → Session (Login / Ping handlers)
//! ```
//!
//! Nothing here knows about connections or session state. The session crate
//! consumes these types; the dispatcher in the `rpcforge` crate glues the
//! two together.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ApiReply, ApiRequest, ConnectionId, LoginOverrides, LoginResponse,
    Parameters, PingResponse,
};
