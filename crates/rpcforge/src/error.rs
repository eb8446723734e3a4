//! Unified error type for rpcforge.

use rpcforge_protocol::ProtocolError;
use rpcforge_session::ApiError;

/// Top-level error that wraps the crate-specific errors.
///
/// Note that a refused login does not surface here when going through
/// [`Dispatcher::dispatch`](crate::Dispatcher::dispatch): handler errors are
/// turned into error replies for the caller. This type covers failures of
/// the plumbing itself.
#[derive(Debug, thiserror::Error)]
pub enum RpcForgeError {
    /// Encode/decode failure or a malformed envelope.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A handler error raised outside of reply encoding.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The global tracing subscriber could not be installed.
    #[error("logging init failed: {0}")]
    Logging(String),
}
