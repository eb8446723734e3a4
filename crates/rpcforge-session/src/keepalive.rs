//! The heartbeat handler.

use chrono::Utc;
use rpcforge_protocol::{Parameters, PingResponse};

use crate::{ApiError, Session, SessionConfig};

/// Response key carrying the server's wall-clock time.
pub const SERVER_TIME: &str = "ServerTime";

/// Handles `Ping` calls: echoes the call's parameter bag and adds
/// `ServerTime`.
#[derive(Debug, Clone)]
pub struct KeepaliveHandler {
    config: SessionConfig,
}

impl KeepaliveHandler {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Answers a heartbeat.
    ///
    /// `params` is the per-call parameter bag supplied by the dispatcher.
    /// It comes back unchanged except that any caller-supplied `ServerTime`
    /// is replaced by the server's own.
    ///
    /// # Errors
    /// [`ApiError::Unauthenticated`] if
    /// [`ping_requires_login`](SessionConfig::ping_requires_login) is set
    /// and the session has no identity.
    pub fn ping(
        &self,
        session: &Session,
        mut params: Parameters,
    ) -> Result<PingResponse, ApiError> {
        session.write_log(&self.config.display_name, format_args!("ping"));

        if self.config.ping_requires_login && !session.is_authenticated() {
            tracing::debug!(conn = %session.id(), "ping rejected, not logged in");
            return Err(ApiError::Unauthenticated);
        }

        params.remove(SERVER_TIME);
        Ok(PingResponse {
            server_time: Utc::now(),
            extra: params,
        })
    }
}
