//! Error types for the session layer.

use rpcforge_protocol::ProtocolError;

/// Errors a session handler reports back to the remote caller.
///
/// Every variant carries a stable numeric [`code`](ApiError::code) that the
/// dispatcher puts on the wire next to the message. The core never retries
/// any of them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The call itself was malformed, e.g. a login without a username.
    #[error("{message}")]
    InvalidArgument { code: u16, message: String },

    /// The [`CredentialVerifier`](crate::CredentialVerifier) refused the
    /// login. The message is the verifier's own and reaches the caller as is.
    #[error("{0}")]
    CredentialRejected(String),

    /// The operation needs a logged-in session and this one is not.
    #[error("login required")]
    Unauthenticated,

    /// Key derivation, payload shaping, or another internal step failed.
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl ApiError {
    /// Code for a login attempted without a username.
    pub const USERNAME_REQUIRED: u16 = 3;

    /// The caller-facing numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidArgument { code, .. } => *code,
            Self::CredentialRejected(_) | Self::Unauthenticated => 401,
            Self::InternalFailure(_) => 500,
        }
    }

    pub(crate) fn username_required() -> Self {
        Self::InvalidArgument {
            code: Self::USERNAME_REQUIRED,
            message: "username required".into(),
        }
    }
}

/// Lets verifiers use `LoginOverrides::from_serializable(..)?` directly.
impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        Self::InternalFailure(err.to_string())
    }
}
