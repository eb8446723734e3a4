//! Credential verification hook for the login handshake.
//!
//! rpcforge does not store users or passwords. Applications plug their own
//! check in through [`CredentialVerifier`]; the handshake calls it with the
//! submitted username and password and acts on what it returns:
//!
//! - `Err(..)` — the login fails with exactly that error
//!   (typically [`ApiError::CredentialRejected`]).
//! - `Ok(None)` — accepted as submitted.
//! - `Ok(Some(overrides))` — accepted, with the response (and possibly the
//!   committed identity) rewritten. See [`LoginOverrides`].

use std::future::Future;

use rpcforge_protocol::LoginOverrides;

use crate::ApiError;

/// Validates a username/password pair.
///
/// `Send + Sync + 'static` because one verifier is shared by every
/// connection task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use rpcforge_protocol::LoginOverrides;
/// use rpcforge_session::{ApiError, CredentialVerifier};
///
/// /// Lower-cases user names and rejects one fixed password.
/// struct Normalizing;
///
/// impl CredentialVerifier for Normalizing {
///     async fn verify(
///         &self,
///         user: &str,
///         pass: &str,
///     ) -> Result<Option<LoginOverrides>, ApiError> {
///         if pass == "hunter2" {
///             return Err(ApiError::CredentialRejected("bad password".into()));
///         }
///         Ok(Some(LoginOverrides::new().with_user(user.to_lowercase())))
///     }
/// }
/// ```
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Checks `user` / `pass`.
    ///
    /// To normalize or replace the credentials, return them in the
    /// overrides (`user`, `pass`); the handshake never assumes the
    /// arguments survive unchanged otherwise.
    fn verify(
        &self,
        user: &str,
        pass: &str,
    ) -> impl Future<Output = Result<Option<LoginOverrides>, ApiError>> + Send;
}

/// Accepts every login unchanged. The default verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CredentialVerifier for AcceptAll {
    async fn verify(
        &self,
        _user: &str,
        _pass: &str,
    ) -> Result<Option<LoginOverrides>, ApiError> {
        Ok(None)
    }
}
