//! The login handshake.
//!
//! ```text
//! login(user, pass)
//!   ├─ user empty? ──→ InvalidArgument(3)          (nothing logged or stored)
//!   ├─ log "login user/pass"
//!   ├─ verifier.verify(user, pass) ──→ Err ──→ returned as is
//!   ├─ apply overrides.user ──→ empty? ──→ InvalidArgument(3)
//!   ├─ overrides.key? ─ no ─→ deriver.derive_key() ──→ Err ──→ returned as is
//!   │                         log "key generated HEX"
//!   └─ commit identity (+ key material) ──→ LoginResponse { Key, .. }
//! ```
//!
//! Nothing is written to the session until every fallible step has
//! succeeded, so a failed login leaves the session exactly as it was.
//!
//! # Clear-text password in logs
//!
//! The login record includes the submitted password. That matches what
//! operators of the framework rely on when auditing logins; deployments that
//! cannot accept it must filter the sink.

use rpcforge_protocol::LoginResponse;
use serde_json::Value;

use crate::{
    ApiError, CredentialVerifier, KeyDeriver, RandomKeyDeriver, Session,
    SessionConfig,
};

/// Handles `Login` calls.
///
/// Generic over the verifier and the key deriver so both are injected at
/// construction and resolved statically.
#[derive(Debug)]
pub struct HandshakeHandler<V, K = RandomKeyDeriver> {
    config: SessionConfig,
    verifier: V,
    deriver: K,
}

impl<V: CredentialVerifier> HandshakeHandler<V, RandomKeyDeriver> {
    /// Creates a handler that derives random keys of `config.key_len` bytes.
    pub fn new(config: SessionConfig, verifier: V) -> Self {
        let config = config.validated();
        let deriver = RandomKeyDeriver::new(config.key_len);
        Self {
            config,
            verifier,
            deriver,
        }
    }
}

impl<V: CredentialVerifier, K: KeyDeriver> HandshakeHandler<V, K> {
    /// Creates a handler with a custom key deriver.
    pub fn with_deriver(config: SessionConfig, verifier: V, deriver: K) -> Self {
        Self {
            config: config.validated(),
            verifier,
            deriver,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn deriver(&self) -> &K {
        &self.deriver
    }

    /// Logs `session` in as `user`.
    ///
    /// On success the session's identity is the (possibly overridden) user
    /// name and the response always carries `Key`: the verifier's key if it
    /// supplied one, otherwise the upper-case hex of freshly derived bytes,
    /// which are also stored as the session's key material.
    ///
    /// # Errors
    /// - [`ApiError::InvalidArgument`] (code 3) if `user` is empty, or the
    ///   verifier rewrites it to an empty name.
    /// - Whatever the verifier or the key deriver returns, unchanged.
    pub async fn login(
        &self,
        session: &Session,
        user: &str,
        pass: &str,
    ) -> Result<LoginResponse, ApiError> {
        if user.is_empty() {
            return Err(ApiError::username_required());
        }

        let name = self.config.display_name.as_str();
        session.write_log(name, format_args!("login {user}/{pass}"));

        let overrides = self
            .verifier
            .verify(user, pass)
            .await?
            .unwrap_or_default();

        // A rewritten password is only echoed back in the response; the
        // session never stores one.
        let user = overrides.user.clone().unwrap_or_else(|| user.to_string());
        if user.is_empty() {
            return Err(ApiError::username_required());
        }

        let (key, derived) = match overrides.key.clone() {
            Some(key) => (key, None),
            None => {
                let bytes = self.deriver.derive_key()?;
                let hex = hex::encode_upper(&bytes);
                session.write_log_as(
                    name,
                    &user,
                    format_args!("key generated {hex}"),
                );
                (Value::String(hex), Some(bytes))
            }
        };

        let key_derived = derived.is_some();
        session.commit_login(user.clone(), derived);
        tracing::debug!(
            conn = %session.id(),
            %user,
            key_derived,
            "session logged in"
        );

        Ok(LoginResponse::from_overrides(overrides, key))
    }
}
