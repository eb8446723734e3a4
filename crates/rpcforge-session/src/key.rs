//! Session key derivation.

use rand::Rng;

use crate::{ApiError, SessionConfig};

/// Produces key material for a freshly logged-in session.
///
/// Only called when the credential verifier did not supply a key itself.
/// Implementations are shared across all sessions and may be called from
/// many tasks at once.
pub trait KeyDeriver: Send + Sync + 'static {
    /// Returns new key bytes.
    ///
    /// # Errors
    /// Any error is returned to the caller unchanged and the login is
    /// abandoned before anything is committed to the session.
    fn derive_key(&self) -> Result<Vec<u8>, ApiError>;
}

/// Draws keys from the thread-local CSPRNG (`rand::rng()`).
///
/// Each worker thread owns its own generator, so concurrent sessions never
/// contend on, or share state through, a single RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomKeyDeriver {
    key_len: usize,
}

impl RandomKeyDeriver {
    pub fn new(key_len: usize) -> Self {
        Self { key_len }
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }
}

impl Default for RandomKeyDeriver {
    fn default() -> Self {
        Self::new(SessionConfig::DEFAULT_KEY_LEN)
    }
}

impl KeyDeriver for RandomKeyDeriver {
    fn derive_key(&self) -> Result<Vec<u8>, ApiError> {
        let mut key = vec![0u8; self.key_len];
        rand::rng().fill(key.as_mut_slice());
        Ok(key)
    }
}
