//! Session types: the per-connection state the handlers read and commit to.
//!
//! A session records:
//! - WHO is on the other end (`identity`, set only by a successful login)
//! - WHAT key material was negotiated (`key_material`)
//! - anything else the application wants to remember (`attributes`)
//! - HOW its log lines are labelled (the diagnostic context)

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rpcforge_protocol::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostic::{DiagnosticContext, LogSink, TracingSink};

/// Attribute name under which the raw derived key bytes are stored.
pub const KEY_ATTRIBUTE: &str = "Key";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration shared by the login and heartbeat handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Handler name shown at the start of every log label, e.g. `Api[42]`.
    pub display_name: String,

    /// Length in bytes of keys produced by the default key deriver.
    pub key_len: usize,

    /// Reject `Ping` on sessions that have not logged in.
    ///
    /// Off by default: a heartbeat is a liveness probe and works on
    /// anonymous sessions too.
    pub ping_requires_login: bool,
}

impl SessionConfig {
    /// Default handler display name.
    pub const DEFAULT_DISPLAY_NAME: &'static str = "Api";

    /// Default key length (64 bits).
    pub const DEFAULT_KEY_LEN: usize = 8;

    /// Upper bound on `key_len`.
    pub const MAX_KEY_LEN: usize = 64;

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - `key_len` clamped to `1..=MAX_KEY_LEN`.
    /// - an empty `display_name` falls back to [`Self::DEFAULT_DISPLAY_NAME`].
    pub fn validated(mut self) -> Self {
        if self.key_len == 0 || self.key_len > Self::MAX_KEY_LEN {
            let clamped = self.key_len.clamp(1, Self::MAX_KEY_LEN);
            tracing::warn!(
                key_len = self.key_len,
                clamped,
                "key_len out of range, clamping"
            );
            self.key_len = clamped;
        }
        if self.display_name.is_empty() {
            tracing::warn!("empty display_name, using default");
            self.display_name = Self::DEFAULT_DISPLAY_NAME.to_string();
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: Self::DEFAULT_DISPLAY_NAME.to_string(),
            key_len: Self::DEFAULT_KEY_LEN,
            ping_requires_login: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AttributeValue
// ---------------------------------------------------------------------------

/// A value in the session's attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Raw bytes, e.g. the derived session key.
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
}

impl AttributeValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SessionData {
    identity: Option<String>,
    key_material: Option<Vec<u8>>,
    attributes: HashMap<String, AttributeValue>,
}

/// One connection's session.
///
/// Created by the connection layer when a connection is accepted and
/// dropped when it closes. Handlers borrow it (`&Session`); the connection
/// task usually keeps it in an `Arc` so it can be shared with worker tasks.
///
/// All methods take `&self`. Mutable state sits behind a mutex so a
/// concurrent `Login` and `Ping` on the same session each see a consistent
/// snapshot, though no ordering between them is implied.
pub struct Session {
    id: ConnectionId,
    data: Mutex<SessionData>,
    diagnostics: DiagnosticContext,
}

impl Session {
    /// Creates an empty, anonymous session that logs through `sink`.
    pub fn new(id: ConnectionId, sink: Arc<dyn LogSink>) -> Self {
        Self {
            id,
            data: Mutex::new(SessionData::default()),
            diagnostics: DiagnosticContext::new(sink),
        }
    }

    /// Creates a session that logs through a [`TracingSink`].
    pub fn with_tracing(id: ConnectionId) -> Self {
        Self::new(id, Arc::new(TracingSink::new(id)))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The logged-in user, if any.
    pub fn identity(&self) -> Option<String> {
        self.data().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.data().identity.is_some()
    }

    /// Key bytes produced by the key deriver during login.
    ///
    /// `None` before login, and also after a login whose verifier supplied
    /// its own key.
    pub fn key_material(&self) -> Option<Vec<u8>> {
        self.data().key_material.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.data().attributes.get(name).cloned()
    }

    /// Stores an attribute, returning the previous value. Last write wins.
    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.data().attributes.insert(name.into(), value.into())
    }

    pub fn remove_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.data().attributes.remove(name)
    }

    /// The session's log label, computed on first use.
    pub fn log_label(&self, display_name: &str) -> &str {
        self.diagnostics.label(display_name, self.id)
    }

    pub fn diagnostics(&self) -> &DiagnosticContext {
        &self.diagnostics
    }

    /// Writes a diagnostic record tagged with the current identity.
    pub fn write_log(&self, display_name: &str, message: fmt::Arguments<'_>) {
        let identity = self.identity().unwrap_or_default();
        self.write_log_as(display_name, &identity, message);
    }

    /// Writes a diagnostic record tagged with an explicit identity, for
    /// records emitted while a login is still being assembled.
    pub(crate) fn write_log_as(
        &self,
        display_name: &str,
        identity: &str,
        message: fmt::Arguments<'_>,
    ) {
        self.diagnostics.write(display_name, self.id, identity, message);
    }

    /// Commits the outcome of a login in one step: the identity, and the
    /// key material plus its raw copy under [`KEY_ATTRIBUTE`].
    ///
    /// A login without a derived key clears both, so a key from an earlier
    /// login on the same connection never outlives the new one.
    pub(crate) fn commit_login(&self, identity: String, key: Option<Vec<u8>>) {
        let mut data = self.data();
        data.identity = Some(identity);
        match key {
            Some(key) => {
                data.attributes.insert(
                    KEY_ATTRIBUTE.to_string(),
                    AttributeValue::Bytes(key.clone()),
                );
                data.key_material = Some(key);
            }
            None => {
                data.attributes.remove(KEY_ATTRIBUTE);
                data.key_material = None;
            }
        }
    }

    // A panic while holding the lock cannot leave `SessionData` half
    // written: every mutation above is a plain field store.
    fn data(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("identity", &data.identity)
            .field("has_key", &data.key_material.is_some())
            .field("attributes", &data.attributes.len())
            .field("label", &self.diagnostics.cached_label())
            .finish()
    }
}
