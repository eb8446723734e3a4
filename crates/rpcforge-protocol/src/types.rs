//! Call envelopes and the structured payloads of `Login` and `Ping`.
//!
//! Remote callers see flat JSON objects. Inside the process those objects
//! are typed: the fields the framework relies on (`user`, `pass`, `Key`,
//! `ServerTime`) are real struct fields, and everything else rides along in
//! an `extra` map that is flattened back out on the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// The per-call parameter bag: a flat, string-keyed JSON object.
pub type Parameters = Map<String, Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identifier of one accepted connection.
///
/// Assigned by the connection layer and used to build the session's log
/// label (`Api[42]`), so `Display` prints just the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Call envelope
// ---------------------------------------------------------------------------

/// A named remote call, as decoded from the transport.
///
/// `args` doubles as the ambient parameter bag: `Login` reads `user` and
/// `pass` out of it, `Ping` echoes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Remote operation name, e.g. `"Login"` or `"Ping"`.
    pub action: String,

    /// Named arguments. Missing on the wire means empty.
    #[serde(default)]
    pub args: Parameters,
}

impl ApiRequest {
    /// Builds a request for `action` with the given arguments.
    pub fn new(action: impl Into<String>, args: Parameters) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }
}

/// The reply to an [`ApiRequest`].
///
/// Serialized as `{"status":"ok","data":{...}}` or
/// `{"status":"err","code":3,"message":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiReply {
    /// The handler succeeded; `data` is its response payload.
    Ok { data: Value },

    /// The handler failed with a caller-facing code and message.
    Err { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Login payloads
// ---------------------------------------------------------------------------

/// What a credential verifier may hand back to rewrite a login.
///
/// - `user` / `pass` replace the submitted credentials before the identity
///   is committed (name normalization, just-in-time registration).
/// - `key` replaces the generated session key entirely; when present no key
///   is derived.
/// - `extra` is copied verbatim into the login response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,

    #[serde(rename = "Key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,

    #[serde(flatten)]
    pub extra: Parameters,
}

impl LoginOverrides {
    /// An empty bag: accept the login as given.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass = Some(pass.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_extra(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Converts any serializable value into an override bag.
    ///
    /// Verifiers often have a richer result type of their own (a user
    /// record, a registration receipt). Anything that serializes to a JSON
    /// object works; `null` (e.g. `None`) yields an empty bag. Scalar
    /// `user` / `pass` values are stringified.
    ///
    /// # Errors
    /// - [`ProtocolError::Encode`] if serialization fails.
    /// - [`ProtocolError::InvalidMessage`] if the value is not an object.
    pub fn from_serializable<T: Serialize + ?Sized>(
        value: &T,
    ) -> Result<Self, ProtocolError> {
        match serde_json::to_value(value).map_err(ProtocolError::Encode)? {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(ProtocolError::InvalidMessage(format!(
                "override bag must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl From<Parameters> for LoginOverrides {
    fn from(mut map: Parameters) -> Self {
        let user = map.remove("user").and_then(stringify);
        let pass = map.remove("pass").and_then(stringify);
        let key = map.remove("Key").filter(|v| !v.is_null());
        Self {
            user,
            pass,
            key,
            extra: map,
        }
    }
}

/// The response to a successful `Login`.
///
/// Unlike [`LoginOverrides`], `key` is not optional: every successful login
/// answers with a key, whether generated or supplied by the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,

    #[serde(rename = "Key")]
    pub key: Value,

    #[serde(flatten)]
    pub extra: Parameters,
}

impl LoginResponse {
    /// Finishes an override bag with the key the caller will receive.
    pub fn from_overrides(overrides: LoginOverrides, key: Value) -> Self {
        Self {
            user: overrides.user,
            pass: overrides.pass,
            key,
            extra: overrides.extra,
        }
    }

    /// The key as a string, when it is one (the generated hex form always is).
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_str()
    }
}

// ---------------------------------------------------------------------------
// Ping payload
// ---------------------------------------------------------------------------

/// The response to `Ping`: the caller's parameter bag plus `ServerTime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Authoritative wall-clock time, RFC 3339 on the wire.
    #[serde(rename = "ServerTime")]
    pub server_time: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: Parameters,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
