//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or reshaping payloads.
///
/// A `ProtocolError` always means the bytes or the value shape were wrong,
/// never that a login was refused. Refusals live in the session crate's
/// `ApiError`.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Turning a value into bytes (or into a JSON tree) failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a valid envelope: malformed JSON, a missing
    /// `action`, or a field of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded fine but has the wrong shape, e.g. a verifier
    /// result that serializes to an array instead of a flat object.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
