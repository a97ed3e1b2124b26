//! Error types for the protocol layer.
//!
//! A `ProtocolError` always refers to a single frame. The transport treats
//! decode failures as non-fatal: the frame is dropped and logged, the
//! connection stays open.

/// Errors that can occur while encoding or decoding one frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON (de)serialization failed.
    #[error("json codec failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Msgpack decoding failed (truncated or non-msgpack bytes).
    #[cfg(feature = "packed")]
    #[error("msgpack decode failed: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    /// Msgpack encoding failed.
    #[cfg(feature = "packed")]
    #[error("msgpack encode failed: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    /// The frame parsed but its shape matches no known message.
    ///
    /// This covers structural violations that pass deserialization:
    /// an unknown tag, a field out of range, an array of the wrong arity.
    #[error("malformed frame: {0}")]
    Malformed(String),
}
