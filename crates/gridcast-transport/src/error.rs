//! Error types for the transport layer.

/// Errors that can occur in the transport layer.
///
/// The driver retries network failures indefinitely, so most of them
/// surface only in logs. The variants here are the ones a caller can
/// actually observe.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening a connection to the configured URL failed.
    #[error("dial failed: {0}")]
    Dial(#[source] tokio_tungstenite::tungstenite::Error),

    /// A command was submitted while no driver task is running.
    #[error("socket is not connected")]
    NotConnected,
}
