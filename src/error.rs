//! The error taxonomy: protocol violations vs. transport, I/O, and store faults.

use std::fmt;

/// Every fallible operation in this crate returns one of these.
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    /// The server violated the protocol: a bad status code, a missing or unparseable header,
    /// an offset mismatch, or a missing `Location`.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Reading the local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying HTTP transport failed (connection, TLS, timeout, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The handle store failed to persist, read, or delete an entry.
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl UploadError {
    /// Build a [`UploadError::Protocol`] with no HTTP status attached.
    pub fn protocol(message: impl Into<String>) -> Self {
        ProtocolError { message: message.into(), status: None }.into()
    }

    /// Build a [`UploadError::Protocol`] carrying the offending HTTP status.
    pub fn protocol_status(status: u16, message: impl Into<String>) -> Self {
        ProtocolError { message: message.into(), status: Some(status) }.into()
    }

    pub fn transport(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        UploadError::Transport(Box::new(e))
    }

    pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        UploadError::Store(Box::new(e))
    }
}

/// A server-observable contract violation.
///
/// `Display` renders as `"ProtocolException: (<status|null>) <message>"`, the diagnostic shape
/// this protocol's implementations are expected to produce on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub message: String,
    pub status: Option<u16>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "ProtocolException: ({status}) {}", self.message),
            None => write!(f, "ProtocolException: (null) {}", self.message),
        }
    }
}

impl std::error::Error for ProtocolError {}
