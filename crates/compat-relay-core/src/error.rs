//! Shared error type across compat-relay crates.

use thiserror::Error;

/// Error classes (stable, used in logs and metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Input stream ended mid-frame or could not be read.
    Framing,
    /// Request payload could not be decoded.
    Deserialization,
    /// Collaborator failed, timed out, or rejected the method.
    Invocation,
    /// Output stream is broken or the frame cannot be encoded.
    Write,
    /// Invalid configuration at startup.
    Config,
    /// Internal invariant broken.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Framing => "FRAMING",
            ErrorClass::Deserialization => "DESERIALIZATION",
            ErrorClass::Invocation => "INVOCATION",
            ErrorClass::Write => "WRITE",
            ErrorClass::Config => "CONFIG",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and runner.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("truncated frame: expected {expected} payload bytes, stream ended after {received}")]
    TruncatedFrame { expected: usize, received: usize },
    #[error("read failed: {0}")]
    Read(std::io::Error),
    #[error("frame too large: {0} bytes does not fit a u32 length prefix")]
    FrameTooLarge(usize),
    #[error("write failed: {0}")]
    Write(std::io::Error),
    #[error("malformed request: {0}")]
    Decode(String),
    #[error("{0}")]
    Invocation(String),
    #[error("invocation timed out after {0} ms")]
    Timeout(u64),
    #[error("unknown method: {0}")]
    UnsupportedMethod(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

/// Implicit conversion is reserved for the read side (codec decoders);
/// writers map explicitly to [`RelayError::Write`].
impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Read(e)
    }
}

impl RelayError {
    /// Map the error to its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::TruncatedFrame { .. } | RelayError::Read(_) => ErrorClass::Framing,
            RelayError::FrameTooLarge(_) | RelayError::Write(_) => ErrorClass::Write,
            RelayError::Decode(_) => ErrorClass::Deserialization,
            RelayError::Invocation(_)
            | RelayError::Timeout(_)
            | RelayError::UnsupportedMethod(_) => ErrorClass::Invocation,
            RelayError::BadConfig(_) => ErrorClass::Config,
            RelayError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether the error must terminate the relay.
    ///
    /// Invocation errors are always absorbed into an error envelope. A decode
    /// error only reaches this point when no test name could be recovered.
    pub fn is_fatal(&self) -> bool {
        self.class() != ErrorClass::Invocation
    }
}
