// Error handling for the streaming pipeline

use std::fmt;

/// Streaming pipeline error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Output sink or player could not be initialized
    InitializationError(String),

    /// Operation not allowed in the current state
    InvalidState(String),

    /// Network error (open/read of the remote stream)
    NetworkError(String),

    /// Compressed frame could not be decoded
    DecodingError(String),

    /// Output device error
    DeviceError(String),

    /// A bounded wait elapsed
    Timeout(String),

    /// Thread spawn/synchronization error
    ThreadError(String),

    /// IO error
    IoError(String),

    /// The resource was closed while the operation was in flight
    Closed,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AudioError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            AudioError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            AudioError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AudioError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AudioError::DeviceError(msg) => write!(f, "Device error: {}", msg),
            AudioError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AudioError::ThreadError(msg) => write!(f, "Thread error: {}", msg),
            AudioError::IoError(msg) => write!(f, "IO error: {}", msg),
            AudioError::Closed => write!(f, "Closed"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AudioError>;

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                AudioError::Timeout(err.to_string())
            }
            _ => AudioError::IoError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeouts_map_to_timeout() {
        let err: AudioError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, AudioError::Timeout(_)));

        let err: AudioError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err, AudioError::IoError("boom".to_string()));
    }

    #[test]
    fn display_prefixes_kind() {
        let err = AudioError::NetworkError("refused".into());
        assert_eq!(err.to_string(), "Network error: refused");
    }
}
