use std::io;
use thiserror::Error;

/// Errors surfaced by the telnet layer
#[derive(Debug, Error)]
pub enum TelnetError {
    /// A command was requested with no command bytes to encode
    #[error("Invalid command: no command bytes given")]
    InvalidCommand,

    /// `dial` was asked for a network type we cannot open
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The connection was never dialed, or has been closed
    #[error("Not connected")]
    NotConnected,

    /// Transport level failure (connect, read, write, close)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<TelnetError> for io::Error {
    fn from(err: TelnetError) -> Self {
        match err {
            TelnetError::Io(err) => err,
            other @ TelnetError::NotConnected => io::Error::new(io::ErrorKind::NotConnected, other),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}

/// Result type alias for telnet operations
pub type TelnetResult<T> = Result<T, TelnetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TelnetError::InvalidCommand.to_string(),
            "Invalid command: no command bytes given"
        );
        assert_eq!(
            TelnetError::UnsupportedNetwork("udp".to_string()).to_string(),
            "Unsupported network: udp"
        );
    }

    #[test]
    fn test_into_io_error_kind() {
        let err: io::Error = TelnetError::NotConnected.into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        let err: io::Error = TelnetError::InvalidCommand.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let err: io::Error = TelnetError::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
