use telnet_gmcp::TelnetError;
use thiserror::Error;

/// Errors raised while loading `mudlink.conf`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown section [{0}]")]
    UnknownSection(String),

    #[error("Unknown key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),

    #[error("Could not read config file: {0}")]
    Io(String),
}

/// Custom error types for the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O related errors (network, terminal, etc.)
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// Telnet layer failure (dial, encoding, ...)
    #[error("Telnet error: {0}")]
    Telnet(TelnetError),

    /// Server went away unexpectedly
    #[error("Server disconnected")]
    Disconnected,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                ClientError::Disconnected
            }
            _ => ClientError::Io(err),
        }
    }
}

impl From<TelnetError> for ClientError {
    fn from(err: TelnetError) -> Self {
        match err {
            TelnetError::Io(err) => err.into(),
            other => ClientError::Telnet(other),
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        ClientError::Configuration(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_reset_maps_to_disconnected() {
        let err: ClientError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, ClientError::Disconnected));

        let err: ClientError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[test]
    fn test_telnet_io_is_unwrapped() {
        let err: ClientError =
            TelnetError::Io(io::Error::new(io::ErrorKind::ConnectionAborted, "gone")).into();
        assert!(matches!(err, ClientError::Disconnected));

        let err: ClientError = TelnetError::InvalidCommand.into();
        assert!(matches!(err, ClientError::Telnet(TelnetError::InvalidCommand)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("queue_capacity".to_string(), "lots".to_string());
        assert_eq!(err.to_string(), "Invalid value for 'queue_capacity': lots");

        let err: ClientError = err.into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for 'queue_capacity': lots"
        );
    }
}
