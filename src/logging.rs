use crate::errors::{ClientError, ConfigError, ClientResult};

use std::io;
use tracing_subscriber::EnvFilter;

/// Filter directive for a configured level raised by `-v` flags
pub fn directive(level: &str, verbosity: u8) -> String {
    match verbosity {
        0 => level.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

pub fn build_filter(level: &str, verbosity: u8) -> Result<EnvFilter, ConfigError> {
    let directive = directive(level, verbosity);
    EnvFilter::try_new(&directive).map_err(|e| {
        ConfigError::InvalidValue("level".to_string(), format!("{directive} ({e})"))
    })
}

/// Install the global subscriber. `RUST_LOG` wins over the config file.
/// Everything goes to stderr so it never mixes with MUD text.
pub fn init(level: &str, verbosity: u8) -> ClientResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(level, verbosity)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| ClientError::Configuration(e.to_string()))
}
