use crate::errors::ConfigError;

use std::fs;
use std::io;
use std::path::Path;
use telnet_gmcp::gmcp::{ClientIdentity, DEFAULT_SUPPORTS};
use telnet_gmcp::handler::{DEFAULT_QUEUE_CAPACITY, SYSTEM_QUEUE_CAPACITY};
use telnet_gmcp::ConnectionOptions;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub client: ClientInfo,
    pub handlers: HandlerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// host:port of the MUD
    pub address: String,
    /// "tcp", "tcp4" or "tcp6"
    pub network: String,
}

/// How we announce ourselves over GMCP
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    pub supports: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub queue_capacity: usize,
    pub system_queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "warn" or "telnet_gmcp=debug"
    pub level: String,
    /// Echo received GMCP messages to the terminal
    pub show_gmcp: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                address: "imperian.com:23".to_string(),
                network: "tcp".to_string(),
            },
            client: ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                supports: DEFAULT_SUPPORTS.iter().map(|s| s.to_string()).collect(),
            },
            handlers: HandlerConfig {
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                system_queue_capacity: SYSTEM_QUEUE_CAPACITY,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                show_gmcp: false,
            },
        }
    }
}

impl ClientConfig {
    /// Load from `path`. A missing file means "use the defaults".
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse_config(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(format!("{}: {}", path.as_ref().display(), e))),
        }
    }

    pub fn parse_config(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Handle sections
            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            // Handle key-value pairs
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = strip_inline_comment(line[eq_pos + 1..].trim()).trim_matches('"');

                match current_section.as_str() {
                    "server" => config.parse_server_config(key, value)?,
                    "client" => config.parse_client_config(key, value)?,
                    "handlers" => config.parse_handler_config(key, value)?,
                    "logging" => config.parse_logging_config(key, value)?,
                    _ => return Err(ConfigError::UnknownSection(current_section.clone())),
                }
            }
        }

        Ok(config)
    }

    fn parse_server_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "address" => {
                if value.is_empty() {
                    return Err(ConfigError::InvalidValue(key.to_string(), value.to_string()));
                }
                self.server.address = value.to_string();
            }
            "network" => match value {
                "tcp" | "tcp4" | "tcp6" => self.server.network = value.to_string(),
                _ => {
                    return Err(ConfigError::InvalidValue(key.to_string(), value.to_string()));
                }
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_client_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "name" => self.client.name = value.to_string(),
            "version" => self.client.version = value.to_string(),
            "supports" => {
                self.client.supports = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_handler_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let capacity: usize = value
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;

        match key {
            "queue_capacity" => self.handlers.queue_capacity = capacity,
            "system_queue_capacity" => self.handlers.system_queue_capacity = capacity,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn parse_logging_config(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "level" => self.logging.level = value.to_string(),
            "show_gmcp" => {
                self.logging.show_gmcp = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), value.to_string()))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Options for the telnet layer derived from this config
    pub fn to_connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            identity: ClientIdentity {
                name: self.client.name.clone(),
                version: self.client.version.clone(),
                supports: self.client.supports.clone(),
            },
            queue_capacity: self.handlers.queue_capacity,
            system_queue_capacity: self.handlers.system_queue_capacity,
        }
    }

    pub fn to_config_file_format(&self) -> String {
        format!(
            r#"# mudlink Configuration File
# Lines starting with # are comments

[server]
# MUD to connect to (host:port); --addr overrides this
address = "{}"
network = "{}"             # "tcp", "tcp4" or "tcp6"

[client]
# Sent to the server in Core.Hello / Core.Supports.Set
name = "{}"
version = "{}"
supports = "{}"

[handlers]
# Pending out-of-band messages a handler may queue before it is dropped
queue_capacity = {}
system_queue_capacity = {}

[logging]
# tracing filter; RUST_LOG takes precedence
level = "{}"
show_gmcp = {}
"#,
            self.server.address,
            self.server.network,
            self.client.name,
            self.client.version,
            self.client.supports.join(", "),
            self.handlers.queue_capacity,
            self.handlers.system_queue_capacity,
            self.logging.level,
            self.logging.show_gmcp,
        )
    }
}

/// Drop a trailing `# comment` that sits outside quotes
fn strip_inline_comment(value: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return value[..i].trim_end(),
            _ => {}
        }
    }
    value
}
