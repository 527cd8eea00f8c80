//! mudlink: a line-oriented MUD client on top of `telnet-gmcp`.

pub mod config;
pub mod errors;
pub mod logging;
pub mod session;

pub use config::ClientConfig;
pub use errors::{ClientError, ClientResult, ConfigError};
pub use session::{InputAction, MudSession};
