//! # Telnet GMCP Library
//!
//! Client-side Telnet stream interception for talking to MUD servers, as
//! defined in:
//! - RFC 854: Telnet Protocol Specification (https://tools.ietf.org/html/rfc854)
//! - RFC 855: Telnet Option Specifications
//! - GMCP, the Generic MUD Communication Protocol, carried in option 201
//!
//! The raw byte stream from the server is split into:
//! - **clean data**: the text a player reads, returned from `Read`
//! - **control messages**: completed `IAC ...` commands and subnegotiation
//!   payloads, handed to independently running handlers
//!
//! Handlers never slow down the read path. Each one has a bounded inbox;
//! a handler that falls behind is evicted rather than allowed to block.
//!
//! ## Architecture Overview
//!
//! - `protocol`: Symbolic sequence values (IAC, WILL, SB, GMCP, ...)
//! - `command`: Encoding of outbound commands and subnegotiations
//! - `processor`: The byte-at-a-time stream state machine
//! - `handler`: Handler trait, runners and the registry
//! - `connection`: Ties a transport, a processor and a registry together
//! - `gmcp`: Built-in GMCP demultiplexer and greeting handlers

pub mod command;
pub mod connection;
pub mod error;
pub mod gmcp;
pub mod handler;
pub mod processor;
pub mod protocol;

// Re-export main types for convenience
pub use command::{encode_command, encode_gmcp, encode_subnegotiation};
pub use connection::{Connection, ConnectionOptions, ConnectionWriter, Transport};
pub use error::{TelnetError, TelnetResult};
pub use gmcp::{ClientIdentity, GmcpMessage};
pub use handler::{Handler, HandlerId, HandlerRegistry};
pub use processor::{ParserState, StreamProcessor};
pub use protocol::{Seq, has_seq_prefix};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
