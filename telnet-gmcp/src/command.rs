//! # Outbound Command Encoding
//!
//! Builds the byte sequences we send to the server:
//! - Commands: `IAC <seq...>` (e.g. `IAC DO GMCP`)
//! - Subnegotiations: `IAC SB <option> <payload> IAC SE`, with any literal
//!   255 in the payload doubled so the peer's unescape rule restores it.

use crate::error::{TelnetError, TelnetResult};
use crate::protocol::Seq;

/// Prefix `command` with IAC and turn it into bytes.
///
/// A leading IAC supplied by the caller is not doubled, so
/// `encode_command(&[Seq::WILL, Seq::GMCP])` and
/// `encode_command(&[Seq::IAC, Seq::WILL, Seq::GMCP])` are equivalent.
/// An empty command is a caller error.
///
/// # Example
/// ```
/// use telnet_gmcp::command::encode_command;
/// use telnet_gmcp::protocol::Seq;
///
/// let bytes = encode_command(&[Seq::DO, Seq::GMCP]).unwrap();
/// assert_eq!(bytes, vec![0xFF, 0xFD, 0xC9]);
/// ```
pub fn encode_command(command: &[Seq]) -> TelnetResult<Vec<u8>> {
    let rest = match command {
        [] => return Err(TelnetError::InvalidCommand),
        [Seq::IAC, rest @ ..] => rest,
        rest => rest,
    };

    let mut bytes = Vec::with_capacity(rest.len() + 1);
    bytes.push(Seq::IAC.to_byte());
    bytes.extend(rest.iter().map(|seq| seq.to_byte()));
    Ok(bytes)
}

/// Frame `payload` as `IAC SB <option> <payload> IAC SE`, doubling any IAC
/// inside the payload.
pub fn encode_subnegotiation(option: Seq, payload: &[u8]) -> Vec<u8> {
    let escapes = payload.iter().filter(|b| **b == Seq::IAC.to_byte()).count();
    let mut bytes = Vec::with_capacity(payload.len() + escapes + 5);
    bytes.extend_from_slice(&[Seq::IAC.to_byte(), Seq::SB.to_byte(), option.to_byte()]);
    for &byte in payload {
        bytes.push(byte);
        if byte == Seq::IAC.to_byte() {
            bytes.push(byte);
        }
    }
    bytes.extend_from_slice(&[Seq::IAC.to_byte(), Seq::SE.to_byte()]);
    bytes
}

/// Frame a GMCP message: `<module>` or `<module> <data>`
pub fn encode_gmcp(module: &str, data: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(module.len() + data.len() + 1);
    payload.extend_from_slice(module.as_bytes());
    if !data.is_empty() {
        payload.push(b' ');
        payload.extend_from_slice(data.as_bytes());
    }
    encode_subnegotiation(Seq::GMCP, &payload)
}
