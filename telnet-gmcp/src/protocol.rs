//! # Telnet Sequence Vocabulary
//!
//! Symbolic names for the bytes that make up Telnet control sequences, as
//! defined in:
//! - **RFC 854**: Telnet Protocol Specification
//! - **RFC 855**: Telnet Option Specifications
//!
//! plus the MUD-specific option codes (ATCP, GMCP, MCCP) that ride on top.
//!
//! ## Key Concepts
//!
//! ### IAC (Interpret As Command) - Byte 255
//! The IAC byte signals that the following bytes are protocol control rather
//! than data. Inside a subnegotiation a literal 255 is sent as `IAC IAC`.
//!
//! ### Sequence Shapes
//! - Negotiation: `IAC WILL|WONT|DO|DONT <option>`
//! - Subnegotiation: `IAC SB <option> <payload...> IAC SE`
//!
//! ### Total Mapping
//! Unlike an enum, [`Seq`] is a thin wrapper over `u8`: every byte converts
//! into a `Seq` and back without loss. Bytes that have no name are still
//! valid values and can be used as data when building commands.

use std::fmt;

/// A single symbolic Telnet sequence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seq(pub u8);

impl Seq {
    /// NULL, no-op
    pub const NUL: Seq = Seq(0x00);
    /// Echo (RFC 857)
    pub const ECHO: Seq = Seq(0x01);
    /// Suppress Go Ahead (RFC 858)
    pub const SGA: Seq = Seq(0x03);
    /// Status (RFC 859)
    pub const ST: Seq = Seq(0x05);
    /// Timing mark (RFC 860)
    pub const TM: Seq = Seq(0x06);
    /// Bell
    pub const BEL: Seq = Seq(0x07);
    /// Backspace
    pub const BS: Seq = Seq(0x08);
    /// Horizontal tab
    pub const HT: Seq = Seq(0x09);
    /// Line feed
    pub const LF: Seq = Seq(0x0A);
    /// Form feed
    pub const FF: Seq = Seq(0x0C);
    /// Carriage return
    pub const CR: Seq = Seq(0x0D);
    /// Terminal type (RFC 1091)
    pub const TT: Seq = Seq(0x18);
    /// End of record (RFC 885)
    pub const EOR: Seq = Seq(0x19);
    /// Window size, NAWS (RFC 1073)
    pub const WS: Seq = Seq(0x1F);
    /// Terminal speed (RFC 1079)
    pub const TS: Seq = Seq(0x20);
    /// Remote flow control (RFC 1372)
    pub const RFC: Seq = Seq(0x21);
    /// Line mode (RFC 1184)
    pub const LM: Seq = Seq(0x22);
    /// Environment variables (RFC 1408)
    pub const EV: Seq = Seq(0x24);
    /// MUD Client Compression Protocol v1
    pub const CMP1: Seq = Seq(0x55);
    /// MUD Client Compression Protocol v2
    pub const CMP2: Seq = Seq(0x56);
    /// Achaea Telnet Client Protocol
    pub const ATCP: Seq = Seq(0xC8);
    /// Generic MUD Communication Protocol
    pub const GMCP: Seq = Seq(0xC9);
    /// End of subnegotiation
    pub const SE: Seq = Seq(0xF0);
    /// No operation
    pub const NOP: Seq = Seq(0xF1);
    /// Data mark, the data stream portion of a Synch
    pub const DM: Seq = Seq(0xF2);
    /// Break
    pub const BRK: Seq = Seq(0xF3);
    /// Interrupt process
    pub const IP: Seq = Seq(0xF4);
    /// Abort output
    pub const AO: Seq = Seq(0xF5);
    /// Are you there
    pub const AYT: Seq = Seq(0xF6);
    /// Erase character
    pub const EC: Seq = Seq(0xF7);
    /// Erase line
    pub const EL: Seq = Seq(0xF8);
    /// Go ahead
    pub const GA: Seq = Seq(0xF9);
    /// Start of subnegotiation
    pub const SB: Seq = Seq(0xFA);
    /// Sender wants to enable an option
    pub const WILL: Seq = Seq(0xFB);
    /// Sender refuses or wants to disable an option
    pub const WONT: Seq = Seq(0xFC);
    /// Sender asks the receiver to enable an option
    pub const DO: Seq = Seq(0xFD);
    /// Sender asks the receiver to disable an option
    pub const DONT: Seq = Seq(0xFE);
    /// Interpret As Command
    pub const IAC: Seq = Seq(0xFF);

    /// Convert a byte to its sequence value. Total and lossless.
    ///
    /// # Example
    /// ```
    /// use telnet_gmcp::protocol::Seq;
    ///
    /// assert_eq!(Seq::from_byte(0xFF), Seq::IAC);
    /// assert_eq!(Seq::from_byte(0x41).to_byte(), 0x41);
    /// ```
    pub const fn from_byte(byte: u8) -> Self {
        Seq(byte)
    }

    /// Convert the sequence value back to its wire byte
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// True for WILL, WONT, DO and DONT
    pub fn is_negotiation_verb(self) -> bool {
        matches!(self, Seq::WILL | Seq::WONT | Seq::DO | Seq::DONT)
    }

    /// Symbolic name, if this byte has one
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Seq::NUL => "NUL",
            Seq::ECHO => "ECHO",
            Seq::SGA => "SGA",
            Seq::ST => "ST",
            Seq::TM => "TM",
            Seq::BEL => "BEL",
            Seq::BS => "BS",
            Seq::HT => "HT",
            Seq::LF => "LF",
            Seq::FF => "FF",
            Seq::CR => "CR",
            Seq::TT => "TT",
            Seq::EOR => "EOR",
            Seq::WS => "WS",
            Seq::TS => "TS",
            Seq::RFC => "RFC",
            Seq::LM => "LM",
            Seq::EV => "EV",
            Seq::CMP1 => "CMP1",
            Seq::CMP2 => "CMP2",
            Seq::ATCP => "ATCP",
            Seq::GMCP => "GMCP",
            Seq::SE => "SE",
            Seq::NOP => "NOP",
            Seq::DM => "DM",
            Seq::BRK => "BRK",
            Seq::IP => "IP",
            Seq::AO => "AO",
            Seq::AYT => "AYT",
            Seq::EC => "EC",
            Seq::EL => "EL",
            Seq::GA => "GA",
            Seq::SB => "SB",
            Seq::WILL => "WILL",
            Seq::WONT => "WONT",
            Seq::DO => "DO",
            Seq::DONT => "DONT",
            Seq::IAC => "IAC",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u8> for Seq {
    fn from(byte: u8) -> Self {
        Seq(byte)
    }
}

impl From<Seq> for u8 {
    fn from(seq: Seq) -> Self {
        seq.0
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Convert a whole buffer into sequence values
pub fn bytes_to_seq(bytes: &[u8]) -> Vec<Seq> {
    bytes.iter().copied().map(Seq::from_byte).collect()
}

/// True iff `buffer` starts with exactly the bytes of `seq`.
///
/// An empty `seq` is a prefix of every buffer.
///
/// # Example
/// ```
/// use telnet_gmcp::protocol::{has_seq_prefix, Seq};
///
/// let msg = [0xFF, 0xFB, 0xC9];
/// assert!(has_seq_prefix(&msg, &[Seq::IAC, Seq::WILL, Seq::GMCP]));
/// assert!(!has_seq_prefix(&msg, &[Seq::IAC, Seq::DO]));
/// ```
pub fn has_seq_prefix(buffer: &[u8], seq: &[Seq]) -> bool {
    buffer.len() >= seq.len()
        && buffer
            .iter()
            .zip(seq)
            .all(|(byte, expected)| *byte == expected.to_byte())
}

/// Render bytes as space-separated sequence names, e.g. `IAC WILL GMCP`
pub fn seq_to_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| Seq::from_byte(*b).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
