//! # Telnet Stream Processor
//!
//! Splits the raw inbound byte stream into clean application data and
//! completed control messages, one byte at a time.
//!
//! ## State Machine
//! ```text
//! Default ──IAC──▶ InCommand ──WILL/WONT/DO/DONT/IAC──▶ InCommand
//!                     │ ──SB──▶ InSubnegotiation ──type──▶ Capture
//!                     └─other──▶ Default (command dispatched)
//! Capture ──IAC──▶ Escape ──IAC──▶ Capture (literal 255 kept)
//!                     ├──SE──▶ Default (subnegotiation dispatched)
//!                     └─other──▶ Default (subnegotiation dispatched,
//!                                 IAC + byte re-enter from Default)
//! ```
//!
//! Commands are dispatched as the captured bytes (`IAC WILL GMCP`).
//! Subnegotiations are dispatched as `<type> <payload...>` with the `IAC IAC`
//! escapes collapsed. The processor knows nothing about what messages mean.

use crate::handler::HandlerRegistry;
use crate::protocol::{Seq, seq_to_string};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Where completed control messages go
pub trait Dispatch {
    fn dispatch(&mut self, message: &[u8]);
}

impl Dispatch for Arc<HandlerRegistry> {
    fn dispatch(&mut self, message: &[u8]) {
        HandlerRegistry::dispatch(self, message);
    }
}

/// Collects messages in order; handy for inspection and tests
impl Dispatch for Vec<Vec<u8>> {
    fn dispatch(&mut self, message: &[u8]) {
        self.push(message.to_vec());
    }
}

/// Parser state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Plain data, or waiting for IAC
    Default,
    /// Inside `IAC ...`, collecting a command
    InCommand,
    /// Saw `IAC SB`, next byte is the subnegotiation type
    InSubnegotiation,
    /// Collecting subnegotiation payload
    InSubnegotiationCapture,
    /// Saw IAC inside a payload: either an escaped 255 or the end marker
    InSubnegotiationEscape,
}

/// Incremental classifier for an inbound telnet byte stream.
///
/// A subnegotiation is dispatched once, as `<type><payload>`. Its closing
/// `IAC SE` is consumed as the end marker and never reaches handlers as a
/// command of its own.
pub struct StreamProcessor<D: Dispatch = Arc<HandlerRegistry>> {
    sink: D,
    state: ParserState,

    current_sub: u8,
    sub_data: HashMap<u8, Vec<u8>>,
    captured: Vec<u8>,
    clean: VecDeque<u8>,

    /// Bytes waiting to re-enter the machine after a subnegotiation ends early
    pending: VecDeque<u8>,
}

impl<D: Dispatch> StreamProcessor<D> {
    pub fn new(sink: D) -> Self {
        Self {
            sink,
            state: ParserState::Default,
            current_sub: Seq::NUL.to_byte(),
            sub_data: HashMap::new(),
            captured: Vec::new(),
            clean: VecDeque::new(),
            pending: VecDeque::with_capacity(2),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of clean bytes waiting to be read
    pub fn buffered(&self) -> usize {
        self.clean.len()
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Copy up to `buf.len()` clean bytes out, removing them. Returns 0 when
    /// nothing is buffered.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.clean.len());
        for (slot, byte) in buf.iter_mut().zip(self.clean.drain(..n)) {
            *slot = byte;
        }
        n
    }

    /// Feed raw bytes from the wire. Never fails: unexpected sequences are
    /// captured or passed through on a best-effort basis.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.process_byte(byte);
        }
    }

    /// Feed a single byte, then drain anything it queued for re-processing
    pub fn process_byte(&mut self, byte: u8) {
        self.step(byte);
        while let Some(byte) = self.pending.pop_front() {
            self.step(byte);
        }
    }

    fn step(&mut self, byte: u8) {
        let seq = Seq::from_byte(byte);

        match self.state {
            ParserState::Default => {
                if seq == Seq::IAC {
                    self.state = ParserState::InCommand;
                    self.captured.push(byte);
                } else {
                    self.clean.push_back(byte);
                }
            }

            ParserState::InCommand => {
                if seq == Seq::SB {
                    // The block is reported as type + payload, not as a command
                    self.captured.clear();
                    self.state = ParserState::InSubnegotiation;
                } else if seq == Seq::IAC || seq.is_negotiation_verb() {
                    self.captured.push(byte);
                } else {
                    self.captured.push(byte);
                    self.state = ParserState::Default;
                    self.finish_command();
                }
            }

            ParserState::InSubnegotiation => {
                self.current_sub = byte;
                self.sub_data.insert(byte, Vec::new());
                self.state = ParserState::InSubnegotiationCapture;
            }

            ParserState::InSubnegotiationCapture => {
                if seq == Seq::IAC {
                    self.state = ParserState::InSubnegotiationEscape;
                } else {
                    self.capture_sub(byte);
                }
            }

            ParserState::InSubnegotiationEscape => {
                if seq == Seq::IAC {
                    self.capture_sub(byte);
                    self.state = ParserState::InSubnegotiationCapture;
                } else {
                    self.finish_subnegotiation();
                    self.state = ParserState::Default;
                    if seq != Seq::SE {
                        // IAC <not SE> means the end marker never came;
                        // treat these two bytes as freshly arrived
                        self.pending.push_back(Seq::IAC.to_byte());
                        self.pending.push_back(byte);
                    }
                }
            }
        }
    }

    fn capture_sub(&mut self, byte: u8) {
        self.sub_data.entry(self.current_sub).or_default().push(byte);
    }

    fn finish_command(&mut self) {
        let command = std::mem::take(&mut self.captured);
        debug!(command = %seq_to_string(&command), "telnet command complete");
        self.sink.dispatch(&command);
    }

    fn finish_subnegotiation(&mut self) {
        let kind = self.current_sub;
        let payload = self.sub_data.remove(&kind).unwrap_or_default();

        let mut message = Vec::with_capacity(payload.len() + 1);
        message.push(kind);
        message.extend_from_slice(&payload);

        debug!(
            kind = %Seq::from_byte(kind),
            len = payload.len(),
            "subnegotiation complete"
        );
        self.sink.dispatch(&message);
    }
}
