//! # GMCP System Handlers
//!
//! Two handlers are started on every connection:
//!
//! - [`GmcpDemux`] picks GMCP subnegotiations out of the handler stream,
//!   splits them into module name and data, and forwards them as
//!   [`GmcpMessage`]s.
//! - [`GreetingPolicy`] answers the server's `IAC WILL GMCP` with
//!   `IAC DO GMCP`, then introduces the client with `Core.Hello` and
//!   `Core.Supports.Set`.
//!
//! GMCP payloads are `<Package.Module> <JSON data>`; the JSON is carried
//! through as opaque bytes.

use crate::connection::ConnectionWriter;
use crate::handler::Handler;
use crate::protocol::{Seq, has_seq_prefix};
use crate::TelnetResult;
use jiff::Timestamp;
use serde::Serialize;
use std::sync::mpsc::{SyncSender, TrySendError};
use tracing::{debug, info, warn};

/// Modules advertised in `Core.Supports.Set` unless configured otherwise
pub const DEFAULT_SUPPORTS: &[&str] = &[
    "Char 1",
    "Char.Skills 1",
    "Char.Items 1",
    "Comm.Channel 1",
    "Room 1",
    "IRE.Rift 1",
];

/// One inbound GMCP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GmcpMessage {
    /// Package and module, e.g. `Char.Vitals`
    pub module: String,
    /// Everything after the first space, unparsed
    pub data: Vec<u8>,
    pub received_at: Timestamp,
}

impl GmcpMessage {
    /// Split a raw GMCP payload at its first space
    pub fn parse(payload: &[u8]) -> Self {
        let (module, data) = match payload.iter().position(|b| *b == b' ') {
            Some(space) => (&payload[..space], &payload[space + 1..]),
            None => (payload, &[][..]),
        };

        Self {
            module: String::from_utf8_lossy(module).into_owned(),
            data: data.to_vec(),
            received_at: Timestamp::now(),
        }
    }

    /// The data as text, with invalid UTF-8 replaced
    pub fn data_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Routes subnegotiations by type; forwards GMCP as [`GmcpMessage`].
///
/// The outlet is bounded. When nobody drains it, new messages are dropped
/// rather than piling up for the life of the connection.
pub struct GmcpDemux {
    messages: SyncSender<GmcpMessage>,
}

impl GmcpDemux {
    pub fn new(messages: SyncSender<GmcpMessage>) -> Self {
        Self { messages }
    }
}

impl Handler for GmcpDemux {
    fn handle(&mut self, message: &[u8]) {
        let Some((&kind, payload)) = message.split_first() else {
            return;
        };

        // Commands (IAC ...) and other subnegotiation types are not ours
        if Seq::from_byte(kind) != Seq::GMCP {
            return;
        }

        let gmcp = GmcpMessage::parse(payload);
        debug!(module = %gmcp.module, len = gmcp.data.len(), "GMCP received");
        match self.messages.try_send(gmcp) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(module = %dropped.module, "GMCP outlet full, message dropped");
            }
            // Nobody listening is fine
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Who we say we are during the GMCP greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
    pub supports: Vec<String>,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: crate::VERSION.to_string(),
            supports: DEFAULT_SUPPORTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Serialize)]
struct Hello<'a> {
    client: &'a str,
    version: &'a str,
}

impl ClientIdentity {
    /// JSON body for `Core.Hello`
    pub fn hello_json(&self) -> String {
        let hello = Hello {
            client: &self.name,
            version: &self.version,
        };
        // Two string fields cannot fail to serialize
        serde_json::to_string(&hello).unwrap_or_default()
    }

    /// JSON body for `Core.Supports.Set`
    pub fn supports_json(&self) -> String {
        serde_json::to_string(&self.supports).unwrap_or_default()
    }
}

/// Accepts GMCP when the server offers it and sends our greeting
pub struct GreetingPolicy {
    writer: ConnectionWriter,
    identity: ClientIdentity,
}

impl GreetingPolicy {
    pub fn new(writer: ConnectionWriter, identity: ClientIdentity) -> Self {
        Self { writer, identity }
    }

    fn greet(&self) -> TelnetResult<()> {
        self.writer.send_command(&[Seq::DO, Seq::GMCP])?;
        self.writer
            .send_gmcp("Core.Hello", &self.identity.hello_json())?;
        self.writer
            .send_gmcp("Core.Supports.Set", &self.identity.supports_json())?;
        Ok(())
    }
}

impl Handler for GreetingPolicy {
    fn handle(&mut self, message: &[u8]) {
        if !has_seq_prefix(message, &[Seq::IAC, Seq::WILL, Seq::GMCP]) {
            return;
        }

        info!(client = %self.identity.name, "server offered GMCP, accepting");
        if let Err(e) = self.greet() {
            warn!(error = %e, "failed to send GMCP greeting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn test_parse_module_and_data() {
        let msg = GmcpMessage::parse(b"Char.Vitals {\"hp\": 100}");
        assert_eq!(msg.module, "Char.Vitals");
        assert_eq!(msg.data, b"{\"hp\": 100}".to_vec());
        assert_eq!(msg.data_lossy(), "{\"hp\": 100}");
    }

    #[test]
    fn test_parse_module_only() {
        let msg = GmcpMessage::parse(b"Core.Ping");
        assert_eq!(msg.module, "Core.Ping");
        assert!(msg.data.is_empty());
    }

    #[test]
    fn test_parse_splits_at_first_space_only() {
        let msg = GmcpMessage::parse(b"Comm.Channel.Text a b c");
        assert_eq!(msg.module, "Comm.Channel.Text");
        assert_eq!(msg.data, b"a b c".to_vec());
    }

    #[test]
    fn test_demux_forwards_gmcp_only() {
        let (tx, rx) = sync_channel(4);
        let mut demux = GmcpDemux::new(tx);

        demux.handle(&[0xFF, 0xFB, 0xC9]); // IAC WILL GMCP, a command
        demux.handle(&[0x18, 0x00]); // terminal type subnegotiation
        demux.handle(&[]);
        demux.handle(b"\xC9Room.Info {}");

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.module, "Room.Info");
        assert_eq!(msg.data, b"{}".to_vec());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_demux_survives_dropped_receiver() {
        let (tx, rx) = sync_channel(4);
        drop(rx);
        let mut demux = GmcpDemux::new(tx);
        demux.handle(b"\xC9Core.Goodbye");
    }

    #[test]
    fn test_demux_drops_when_outlet_full() {
        let (tx, rx) = sync_channel(2);
        let mut demux = GmcpDemux::new(tx);
        for i in 0..5 {
            let mut frame = vec![0xC9u8];
            frame.extend_from_slice(format!("Char.Vitals {i}").as_bytes());
            demux.handle(&frame);
        }

        let kept: Vec<GmcpMessage> = rx.try_iter().collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].data_lossy(), "0");
        assert_eq!(kept[1].data_lossy(), "1");
    }

    #[test]
    fn test_hello_json() {
        let identity = ClientIdentity {
            name: "mudlink".to_string(),
            version: "0.0.2".to_string(),
            supports: vec!["Char 1".to_string(), "Room 1".to_string()],
        };
        assert_eq!(
            identity.hello_json(),
            r#"{"client":"mudlink","version":"0.0.2"}"#
        );
        assert_eq!(identity.supports_json(), r#"["Char 1","Room 1"]"#);
    }

    #[test]
    fn test_default_identity() {
        let identity = ClientIdentity::default();
        assert_eq!(identity.name, "telnet-gmcp");
        assert_eq!(identity.supports.len(), DEFAULT_SUPPORTS.len());
    }

    #[test]
    fn test_greeting_ignores_other_messages_when_disconnected() {
        // No transport: any attempt to greet would log a failure, not panic
        let mut policy = GreetingPolicy::new(ConnectionWriter::default(), ClientIdentity::default());
        policy.handle(&[0xFF, 0xFD, 0xC9]);
        policy.handle(&[0xFF, 0xFB, 0xC9]);
    }
}
