//! # Connection - Telnet-aware Client Stream
//!
//! `Connection` owns the transport, one [`StreamProcessor`] and the
//! [`HandlerRegistry`]. Reads return only clean application data; every
//! completed control message is fanned out to the registered handlers.
//!
//! ```rust,no_run
//! use std::io::{Read, Write};
//! use telnet_gmcp::Connection;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = Connection::new();
//!     conn.dial("tcp", "imperian.com:23")?;
//!
//!     conn.write_all(b"look\n")?;
//!
//!     let mut buffer = [0; 1024];
//!     let n = conn.read(&mut buffer)?;
//!     // buffer[..n] holds text only, no IAC sequences
//!     Ok(())
//! }
//! ```
//!
//! ## Write Side
//! The write half lives behind a [`ConnectionWriter`], a cheap clonable
//! handle. The built-in negotiation handler uses one to answer the server
//! from its own thread, and callers can take one to write from elsewhere.

use crate::command::{encode_command, encode_gmcp, encode_subnegotiation};
use crate::error::{TelnetError, TelnetResult};
use crate::gmcp::{ClientIdentity, GmcpDemux, GmcpMessage, GreetingPolicy};
use crate::handler::{
    DEFAULT_QUEUE_CAPACITY, Handler, HandlerId, HandlerRegistry, SYSTEM_QUEUE_CAPACITY,
};
use crate::processor::StreamProcessor;
use crate::protocol::Seq;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Size of each chunk pulled from the transport
const READ_CHUNK: usize = 4096;

/// A byte stream the connection can run over
pub trait Transport: Read + Write + Send + 'static {
    /// A second handle onto the same stream, used for the write side
    fn try_clone_transport(&self) -> io::Result<Box<dyn Transport>>;

    /// Tear the stream down in both directions
    fn close(&self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn try_clone_transport(&self) -> io::Result<Box<dyn Transport>> {
        Ok(Box::new(self.try_clone()?))
    }

    fn close(&self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // Already torn down by the peer
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Tunables for a connection
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// How we introduce ourselves in `Core.Hello` / `Core.Supports.Set`
    pub identity: ClientIdentity,
    /// Inbox capacity for handlers added with `register_handler`
    pub queue_capacity: usize,
    /// Inbox capacity for the built-in handlers
    pub system_queue_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            identity: ClientIdentity::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            system_queue_capacity: SYSTEM_QUEUE_CAPACITY,
        }
    }
}

/// Clonable handle onto the write half of a connection
#[derive(Clone, Default)]
pub struct ConnectionWriter {
    inner: Arc<Mutex<Option<Box<dyn Transport>>>>,
}

impl ConnectionWriter {
    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Transport>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, transport: Box<dyn Transport>) {
        *self.lock() = Some(transport);
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Write raw bytes, unmodified
    pub fn write_all(&self, bytes: &[u8]) -> TelnetResult<()> {
        let mut guard = self.lock();
        let transport = guard.as_mut().ok_or(TelnetError::NotConnected)?;
        transport.write_all(bytes)?;
        transport.flush()?;
        Ok(())
    }

    /// Encode and send `IAC <command...>`
    pub fn send_command(&self, command: &[Seq]) -> TelnetResult<()> {
        let bytes = encode_command(command)?;
        self.write_all(&bytes)
    }

    /// Send `IAC SB <option> <payload> IAC SE`
    pub fn send_subnegotiation(&self, option: Seq, payload: &[u8]) -> TelnetResult<()> {
        self.write_all(&encode_subnegotiation(option, payload))
    }

    /// Send a GMCP message, e.g. `send_gmcp("Core.Ping", "")`
    pub fn send_gmcp(&self, module: &str, data: &str) -> TelnetResult<()> {
        debug!(module, len = data.len(), "sending GMCP");
        self.write_all(&encode_gmcp(module, data))
    }

    /// Close the transport. Any blocked reader sees end-of-stream.
    pub fn close(&self) -> TelnetResult<()> {
        if let Some(transport) = self.lock().take() {
            transport.close()?;
        }
        Ok(())
    }
}

/// A telnet client connection with out-of-band handler dispatch
pub struct Connection {
    reader: Option<Box<dyn Transport>>,
    writer: ConnectionWriter,
    processor: StreamProcessor,
    registry: Arc<HandlerRegistry>,
    options: ConnectionOptions,
    gmcp_messages: Option<Receiver<GmcpMessage>>,
    /// Built-in handlers started by the current attach
    system_handlers: Vec<HandlerId>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    pub fn new() -> Self {
        Self::with_options(ConnectionOptions::default())
    }

    pub fn with_options(options: ConnectionOptions) -> Self {
        let registry = Arc::new(HandlerRegistry::new(options.queue_capacity));
        Self {
            reader: None,
            writer: ConnectionWriter::default(),
            processor: StreamProcessor::new(Arc::clone(&registry)),
            registry,
            options,
            gmcp_messages: None,
            system_handlers: Vec::new(),
        }
    }

    /// Connect to `address` over `network` ("tcp", "tcp4" or "tcp6") and
    /// start the built-in handlers.
    pub fn dial(&mut self, network: &str, address: &str) -> TelnetResult<()> {
        let stream = match network {
            "tcp" => TcpStream::connect(address)?,
            "tcp4" | "tcp6" => {
                let want_v4 = network == "tcp4";
                let addrs: Vec<_> = std::net::ToSocketAddrs::to_socket_addrs(address)?
                    .filter(|addr| addr.is_ipv4() == want_v4)
                    .collect();
                if addrs.is_empty() {
                    return Err(TelnetError::Io(io::Error::new(
                        io::ErrorKind::AddrNotAvailable,
                        format!("no {} address for {}", network, address),
                    )));
                }
                TcpStream::connect(&addrs[..])?
            }
            other => return Err(TelnetError::UnsupportedNetwork(other.to_string())),
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle");
        }
        info!(network, address, "connected");
        self.attach(stream)
    }

    /// Run over an already-open transport and start the built-in handlers.
    ///
    /// Attaching again replaces the previous transport: its built-in
    /// handlers, GMCP outlet and any half-parsed sequence are discarded.
    /// Handlers added with `register_handler` stay registered.
    pub fn attach<T: Transport>(&mut self, transport: T) -> TelnetResult<()> {
        let write_half = transport.try_clone_transport()?;
        self.detach()?;

        self.writer.set(write_half);
        self.reader = Some(Box::new(transport));
        self.processor = StreamProcessor::new(Arc::clone(&self.registry));
        self.start_system_handlers()
    }

    fn start_system_handlers(&mut self) -> TelnetResult<()> {
        let capacity = self.options.system_queue_capacity;
        let (tx, rx) = mpsc::sync_channel(capacity);
        self.gmcp_messages = Some(rx);

        let demux = self
            .registry
            .register_with_capacity(GmcpDemux::new(tx), capacity)?;
        self.system_handlers.push(demux);
        let greeting = self.registry.register_with_capacity(
            GreetingPolicy::new(self.writer.clone(), self.options.identity.clone()),
            capacity,
        )?;
        self.system_handlers.push(greeting);
        Ok(())
    }

    /// Drop the transport and everything started for it
    fn detach(&mut self) -> TelnetResult<()> {
        for id in self.system_handlers.drain(..) {
            self.registry.unregister(id);
        }
        self.gmcp_messages = None;
        self.reader = None;
        self.writer.close()
    }

    /// Add an out-of-band handler. It sees every completed command and
    /// subnegotiation and must filter for what it cares about.
    pub fn register_handler<H: Handler>(&self, handler: H) -> TelnetResult<HandlerId> {
        self.registry.register(handler)
    }

    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        self.registry.unregister(id)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Parsed GMCP messages from the built-in demultiplexer. Available once
    /// per dial/attach.
    pub fn take_gmcp_messages(&mut self) -> Option<Receiver<GmcpMessage>> {
        self.gmcp_messages.take()
    }

    pub fn writer(&self) -> ConnectionWriter {
        self.writer.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// Send `IAC <command...>`, e.g. `send_command(&[Seq::WILL, Seq::GMCP])`
    pub fn send_command(&self, command: &[Seq]) -> TelnetResult<()> {
        self.writer.send_command(command)
    }

    pub fn send_gmcp(&self, module: &str, data: &str) -> TelnetResult<()> {
        self.writer.send_gmcp(module, data)
    }

    /// Close the transport and stop the built-in handlers. User handlers
    /// stay registered and are left to go idle.
    pub fn close(&mut self) -> TelnetResult<()> {
        self.detach()?;
        info!("connection closed");
        Ok(())
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Clean bytes already classified survive a failed transport read
        if self.processor.buffered() > 0 {
            return Ok(self.processor.read(buf));
        }

        let reader = self.reader.as_mut().ok_or(TelnetError::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                return Ok(0);
            }
            self.processor.process_bytes(&chunk[..n]);

            // A chunk of pure control sequences must not look like EOF
            if self.processor.buffered() > 0 {
                return Ok(self.processor.read(buf));
            }
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
