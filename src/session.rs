//! Interactive terminal session: keyboard lines go to the MUD, clean
//! server text goes to stdout, GMCP traffic is optionally echoed in colour.

use crate::config::ClientConfig;
use crate::errors::{ClientError, ClientResult};

use crossterm::{
    QueueableCommand,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use jiff::{SignedDuration, Timestamp};
use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::Receiver;
use std::thread;
use telnet_gmcp::{Connection, ConnectionWriter, GmcpMessage};
use tracing::{debug, info, warn};

/// What a line typed by the player turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Nothing typed
    Skip,
    /// Game input, already newline terminated
    Send(Vec<u8>),
    /// `/gmcp <module> [data]`
    Gmcp { module: String, data: String },
    /// `/quit`
    Quit,
    /// A `/command` we don't know, or one missing its arguments
    Unknown(String),
}

impl InputAction {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return InputAction::Skip;
        }

        let Some(local) = line.strip_prefix('/') else {
            let mut bytes = line.as_bytes().to_vec();
            bytes.push(b'\n');
            return InputAction::Send(bytes);
        };

        let (command, rest) = match local.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (local, ""),
        };

        match command {
            "quit" => InputAction::Quit,
            "gmcp" if !rest.is_empty() => {
                let (module, data) = rest.split_once(' ').unwrap_or((rest, ""));
                InputAction::Gmcp {
                    module: module.to_string(),
                    data: data.trim().to_string(),
                }
            }
            _ => InputAction::Unknown(line.to_string()),
        }
    }
}

/// Forward player input until `/quit` or end of input, then close the
/// connection. Notices for local commands are written to `notices`.
pub fn pump_input<R: BufRead, W: Write>(
    input: R,
    writer: &ConnectionWriter,
    notices: &mut W,
) -> ClientResult<()> {
    for line in input.lines() {
        let line = line?;
        match InputAction::parse(&line) {
            InputAction::Skip => {}
            InputAction::Send(bytes) => writer.write_all(&bytes)?,
            InputAction::Gmcp { module, data } => {
                debug!(module = %module, "sending GMCP from prompt");
                writer.send_gmcp(&module, &data)?;
            }
            InputAction::Quit => break,
            InputAction::Unknown(command) => {
                notices.queue(SetForegroundColor(Color::Yellow))?;
                notices.queue(Print(format!(
                    "Unknown command: {command} (try /quit or /gmcp <module> [data])\r\n"
                )))?;
                notices.queue(ResetColor)?;
                notices.flush()?;
            }
        }
    }

    info!("input finished, closing connection");
    writer.close()?;
    Ok(())
}

/// Copy clean server text to `out` until the server (or we) hang up.
/// Returns the number of bytes shown.
pub fn pump_output<R: Read, W: Write>(conn: &mut R, out: &mut W) -> ClientResult<u64> {
    let mut buf = [0u8; 4096];
    let mut total = 0u64;

    loop {
        let n = match conn.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buf[..n])?;
        out.flush()?;
        total += n as u64;
    }
}

/// Render one GMCP message as a coloured line
pub fn print_gmcp<W: Write>(out: &mut W, message: &GmcpMessage) -> io::Result<()> {
    out.queue(SetForegroundColor(Color::DarkCyan))?;
    out.queue(Print(format!("[GMCP] {}", message.module)))?;
    if !message.data.is_empty() {
        out.queue(SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!(" {}", message.data_lossy())))?;
    }
    out.queue(ResetColor)?;
    out.queue(Print("\r\n"))?;
    out.flush()
}

fn spawn_gmcp_printer(messages: Receiver<GmcpMessage>) -> io::Result<()> {
    thread::Builder::new()
        .name("gmcp-printer".to_string())
        .spawn(move || {
            for message in messages {
                let mut stdout = io::stdout().lock();
                if let Err(e) = print_gmcp(&mut stdout, &message) {
                    warn!(error = %e, "could not print GMCP message");
                    break;
                }
            }
        })?;
    Ok(())
}

fn spawn_input(writer: ConnectionWriter) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            if let Err(e) = pump_input(stdin.lock(), &writer, &mut io::stderr()) {
                warn!(error = %e, "input loop ended");
                let _ = writer.close();
            }
        })?;
    Ok(())
}

/// Format a duration as `HH:MM:SS`
pub fn format_elapsed(elapsed: SignedDuration) -> String {
    let secs = elapsed.as_secs().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

pub struct MudSession {
    config: ClientConfig,
    connection: Connection,
    started: Timestamp,
}

impl MudSession {
    pub fn new(config: ClientConfig, connection: Connection) -> Self {
        Self {
            config,
            connection,
            started: Timestamp::now(),
        }
    }

    /// Run until the server closes the connection or the player quits
    pub fn run(mut self) -> ClientResult<()> {
        if let Some(messages) = self.connection.take_gmcp_messages() {
            if self.config.logging.show_gmcp {
                spawn_gmcp_printer(messages)?;
            } else {
                // Keep draining so the demux never stalls
                thread::Builder::new()
                    .name("gmcp-drain".to_string())
                    .spawn(move || {
                        for _ in messages {}
                    })?;
            }
        }

        spawn_input(self.connection.writer())?;

        let result = {
            let mut stdout = io::stdout();
            pump_output(&mut self.connection, &mut stdout)
        };

        let shown = match result {
            Ok(shown) => shown,
            Err(ClientError::Disconnected) => {
                info!("server dropped the connection");
                0
            }
            Err(e) => {
                let _ = self.connection.close();
                return Err(e);
            }
        };
        let _ = self.connection.close();

        let elapsed = Timestamp::now().duration_since(self.started);
        let mut stdout = io::stdout();
        stdout.queue(SetForegroundColor(Color::Green))?;
        stdout.queue(Print(format!(
            "\r\nConnection closed after {}.\r\n",
            format_elapsed(elapsed)
        )))?;
        stdout.queue(ResetColor)?;
        stdout.flush()?;
        debug!(bytes = shown, "session finished");
        Ok(())
    }
}
