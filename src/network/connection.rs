//! Connection Handler
//!
//! Runs the protocol session for an individual client connection.
//!
//! ## Session States
//! ```text
//!            ┌───────────────────────────────────────┐
//!            ▼                                       │
//!    ┌──────────────┐  line   ┌─────────────┐        │
//!    │ AwaitingLine ├────────►│ Dispatching ├────────┤
//!    └──────┬───────┘         └──────┬──────┘        │
//!           │                        │ set           │
//!           │                 ┌──────▼───────────┐   │
//!           │                 │ ReadingItemBytes ├───┘
//!           │                 └──────┬───────────┘
//!           │ eof / timeout / fatal  │ fatal
//!           ▼                        ▼
//!    ┌─────────────────────────────────────┐
//!    │               Closed                │
//!    └─────────────────────────────────────┘
//! ```

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::config::SessionConfig;
use crate::error::{Result, WireError};
use crate::protocol::{parse_command, write_response, Command, Response, CRLF};
use crate::storage::{Item, Reply, Storage};

use super::deadline::{Deadline, Timed};

/// What the session does after a command
enum Flow {
    Continue,
    Close,
}

/// Handles a single client connection
pub struct Connection<R: Read + Deadline, W: Write + Deadline> {
    /// Stream reader (buffered, sized by the session config)
    reader: BufReader<Timed<R>>,

    /// Stream writer (buffered, flushed once per command)
    writer: BufWriter<Timed<W>>,

    /// Shared storage backend
    storage: Arc<dyn Storage>,

    /// Session settings
    config: SessionConfig,

    /// Reused line buffer
    line: Vec<u8>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection<TcpStream, TcpStream> {
    /// Create a session for an accepted TCP stream
    pub fn new(stream: TcpStream, storage: Arc<dyn Storage>, config: SessionConfig) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self::from_parts(
            read_stream,
            write_stream,
            storage,
            config,
            peer_addr,
        ))
    }
}

impl<R: Read + Deadline, W: Write + Deadline> Connection<R, W> {
    /// Create a session over separate read and write halves
    pub fn from_parts(
        reader: R,
        writer: W,
        storage: Arc<dyn Storage>,
        config: SessionConfig,
        peer_addr: impl Into<String>,
    ) -> Self {
        Self {
            reader: BufReader::with_capacity(config.buffer_size, Timed::new(reader)),
            writer: BufWriter::with_capacity(config.buffer_size, Timed::new(writer)),
            storage,
            config,
            line: Vec::with_capacity(256),
            peer_addr: peer_addr.into(),
        }
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok` when the client leaves cleanly, closes, idles past the
    /// deadline or drops the socket; returns the error for any other fatal
    /// condition.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match self.read_line() {
                Ok(true) => {
                    if self.line == CRLF {
                        continue;
                    }
                    parse_command(&self.line)
                }
                Ok(false) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) => return self.finish(e),
            };

            tracing::trace!("Received {} from {}", command.name(), self.peer_addr);

            match self.dispatch(command) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => {
                    tracing::debug!("Client {} requested close", self.peer_addr);
                    return Ok(());
                }
                Err(e) if e.is_resumable() => {
                    tracing::debug!("Resumable error for {}: {}", self.peer_addr, e);
                }
                Err(e) => return self.finish(e),
            }
        }
    }

    /// Read one line into `self.line`.
    ///
    /// Arms the session deadline first; it bounds this line, any item bytes
    /// that follow and the response. Returns `false` on end of stream,
    /// including a final line cut off by the peer before its newline.
    fn read_line(&mut self) -> Result<bool> {
        let expires_at = Instant::now() + self.config.deadline;
        self.reader.get_mut().arm(expires_at);
        self.writer.get_mut().arm(expires_at);

        let limit = self.config.buffer_size;
        self.line.clear();
        let read = self
            .reader
            .by_ref()
            .take(limit as u64)
            .read_until(b'\n', &mut self.line)
            .map_err(WireError::from_stream)?;

        if read == 0 {
            return Ok(false);
        }

        if !self.line.ends_with(b"\n") {
            if self.line.len() >= limit {
                return Err(WireError::Framing(format!(
                    "command line exceeds {} bytes",
                    limit
                )));
            }
            tracing::debug!(
                "Discarding {} bytes of unterminated input from {}",
                self.line.len(),
                self.peer_addr
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Execute a command and write its response
    fn dispatch(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Malformed | Command::Unknown => {
                tracing::debug!("Rejecting {} line from {}", command.name(), self.peer_addr);
                self.respond(&[Response::Error])?;
            }
            Command::Set {
                key,
                flags,
                exptime,
                bytes,
                noreply,
            } => {
                let value = self.read_item(bytes)?;
                self.handle_set(
                    Item {
                        key,
                        value,
                        flags,
                        exptime,
                    },
                    noreply,
                )?;
            }
            Command::Get { keys, multi: false } => {
                for key in keys {
                    self.handle_get(key)?;
                }
            }
            Command::Get { keys, multi: true } => self.handle_get_multi(keys)?,
            Command::Delete { key, noreply } => self.handle_delete(key, noreply)?,
            Command::Incr {
                key,
                delta,
                noreply,
            } => {
                let reply = self.storage.incr(&key, delta);
                self.handle_counter("incr", &key, reply, noreply)?;
            }
            Command::Decr {
                key,
                delta,
                noreply,
            } => {
                let reply = self.storage.decr(&key, delta);
                self.handle_counter("decr", &key, reply, noreply)?;
            }
            Command::Close => return Ok(Flow::Close),
        }

        Ok(Flow::Continue)
    }

    /// Read exactly `bytes` of payload plus its CRLF terminator.
    ///
    /// Any shortfall leaves the stream desynchronized, so every failure here
    /// is fatal.
    fn read_item(&mut self, bytes: usize) -> Result<Bytes> {
        if bytes > self.config.max_item_size {
            return Err(WireError::Framing(format!(
                "item of {} bytes exceeds the {} byte limit",
                bytes, self.config.max_item_size
            )));
        }

        let mut data = vec![0u8; bytes + CRLF.len()];
        self.reader.read_exact(&mut data).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                WireError::Framing(format!("connection closed inside a {} byte item", bytes))
            } else {
                WireError::from_stream(e)
            }
        })?;

        if !data.ends_with(CRLF) {
            return Err(WireError::Framing(
                "item data not terminated by CRLF".to_string(),
            ));
        }

        data.truncate(bytes);
        Ok(Bytes::from(data))
    }

    fn handle_set(&mut self, item: Item, noreply: bool) -> Result<()> {
        let (suppress, response, outcome) = match self.storage.set(item, noreply) {
            Ok(reply) => (noreply || reply.noreply, Response::Stored, Ok(())),
            Err(e) => (noreply, Response::NotStored, Err(e)),
        };

        if !suppress {
            self.respond(&[response])?;
        }

        // A storage failure is reported to the client first, then classified
        outcome
    }

    fn handle_get(&mut self, key: Vec<u8>) -> Result<()> {
        let reply = self.storage.get(&key).unwrap_or_else(|e| {
            self.degraded("get", &key, &e);
            Reply::new(None)
        });

        if reply.noreply {
            return Ok(());
        }

        let mut responses = Vec::with_capacity(2);
        if let Some(data) = reply.value {
            responses.push(Response::value(key, data));
        }
        responses.push(Response::End);
        self.respond(&responses)
    }

    fn handle_get_multi(&mut self, keys: Vec<Vec<u8>>) -> Result<()> {
        let found = self.storage.get_multi(&keys).unwrap_or_else(|e| {
            tracing::warn!(
                "Storage gets of {} keys failed for {}: {}",
                keys.len(),
                self.peer_addr,
                e
            );
            Vec::new()
        });

        let mut responses: Vec<Response> = found
            .into_iter()
            .filter_map(|(key, value)| value.map(|data| Response::value(key, data)))
            .collect();
        responses.push(Response::End);
        self.respond(&responses)
    }

    fn handle_delete(&mut self, key: Vec<u8>, noreply: bool) -> Result<()> {
        let reply = self.storage.delete(&key).unwrap_or_else(|e| {
            self.degraded("delete", &key, &e);
            Reply::new(false)
        });

        if noreply || reply.noreply {
            return Ok(());
        }

        let response = if reply.value {
            Response::Deleted
        } else {
            Response::NotFound
        };
        self.respond(&[response])
    }

    fn handle_counter(
        &mut self,
        op: &str,
        key: &[u8],
        reply: Result<Reply<Option<u64>>>,
        noreply: bool,
    ) -> Result<()> {
        let reply = reply.unwrap_or_else(|e| {
            self.degraded(op, key, &e);
            Reply::new(None)
        });

        if noreply || reply.noreply {
            return Ok(());
        }

        let response = match reply.value {
            Some(value) => Response::Numeric(value),
            None => Response::NotFound,
        };
        self.respond(&[response])
    }

    /// Write a command's complete response and flush it as one unit
    fn respond(&mut self, responses: &[Response]) -> Result<()> {
        for response in responses {
            write_response(&mut self.writer, response).map_err(stalled_write)?;
        }
        self.writer.flush().map_err(WireError::from_stream)
    }

    /// Storage failures on reads, deletes and counters answer as a miss
    fn degraded(&self, op: &str, key: &[u8], err: &WireError) {
        tracing::warn!(
            "Storage {} of {:?} failed for {}, answering as not found: {}",
            op,
            String::from_utf8_lossy(key),
            self.peer_addr,
            err
        );
    }

    /// Log a fatal condition and decide what `handle` returns
    fn finish(&self, err: WireError) -> Result<()> {
        match &err {
            WireError::Timeout => {
                tracing::debug!("Deadline exceeded for client {}", self.peer_addr);
                Ok(())
            }
            WireError::Io(io_err)
                if matches!(
                    io_err.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::BrokenPipe
                ) =>
            {
                tracing::debug!("Client {} dropped the connection: {}", self.peer_addr, err);
                Ok(())
            }
            _ => {
                tracing::warn!("Closing connection to {}: {}", self.peer_addr, err);
                Err(err)
            }
        }
    }
}

/// A write blocked past the deadline is a timeout, not a broken stream
fn stalled_write(err: WireError) -> WireError {
    match err {
        WireError::Io(e) => WireError::from_stream(e),
        other => other,
    }
}

/// Session entry point: run the protocol on an accepted stream until it
/// closes.
///
/// `params` is a query string with optional `deadline` (ms), `buf` (bytes)
/// and `max_item` (bytes) settings.
pub fn serve_connection(stream: TcpStream, storage: Arc<dyn Storage>, params: &str) -> Result<()> {
    let config = SessionConfig::from_params(params);
    Connection::new(stream, storage, config)?.handle()
}
