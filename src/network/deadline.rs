//! Deadline-bounded stream halves
//!
//! A socket timeout bounds a single `read(2)` or `write(2)`. A session
//! deadline is absolute: it is armed once per command line and covers every
//! read and write until the next line starts, however many syscalls that
//! takes. `Timed` converts the remaining time into a fresh socket timeout
//! before each call.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// A stream half whose per-call timeouts can be adjusted
pub trait Deadline {
    /// Fail the next read that waits longer than `timeout`
    fn set_read_limit(&self, timeout: Duration) -> io::Result<()>;

    /// Fail the next write that waits longer than `timeout`
    fn set_write_limit(&self, timeout: Duration) -> io::Result<()>;
}

impl Deadline for TcpStream {
    fn set_read_limit(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }

    fn set_write_limit(&self, timeout: Duration) -> io::Result<()> {
        self.set_write_timeout(Some(timeout))
    }
}

/// Wraps a stream half and fails its I/O once an absolute deadline passes
pub(crate) struct Timed<S> {
    inner: S,
    expires_at: Option<Instant>,
}

impl<S> Timed<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            expires_at: None,
        }
    }

    /// Set the instant after which all I/O fails
    pub(crate) fn arm(&mut self, at: Instant) {
        self.expires_at = Some(at);
    }

    /// Time left before the deadline, or `TimedOut` if it has passed
    fn remaining(&self) -> io::Result<Option<Duration>> {
        let Some(at) = self.expires_at else {
            return Ok(None);
        };
        match at.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(Some(left)),
            _ => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "session deadline exceeded",
            )),
        }
    }
}

impl<S: Read + Deadline> Read for Timed<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(left) = self.remaining()? {
            self.inner.set_read_limit(left)?;
        }
        self.inner.read(buf)
    }
}

impl<S: Write + Deadline> Write for Timed<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(left) = self.remaining()? {
            self.inner.set_write_limit(left)?;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
