//! Transport abstraction
//!
//! The framed connection only needs a blocking byte stream whose reads can be
//! bounded by a timeout. `TcpStream` is the production transport; tests plug in
//! scripted streams to control exactly how bytes are split across reads.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// Blocking duplex byte stream
pub trait Transport: Read + Write {
    /// Bound the next reads by `timeout`; `None` blocks indefinitely
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Stop sending; the peer sees end of stream while reads keep working
    fn shutdown_write(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown_write(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

/// Whether an I/O error is a receive timeout
///
/// Platforms disagree on the kind reported for `SO_RCVTIMEO` expiry.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
