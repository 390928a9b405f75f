//! Framed connection
//!
//! `Connection` turns a byte stream into a sequence of complete HTTP messages.
//! A message ends `Content-Length` bytes after the blank line that closes its
//! head. Bytes read past that point belong to the next message; they are kept
//! as carry-over and handed out first by the next `receive` call, which makes
//! pipelined messages on one keep-alive connection separable.

use super::{
    parser, transport, Error, Message, Result, Transport, DEFAULT_MAX_MESSAGE_SIZE,
    HEADER_TERMINATOR, MAX_HEAD_SIZE,
};
use bytes::{Bytes, BytesMut};
use memchr::memmem;
use std::io;
use std::time::Duration;
use tracing::debug;

/// Size of the buffer handed to each transport read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1 << 16;

/// One live connection and its buffer state
pub struct Connection<T: Transport> {
    transport: T,
    read_buf: Box<[u8]>,
    carry_over: BytesMut,
    max_message_size: usize,
}

impl<T: Transport> Connection<T> {
    /// Wrap a transport with the default read buffer size
    pub fn new(transport: T) -> Self {
        Self::with_buffer_size(transport, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap a transport, reading at most `size` bytes per transport read
    pub fn with_buffer_size(transport: T, size: usize) -> Self {
        Connection {
            transport,
            read_buf: vec![0u8; size.max(1)].into_boxed_slice(),
            carry_over: BytesMut::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Refuse messages whose head plus declared body exceed `limit` bytes
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Send a fully serialized message
    pub fn send(&mut self, wire: &[u8]) -> Result<()> {
        self.transport.write_all(wire)?;
        self.transport.flush()?;
        debug!(bytes = wire.len(), "sent");
        Ok(())
    }

    /// Serialize and send a message
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        self.send(&message.to_wire())
    }

    /// Block until one complete raw message has arrived
    ///
    /// Returns `Ok(None)` when the peer closes the connection, the read times
    /// out or the transport fails; the caller should stop using the connection
    /// in all three cases. A message closed early, before its declared body has
    /// fully arrived, is also reported as `Ok(None)`, never truncated.
    ///
    /// Errors are parse failures of the message head, a head longer than
    /// `MAX_HEAD_SIZE` and a declared length beyond the message size limit.
    pub fn receive(&mut self, timeout: Duration) -> Result<Option<Bytes>> {
        if let Err(err) = self.transport.set_read_timeout(Some(timeout)) {
            debug!(error = %err, "cannot set receive timeout");
            return Ok(None);
        }

        let mut received = std::mem::take(&mut self.carry_over);
        let mut scanned: usize = 0;

        let head_len = loop {
            // Back up so a terminator split across two reads is still found
            let from = scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
            if let Some(pos) = memmem::find(&received[from..], HEADER_TERMINATOR) {
                break from + pos + HEADER_TERMINATOR.len();
            }
            if received.len() > MAX_HEAD_SIZE {
                return Err(Error::HeadTooLarge(MAX_HEAD_SIZE));
            }

            scanned = received.len();
            if !self.fill(&mut received) {
                return Ok(None);
            }
        };
        if head_len > MAX_HEAD_SIZE {
            return Err(Error::HeadTooLarge(MAX_HEAD_SIZE));
        }

        let content_length = parser::content_length(&received[..head_len])?;
        let total = head_len
            .checked_add(content_length)
            .filter(|total| *total <= self.max_message_size)
            .ok_or_else(|| Error::InvalidContentLength(content_length.to_string()))?;

        // Never reserve more than one read ahead of what has arrived
        let missing = total.saturating_sub(received.len());
        received.reserve(missing.min(self.read_buf.len()));

        while received.len() < total {
            if !self.fill(&mut received) {
                debug!(
                    expected = total,
                    received = received.len(),
                    "connection ended inside message body"
                );
                return Ok(None);
            }
        }

        self.carry_over = received.split_off(total);
        debug!(
            bytes = total,
            carry_over = self.carry_over.len(),
            "message framed"
        );
        Ok(Some(received.freeze()))
    }

    /// Receive one message and parse it according to its kind
    pub fn receive_message(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match self.receive(timeout)? {
            Some(raw) => parser::parse(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Half-close the connection: no more sends, receives keep working
    pub fn shutdown_sender(&mut self) -> Result<()> {
        self.transport.shutdown_write()?;
        Ok(())
    }

    /// Bytes already read that belong to the next message
    pub fn carry_over(&self) -> &[u8] {
        &self.carry_over
    }

    /// Get a reference to the underlying transport
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the transport, discarding any carry-over
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Perform one transport read and append it to `received`
    ///
    /// Returns `false` when no more bytes will arrive.
    fn fill(&mut self, received: &mut BytesMut) -> bool {
        loop {
            match self.transport.read(&mut self.read_buf) {
                Ok(0) => {
                    debug!("connection closed by peer");
                    return false;
                }
                Ok(n) => {
                    debug!(bytes = n, "received");
                    received.extend_from_slice(&self.read_buf[..n]);
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if transport::is_timeout(&err) => {
                    debug!("receive timed out");
                    return false;
                }
                Err(err) => {
                    debug!(error = %err, "receive failed");
                    return false;
                }
            }
        }
    }
}
