//! HTTP/1.1 message layer
//!
//! This module provides the message model, the parser, the framed connection
//! and the client/server built on top of it.
//!
//! # Architecture
//!
//! Bytes flow through the layer in one direction per peer:
//!
//! - `Connection` turns a byte stream into complete raw messages, keeping any
//!   bytes that belong to the next message for the next `receive` call
//! - `parser` turns a raw message into a `Message`
//! - `Message::serialize` turns a `Message` back into wire bytes
//!
//! The connection is generic over a `Transport`, so the same framing code runs
//! over a `TcpStream` or any other blocking byte stream.
//!
//! # Examples
//!
//! ```no_run
//! use wirehttp::http::{Client, RequestBuilder};
//! use std::time::Duration;
//!
//! let mut client = Client::connect("127.0.0.1", "8080").unwrap();
//!
//! let request = RequestBuilder::new()
//!     .method("GET")
//!     .url("/index.html")
//!     .header("Connection", "Keep-Alive")
//!     .build()
//!     .unwrap();
//! client.send_request(&request).unwrap();
//!
//! if let Some(response) = client.receive_response(Duration::from_secs(5)).unwrap() {
//!     let status = response.as_response().unwrap().status();
//!     assert_eq!(status.code(), 200);
//! }
//! ```

pub mod client;
pub mod connection;
pub mod headers;
pub mod message;
pub mod parser;
pub mod server;
pub mod transport;

pub use client::Client;
pub use connection::Connection;
pub use headers::Headers;
pub use message::{Kind, Message, RequestBuilder, ResponseBuilder, Status};
pub use server::{Handler, LiveConnections, Server, Spawner, ThreadPerConnection};
pub use transport::Transport;

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] crate::net::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(u16),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Message head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("Missing {0} in builder")]
    MissingField(&'static str),

    #[error("Expected a {expected:?} message, found a {found:?}")]
    WrongKind { expected: Kind, found: Kind },

    #[error("Connection closed")]
    ConnectionClosed,
}

/// The only protocol version spoken on the wire
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Blank line separating the head of a message from its body
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Maximum size of a message head, start line and headers included
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Default maximum size of a whole message, head and body
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;
