//! HTTP client implementation
//!
//! `Client` is the connector side of the stack: it resolves and connects to a
//! server, then exchanges messages over a framed connection.

use super::{Connection, Error, Message, RequestBuilder, Result, Transport};
use crate::config::ClientConfig;
use crate::net;
use std::net::TcpStream;
use std::time::Duration;

/// HTTP client
///
/// Provides methods for sending requests and receiving responses.
pub struct Client<T: Transport = TcpStream> {
    conn: Connection<T>,
    config: ClientConfig,
}

impl Client<TcpStream> {
    /// Connect to `host:port` with the default configuration
    pub fn connect(host: &str, port: &str) -> Result<Self> {
        Self::connect_with(host, port, ClientConfig::default())
    }

    /// Connect to `host:port`
    ///
    /// Every resolved address is tried in order; the first that accepts wins.
    pub fn connect_with(host: &str, port: &str, config: ClientConfig) -> Result<Self> {
        let stream = net::connect(host, port)?;
        Ok(Self::with_config(stream, config))
    }
}

impl<T: Transport> Client<T> {
    /// Create a client over an already connected transport
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Client {
            conn: Connection::with_buffer_size(transport, config.read_buffer_size())
                .with_max_message_size(config.max_message_size()),
            config,
        }
    }

    /// Send a request
    pub fn send_request(&mut self, request: &Message) -> Result<()> {
        request.as_request()?;
        self.conn.send_message(request)
    }

    /// Receive one response, or `None` if the server closed or timed out
    pub fn receive_response(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match self.conn.receive_message(timeout)? {
            Some(message) => {
                message.as_response()?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    /// Send a request and wait for its response with the configured timeout
    pub fn exchange(&mut self, request: &Message) -> Result<Message> {
        self.send_request(request)?;
        self.receive_response(self.config.receive_timeout())?
            .ok_or(Error::ConnectionClosed)
    }

    /// Send a keep-alive GET request
    pub fn get(&mut self, url: &str) -> Result<Message> {
        let request = RequestBuilder::new()
            .method("GET")
            .url(url)
            .header("Connection", "Keep-Alive")
            .build()?;

        self.exchange(&request)
    }

    /// Send a keep-alive POST request with a body
    pub fn post(&mut self, url: &str, content_type: &str, body: Vec<u8>) -> Result<Message> {
        let request = RequestBuilder::new()
            .method("POST")
            .url(url)
            .header("Content-Type", content_type)
            .header("Connection", "Keep-Alive")
            .header("Content-Length", body.len().to_string())
            .body(body)
            .build()?;

        self.exchange(&request)
    }

    /// Tell the server no more requests follow
    pub fn shutdown_sender(&mut self) -> Result<()> {
        self.conn.shutdown_sender()
    }

    /// Get a reference to the framed connection
    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    /// Get a mutable reference to the framed connection
    pub fn connection_mut(&mut self) -> &mut Connection<T> {
        &mut self.conn
    }
}
