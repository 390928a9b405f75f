//! HTTP message types
//!
//! A `Message` is either a request or a response. Both share the header map and
//! the body; the start line is the part that differs. Messages are only ever
//! assembled through `RequestBuilder` / `ResponseBuilder` (or the parser, which
//! uses the builders) and are immutable afterwards.

use super::{Error, Headers, Result, CRLF, HTTP_VERSION};
use std::fmt;

/// Discriminates requests from responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Request,
    Response,
}

/// HTTP status code
///
/// Only the codes with a known reason phrase can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
}

impl Status {
    pub const OK: Status = Status { code: 200 };
    pub const MOVED_PERMANENTLY: Status = Status { code: 301 };
    pub const BAD_REQUEST: Status = Status { code: 400 };
    pub const NOT_FOUND: Status = Status { code: 404 };

    /// Look up a status code in the reason phrase table
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            200 | 301 | 400 | 404 => Ok(Status { code }),
            _ => Err(Error::InvalidStatus(code)),
        }
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Get the reason phrase for this status code
    pub fn reason_phrase(&self) -> &'static str {
        match self.code {
            200 => "OK",
            301 => "Moved Permanently",
            400 => "Bad Request",
            // from_code admits nothing else
            _ => "Not Found",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason_phrase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StartLine {
    Request { method: String, url: String },
    Response { status: Status },
}

/// HTTP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    start: StartLine,
    headers: Headers,
    body: Vec<u8>,
}

/// Request view of a `Message`
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    method: &'a str,
    url: &'a str,
}

impl<'a> RequestView<'a> {
    /// Get the method token
    pub fn method(&self) -> &'a str {
        self.method
    }

    /// Get the target path
    pub fn url(&self) -> &'a str {
        self.url
    }
}

/// Response view of a `Message`
#[derive(Debug, Clone, Copy)]
pub struct ResponseView {
    status: Status,
}

impl ResponseView {
    /// Get the status
    pub fn status(&self) -> Status {
        self.status
    }
}

impl Message {
    /// A response from an already validated status
    pub fn response(status: Status, headers: Headers, body: Vec<u8>) -> Self {
        Message {
            start: StartLine::Response { status },
            headers,
            body,
        }
    }

    /// A response with no headers and no body
    pub fn empty_response(status: Status) -> Self {
        Self::response(status, Headers::new(), Vec::new())
    }

    /// Whether this is a request or a response
    pub fn kind(&self) -> Kind {
        match self.start {
            StartLine::Request { .. } => Kind::Request,
            StartLine::Response { .. } => Kind::Response,
        }
    }

    /// Access the request-only fields
    pub fn as_request(&self) -> Result<RequestView<'_>> {
        match &self.start {
            StartLine::Request { method, url } => Ok(RequestView { method, url }),
            StartLine::Response { .. } => Err(Error::WrongKind {
                expected: Kind::Request,
                found: Kind::Response,
            }),
        }
    }

    /// Access the response-only fields
    pub fn as_response(&self) -> Result<ResponseView> {
        match &self.start {
            StartLine::Response { status } => Ok(ResponseView { status: *status }),
            StartLine::Request { .. } => Err(Error::WrongKind {
                expected: Kind::Response,
                found: Kind::Request,
            }),
        }
    }

    /// Get the protocol version
    pub fn version(&self) -> &'static str {
        HTTP_VERSION
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a single header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the message and return its body
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Render the message in wire format
    ///
    /// The head is always rendered; the body only when `include_body` is set.
    pub fn serialize(&self, include_body: bool) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + if include_body { self.body.len() } else { 0 });

        match &self.start {
            StartLine::Request { method, url } => {
                buf.extend_from_slice(method.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(url.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(HTTP_VERSION.as_bytes());
            }
            StartLine::Response { status } => {
                buf.extend_from_slice(HTTP_VERSION.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(status.to_string().as_bytes());
            }
        }
        buf.extend_from_slice(CRLF.as_bytes());

        for (name, value) in self.headers.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF.as_bytes());
        }

        buf.extend_from_slice(CRLF.as_bytes());

        if include_body {
            buf.extend_from_slice(&self.body);
        }

        buf
    }

    /// Convert the message to wire format, body included
    pub fn to_wire(&self) -> Vec<u8> {
        self.serialize(true)
    }
}

impl fmt::Display for Message {
    /// Head only, for logging
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.serialize(false)))
    }
}

/// Builder for HTTP requests
///
/// `build` consumes the builder, so it cannot be reused:
///
/// ```compile_fail
/// use wirehttp::http::RequestBuilder;
///
/// let builder = RequestBuilder::new().method("GET").url("/");
/// let first = builder.build();
/// let second = builder.build();
/// ```
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<String>,
    url: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl RequestBuilder {
    /// Create an empty request builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method token
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the target path
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a header; a name that was already added keeps its first value
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Result<Message> {
        let method = self.method.ok_or(Error::MissingField("method"))?;
        let url = self.url.ok_or(Error::MissingField("url"))?;

        Ok(Message {
            start: StartLine::Request { method, url },
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Builder for HTTP responses
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    status: Option<Status>,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Create an empty response builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status by numeric code
    ///
    /// Fails for codes outside the reason phrase table.
    pub fn status(mut self, code: u16) -> Result<Self> {
        self.status = Some(Status::from_code(code)?);
        Ok(self)
    }

    /// Set an already validated status
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a header; a name that was already added keeps its first value
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Result<Message> {
        let status = self.status.ok_or(Error::MissingField("status"))?;

        Ok(Message {
            start: StartLine::Response { status },
            headers: self.headers,
            body: self.body,
        })
    }
}
