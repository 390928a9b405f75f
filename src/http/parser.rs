//! HTTP message parsing
//!
//! The parser works on one complete raw message as produced by
//! `Connection::receive`. It does not decode the body: everything after the
//! blank line is taken verbatim.

use super::{
    Error, Headers, Kind, Message, RequestBuilder, ResponseBuilder, Result, HTTP_VERSION,
};
use std::str;

/// Decide whether raw bytes hold a request or a response
///
/// A message is a response iff it starts with the protocol version literal.
pub fn classify(raw: &[u8]) -> Kind {
    if raw.starts_with(HTTP_VERSION.as_bytes()) {
        Kind::Response
    } else {
        Kind::Request
    }
}

/// Parse a raw message of either kind
pub fn parse(raw: &[u8]) -> Result<Message> {
    match classify(raw) {
        Kind::Request => parse_request(raw),
        Kind::Response => parse_response(raw),
    }
}

/// Parse a raw request
///
/// Format: METHOD URL [VERSION]\r\n, then headers, blank line, body
pub fn parse_request(raw: &[u8]) -> Result<Message> {
    let mut lines = Lines::new(raw);
    let start = lines.next_line()?.unwrap_or_default();

    let mut tokens = start.split_whitespace();
    let (method, url) = match (tokens.next(), tokens.next()) {
        (Some(method), Some(url)) => (method, url),
        _ => {
            return Err(Error::Parse(format!("Invalid request line: {:?}", start)));
        }
    };

    let builder = RequestBuilder::new().method(method).url(url);
    let (headers, body) = parse_headers_and_body(lines)?;

    headers
        .into_iter()
        .fold(builder, |builder, (name, value)| builder.header(name, value))
        .body(body)
        .build()
}

/// Parse a raw response
///
/// Format: VERSION CODE [REASON]\r\n, then headers, blank line, body.
/// The reason phrase is ignored and recomputed from the code.
pub fn parse_response(raw: &[u8]) -> Result<Message> {
    let mut lines = Lines::new(raw);
    let start = lines.next_line()?.unwrap_or_default();

    let mut tokens = start.split_whitespace();
    let code = match (tokens.next(), tokens.next()) {
        (Some(_version), Some(code)) => code
            .parse::<u16>()
            .map_err(|_| Error::Parse(format!("Invalid status code: {}", code)))?,
        _ => {
            return Err(Error::Parse(format!("Invalid status line: {:?}", start)));
        }
    };

    let builder = ResponseBuilder::new().status(code)?;
    let (headers, body) = parse_headers_and_body(lines)?;

    headers
        .into_iter()
        .fold(builder, |builder, (name, value)| builder.header(name, value))
        .body(body)
        .build()
}

/// Read `Content-Length` from the head of a raw message
///
/// `head` must contain at least the start line and the header lines. A
/// missing header means an empty body.
pub fn content_length(head: &[u8]) -> Result<usize> {
    let message = parse(head)?;
    content_length_of(message.headers())
}

/// Read `Content-Length` from an already parsed header map
pub fn content_length_of(headers: &Headers) -> Result<usize> {
    match headers.get_ignore_case("Content-Length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| Error::InvalidContentLength(value.to_string())),
        None => Ok(0),
    }
}

type HeaderLines = Vec<(String, String)>;

fn parse_headers_and_body(mut lines: Lines<'_>) -> Result<(HeaderLines, Vec<u8>)> {
    let mut headers = Vec::new();

    while let Some(line) = lines.next_line()? {
        if line.is_empty() {
            break;
        }
        headers.push(Headers::parse_header_line(line)?);
    }

    Ok((headers, lines.rest().to_vec()))
}

/// Line cursor over raw bytes
///
/// Lines end at `\n`; a trailing `\r` is stripped.
struct Lines<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Lines { raw, pos: 0 }
    }

    fn next_line(&mut self) -> Result<Option<&'a str>> {
        if self.pos >= self.raw.len() {
            return Ok(None);
        }

        let remaining = &self.raw[self.pos..];
        let (line, advance) = match memchr::memchr(b'\n', remaining) {
            Some(nl) => (&remaining[..nl], nl + 1),
            None => (remaining, remaining.len()),
        };
        self.pos += advance;

        let line = line.strip_suffix(b"\r").unwrap_or(line);
        str::from_utf8(line)
            .map(Some)
            .map_err(|_| Error::Parse("Head is not valid UTF-8".to_string()))
    }

    fn rest(&self) -> &'a [u8] {
        &self.raw[self.pos.min(self.raw.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Status;

    #[test]
    fn test_classify() {
        assert_eq!(classify(b"HTTP/1.1 200 OK\r\n\r\n"), Kind::Response);
        assert_eq!(classify(b"GET / HTTP/1.1\r\n\r\n"), Kind::Request);
        assert_eq!(classify(b"HTTP/1.0 200 OK\r\n\r\n"), Kind::Request);
        assert_eq!(classify(b"HTTP/1"), Kind::Request);
        assert_eq!(classify(b""), Kind::Request);
    }

    #[test]
    fn test_parse_request() {
        let raw = b"GET /a/b.txt HTTP/1.1\r\nConnection: Keep-Alive\r\nHost: localhost\r\n\r\n";
        let req = parse_request(raw).unwrap();

        let view = req.as_request().unwrap();
        assert_eq!(view.method(), "GET");
        assert_eq!(view.url(), "/a/b.txt");
        assert_eq!(req.header("Connection"), Some("Keep-Alive"));
        assert_eq!(req.header("Host"), Some("localhost"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_parse_request_body_is_verbatim() {
        let raw = b"POST /up HTTP/1.1\r\nContent-Length: 9\r\n\r\nab\r\n\r\ncd\0";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.body(), b"ab\r\n\r\ncd\0");
    }

    #[test]
    fn test_parse_response() {
        let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
        let resp = parse_response(raw).unwrap();

        assert_eq!(resp.as_response().unwrap().status(), Status::NOT_FOUND);
        assert_eq!(resp.header("Content-Length"), Some("0"));
    }

    #[test]
    fn test_parse_response_unknown_status() {
        let raw = b"HTTP/1.1 999 Whatever\r\n\r\n";
        assert!(matches!(parse_response(raw), Err(Error::InvalidStatus(999))));
    }

    #[test]
    fn test_parse_malformed_start_line() {
        assert!(matches!(parse_request(b"GET\r\n\r\n"), Err(Error::Parse(_))));
        assert!(matches!(parse_request(b"\r\n\r\n"), Err(Error::Parse(_))));
        assert!(matches!(parse_response(b"HTTP/1.1\r\n\r\n"), Err(Error::Parse(_))));
        assert!(matches!(parse_response(b"HTTP/1.1 abc OK\r\n\r\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_malformed_header_line() {
        let raw = b"GET / HTTP/1.1\r\nHost localhost\r\n\r\n";
        assert!(matches!(parse_request(raw), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_duplicate_headers_keep_first() {
        let raw = b"GET / HTTP/1.1\r\nX-Dup: one\r\nX-Dup: two\r\n\r\n";
        let req = parse(raw).unwrap();
        assert_eq!(req.header("X-Dup"), Some("one"));
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let req = RequestBuilder::new()
            .method("POST")
            .url("/dir/file.png")
            .header("Content-Type", "img/png")
            .header("Connection", "Keep-Alive")
            .header("Content-Length", "4")
            .body(vec![0x89, b'P', b'N', b'G'])
            .build()
            .unwrap();
        assert_eq!(parse(&req.to_wire()).unwrap(), req);

        let resp = ResponseBuilder::new()
            .status(301)
            .unwrap()
            .header("Location", "/elsewhere")
            .build()
            .unwrap();
        assert_eq!(parse(&resp.to_wire()).unwrap(), resp);
    }

    #[test]
    fn test_content_length() {
        assert_eq!(content_length(b"GET / HTTP/1.1\r\n\r\n").unwrap(), 0);
        assert_eq!(
            content_length(b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n").unwrap(),
            12
        );
        assert_eq!(
            content_length(b"POST / HTTP/1.1\r\ncontent-length: 3\r\n\r\n").unwrap(),
            3
        );
        assert!(matches!(
            content_length(b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n"),
            Err(Error::InvalidContentLength(_))
        ));
    }

    #[test]
    fn test_lines_without_crlf() {
        let req = parse_request(b"GET /bare HTTP/1.1\nHost: x\n\nbody").unwrap();
        assert_eq!(req.as_request().unwrap().url(), "/bare");
        assert_eq!(req.header("Host"), Some("x"));
        assert_eq!(req.body(), b"body");
    }
}
