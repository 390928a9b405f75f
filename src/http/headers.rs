//! HTTP headers handling
//!
//! Header names are unique within a message and compared case-sensitively, the
//! way they were stored. Iteration follows insertion order, so serialization is
//! deterministic.

use super::{Error, Result};
use std::fmt;

/// HTTP headers collection
///
/// Inserting a name that is already present keeps the existing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers {
            headers: Vec::new(),
        }
    }

    /// Insert a header
    ///
    /// Returns `false` and leaves the collection untouched when a header with
    /// the same name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            tracing::debug!(header = %name, "duplicate header ignored");
            return false;
        }

        self.headers.push((name, value.into()));
        true
    }

    /// Get the value for a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get the value for a header, ignoring ASCII case in the name
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if a header exists
    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n == name)
    }

    /// Get the number of headers
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parse a header line into name and value
    ///
    /// The first whitespace-delimited token must end in a colon; the name is
    /// that token without the colon. The value is the next token, or empty.
    pub fn parse_header_line(line: &str) -> Result<(String, String)> {
        let mut tokens = line.split_whitespace();

        let name = tokens
            .next()
            .and_then(|token| token.strip_suffix(':'))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
        let value = tokens.next().unwrap_or_default();

        Ok((name.to_string(), value.to_string()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut headers = Headers::new();
        assert!(headers.insert("Content-Type", "text/html"));
        assert!(headers.insert("Content-Length", "42"));

        assert_eq!(headers.get("Content-Type"), Some("text/html"));
        assert_eq!(headers.get("Content-Length"), Some("42"));
        assert_eq!(headers.get("Missing"), None);
    }

    #[test]
    fn test_first_value_wins() {
        let mut headers = Headers::new();
        assert!(headers.insert("X-Custom", "first"));
        assert!(!headers.insert("X-Custom", "second"));

        assert_eq!(headers.get("X-Custom"), Some("first"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/html");
        headers.insert("content-type", "text/plain");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), None);
        assert_eq!(headers.get_ignore_case("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn test_iter_keeps_insertion_order() {
        let mut headers = Headers::new();
        headers.insert("C", "3");
        headers.insert("A", "1");
        headers.insert("B", "2");

        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(collected, vec![("C", "3"), ("A", "1"), ("B", "2")]);
    }

    #[test]
    fn test_parse_header_line() {
        let (name, value) = Headers::parse_header_line("Content-Type: text/html").unwrap();
        assert_eq!(name, "Content-Type");
        assert_eq!(value, "text/html");

        let (name, value) = Headers::parse_header_line("X-Custom:   value  ").unwrap();
        assert_eq!(name, "X-Custom");
        assert_eq!(value, "value");

        // Only the first value token is kept
        let (_, value) = Headers::parse_header_line("Content-Type: text/plain; charset=utf-8").unwrap();
        assert_eq!(value, "text/plain;");

        let (name, value) = Headers::parse_header_line("X-Empty:").unwrap();
        assert_eq!(name, "X-Empty");
        assert_eq!(value, "");
    }

    #[test]
    fn test_parse_header_line_rejects_missing_colon() {
        assert!(matches!(
            Headers::parse_header_line("Invalid"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(Headers::parse_header_line("Host localhost").is_err());
        assert!(Headers::parse_header_line(": value").is_err());
        assert!(Headers::parse_header_line("").is_err());
    }
}
