//! File-backed request handler
//!
//! GET downloads `<root><url>`, POST uploads the request body to it. Content
//! failures answer `404`; only transport failures end a connection.

use crate::http::{Handler, Message, Status};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};

/// MIME types by file extension
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "text/js"),
    ("jpeg", "img/jpeg"),
    ("png", "img/png"),
];

/// Content type announced for unknown extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for a path, by extension
pub fn content_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Map a request target onto a relative path
///
/// Returns `None` for targets that would leave the root.
pub fn relative_path(url: &str) -> Option<PathBuf> {
    let path = Path::new(url.trim_start_matches('/'));
    let mut clean = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Write `body` to `path`, creating missing parent directories
pub fn write_file(path: &Path, body: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, body)
}

/// Serves GET and POST requests from a directory
#[derive(Debug, Clone)]
pub struct FileHandler {
    root: PathBuf,
}

impl FileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileHandler { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn get(&self, url: &str) -> Message {
        let Some(path) = relative_path(url).map(|p| self.root.join(p)) else {
            error!(url, "refusing path outside root");
            return Message::empty_response(Status::NOT_FOUND);
        };

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read file");
                return Message::empty_response(Status::NOT_FOUND);
            }
        };
        debug!(path = %path.display(), bytes = data.len(), "file read");

        let length = data.len().to_string();
        response(
            Status::OK,
            &[
                ("Content-Type", content_type(&path)),
                ("Connection", "Keep-Alive"),
                ("Content-Length", length.as_str()),
            ],
            data,
        )
    }

    fn post(&self, url: &str, body: &[u8]) -> Message {
        let Some(path) = relative_path(url).map(|p| self.root.join(p)) else {
            error!(url, "refusing path outside root");
            return Message::empty_response(Status::NOT_FOUND);
        };

        if let Err(err) = write_file(&path, body) {
            error!(path = %path.display(), error = %err, "failed to write file");
            return Message::empty_response(Status::NOT_FOUND);
        }
        debug!(path = %path.display(), bytes = body.len(), "file written");

        Message::empty_response(Status::OK)
    }
}

impl Handler for FileHandler {
    fn handle(&self, request: &Message) -> Message {
        let Ok(view) = request.as_request() else {
            return Message::empty_response(Status::BAD_REQUEST);
        };

        match view.method() {
            "GET" => self.get(view.url()),
            "POST" => self.post(view.url(), request.body()),
            _ => response(
                Status::BAD_REQUEST,
                &[("Connection", "Keep-Alive")],
                Vec::new(),
            ),
        }
    }
}

fn response(status: Status, headers: &[(&str, &str)], body: Vec<u8>) -> Message {
    let headers = headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    Message::response(status, headers, body)
}
