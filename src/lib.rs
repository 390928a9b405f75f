//! wirehttp - HTTP/1.1 over raw TCP sockets
//!
//! This crate provides a small HTTP/1.1 client/server stack: a framed
//! connection that cuts messages out of a byte stream, a request/response model
//! with builders, and a thread-per-connection server. On top of it sit a
//! file-transfer handler and a command-file driven transfer client.

pub mod config;
pub mod files;
pub mod http;
pub mod net;
pub mod transfer;

/// Install the `tracing` subscriber used by the binaries
///
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
