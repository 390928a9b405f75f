//! Socket plumbing
//!
//! Address resolution, outbound connects and the listening socket. Everything
//! above this module works on plain `TcpStream`s.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::debug;

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("{addr} resolved to no addresses")]
    NoAddress { addr: String },

    #[error("unable to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("cannot listen on {addr}: {source}")]
    Listen { addr: String, source: io::Error },
}

/// Resolve `host:port` into candidate socket addresses, in resolver order
pub fn resolve(host: &str, port: &str) -> Result<Vec<SocketAddr>> {
    let addr = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            addr: addr.clone(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(Error::NoAddress { addr });
    }
    Ok(addrs)
}

/// Connect to the first candidate address of `host:port` that accepts
///
/// No retry: if every candidate refuses, the last error is returned.
pub fn connect(host: &str, port: &str) -> Result<TcpStream> {
    let addrs = resolve(host, port)?;
    let mut last_err = None;

    for addr in addrs {
        match connect_addr(addr) {
            Ok(stream) => {
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(Error::Connect {
        addr: format!("{}:{}", host, port),
        source: last_err.unwrap_or_else(|| io::ErrorKind::NotConnected.into()),
    })
}

fn connect_addr(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect(&SockAddr::from(addr))?;
    Ok(socket.into())
}

/// Bind a listening TCP socket on `addr`
pub fn listen(addr: &str, backlog: i32) -> Result<TcpListener> {
    let wrap = |source: io::Error| Error::Listen {
        addr: addr.to_string(),
        source,
    };

    let bind_addr = addr
        .to_socket_addrs()
        .map_err(wrap)?
        .next()
        .ok_or_else(|| Error::NoAddress {
            addr: addr.to_string(),
        })?;

    let socket = Socket::new(Domain::for_address(bind_addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(wrap)?;
    socket.set_reuse_address(true).map_err(wrap)?;
    socket.bind(&SockAddr::from(bind_addr)).map_err(wrap)?;
    socket.listen(backlog).map_err(wrap)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::thread;

    #[test]
    fn test_resolve_localhost() {
        let addrs = resolve("127.0.0.1", "8080").unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_resolve_bad_port() {
        assert!(matches!(
            resolve("127.0.0.1", "not-a-port"),
            Err(Error::Resolve { .. })
        ));
    }

    #[test]
    fn test_listen_and_connect() {
        let listener = listen("127.0.0.1:0", 16).unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"hi").unwrap();
        });

        let mut stream = connect("127.0.0.1", &port).unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Grab a free port, then close it again
        let port = {
            let listener = listen("127.0.0.1:0", 1).unwrap();
            listener.local_addr().unwrap().port().to_string()
        };

        assert!(matches!(
            connect("127.0.0.1", &port),
            Err(Error::Connect { .. })
        ));
    }
}
