//! HTTP server implementation
//!
//! The server owns a listening socket and runs a single accept loop. Every
//! accepted connection is handed to a `Spawner`, which by default starts one
//! detached thread per connection. The worker reads one request at a time,
//! passes it to the `Handler` and writes back the response, until the peer goes
//! away or stays idle for longer than the adaptive timeout.

use super::{parser, Connection, Kind, Message, Status, Transport};
use crate::config::ServerConfig;
use crate::net;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Turns a request into a response
///
/// Runs inline on the connection's worker, so it must not block indefinitely.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Message) -> Message;
}

impl<F> Handler for F
where
    F: Fn(&Message) -> Message + Send + Sync + 'static,
{
    fn handle(&self, request: &Message) -> Message {
        self(request)
    }
}

/// Job run for one accepted connection
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Policy deciding where connection workers run
pub trait Spawner: Send + Sync {
    fn spawn(&self, name: String, job: Job) -> io::Result<()>;
}

/// One detached OS thread per connection, without any limit
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPerConnection;

impl Spawner for ThreadPerConnection {
    fn spawn(&self, name: String, job: Job) -> io::Result<()> {
        thread::Builder::new().name(name).spawn(job).map(drop)
    }
}

/// Count of connections currently being served
///
/// Only sizes the per-read timeout; it never gates admission.
#[derive(Debug, Default)]
pub struct LiveConnections {
    count: AtomicUsize,
}

impl LiveConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection until the returned guard is dropped
    pub fn enter(self: &Arc<Self>) -> LiveGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        LiveGuard {
            live: Arc::clone(self),
        }
    }

    /// Current number of live connections
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Timeout for the next read given the current load
    pub fn timeout(&self, budget: Duration) -> Duration {
        adaptive_timeout(budget, self.count())
    }
}

/// Keeps a connection counted in `LiveConnections` while alive
#[derive(Debug)]
pub struct LiveGuard {
    live: Arc<LiveConnections>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.live.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Split the timeout budget between `live` connections, in whole seconds
///
/// Never returns less than one second: a zero socket timeout would block
/// forever.
pub fn adaptive_timeout(budget: Duration, live: usize) -> Duration {
    let live = live.max(1) as u64;
    Duration::from_secs((budget.as_secs() / live).max(1))
}

/// HTTP server
pub struct Server<H: Handler, S: Spawner = ThreadPerConnection> {
    listener: TcpListener,
    handler: Arc<H>,
    spawner: S,
    live: Arc<LiveConnections>,
    config: ServerConfig,
}

impl<H: Handler> Server<H> {
    /// Bind the listening socket described by `config`
    pub fn bind(config: ServerConfig, handler: H) -> super::Result<Self> {
        Self::with_spawner(config, handler, ThreadPerConnection)
    }
}

impl<H: Handler, S: Spawner> Server<H, S> {
    /// Bind the listening socket, running workers through `spawner`
    pub fn with_spawner(config: ServerConfig, handler: H, spawner: S) -> super::Result<Self> {
        let listener = net::listen(config.addr(), config.backlog())?;
        info!(addr = %listener.local_addr()?, "listening");

        Ok(Server {
            listener,
            handler: Arc::new(handler),
            spawner,
            live: Arc::new(LiveConnections::new()),
            config,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> super::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Connections currently being served
    pub fn live_connections(&self) -> Arc<LiveConnections> {
        Arc::clone(&self.live)
    }

    /// Accept and serve connections forever
    pub fn serve(&self) -> ! {
        loop {
            self.accept_one();
        }
    }

    /// Accept one connection and hand it to a worker
    ///
    /// Accept and spawn failures only affect that connection.
    pub fn accept_one(&self) {
        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "accept failed");
                return;
            }
        };
        debug!(%peer, "accepted connection");

        let handler = Arc::clone(&self.handler);
        let live = Arc::clone(&self.live);
        let budget = self.config.timeout_budget();
        let buffer_size = self.config.read_buffer_size();
        let max_message_size = self.config.max_message_size();

        let job: Job = Box::new(move || {
            let conn = Connection::with_buffer_size(stream, buffer_size)
                .with_max_message_size(max_message_size);
            serve_connection(conn, &*handler, &live, budget);
            debug!(%peer, "connection closed");
        });

        if let Err(err) = self.spawner.spawn(format!("conn-{}", peer), job) {
            error!(%peer, error = %err, "cannot start connection worker");
        }
    }
}

/// Serve requests on one connection until it closes or idles out
///
/// The connection is counted in `live` for the whole call and dropped, closing
/// the transport, on return.
pub fn serve_connection<T, H>(
    mut conn: Connection<T>,
    handler: &H,
    live: &Arc<LiveConnections>,
    budget: Duration,
) where
    T: Transport,
    H: Handler + ?Sized,
{
    serve_loop(&mut conn, |request| handler.handle(request), live, budget);
}

/// Request/response loop of a connection worker
pub fn serve_loop<T, F>(
    conn: &mut Connection<T>,
    handle: F,
    live: &Arc<LiveConnections>,
    budget: Duration,
) where
    T: Transport,
    F: Fn(&Message) -> Message,
{
    let _guard = live.enter();

    loop {
        let timeout = live.timeout(budget);
        let raw = match conn.receive(timeout) {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "rejecting request");
                reject(conn);
                break;
            }
        };

        let request = match parser::parse_request(&raw) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "unparseable request");
                reject(conn);
                break;
            }
        };
        debug!(request = %request, "request received");

        let response = handle(&request);
        if response.kind() != Kind::Response {
            error!("handler returned a request instead of a response");
            break;
        }

        if let Err(err) = conn.send_message(&response) {
            error!(error = %err, "failed to send HTTP response");
            break;
        }
    }
}

fn reject<T: Transport>(conn: &mut Connection<T>) {
    let response = Message::empty_response(Status::BAD_REQUEST);
    if let Err(err) = conn.send_message(&response) {
        debug!(error = %err, "failed to send rejection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::scripted::{ScriptedTransport, Step};
    use crate::http::{RequestBuilder, ResponseBuilder};
    use std::sync::Mutex;

    const BUDGET: Duration = Duration::from_secs(50);

    fn echo_url(request: &Message) -> Message {
        let url = request.as_request().map(|r| r.url().to_string()).unwrap_or_default();
        ResponseBuilder::new()
            .with_status(Status::OK)
            .header("Content-Length", url.len().to_string())
            .body(url)
            .build()
            .unwrap()
    }

    #[test]
    fn test_adaptive_timeout() {
        assert_eq!(adaptive_timeout(BUDGET, 1), Duration::from_secs(50));
        assert_eq!(adaptive_timeout(BUDGET, 5), Duration::from_secs(10));
        assert_eq!(adaptive_timeout(BUDGET, 0), Duration::from_secs(50));
        assert_eq!(adaptive_timeout(BUDGET, 500), Duration::from_secs(1));
    }

    #[test]
    fn test_adaptive_timeout_is_non_increasing() {
        let mut previous = adaptive_timeout(BUDGET, 1);
        for live in 2..200 {
            let current = adaptive_timeout(BUDGET, live);
            assert!(current <= previous, "{} connections", live);
            previous = current;
        }
    }

    #[test]
    fn test_live_connections_guard() {
        let live = Arc::new(LiveConnections::new());
        assert_eq!(live.count(), 0);

        let first = live.enter();
        let second = live.enter();
        assert_eq!(live.count(), 2);
        assert_eq!(live.timeout(BUDGET), Duration::from_secs(25));

        drop(first);
        assert_eq!(live.count(), 1);
        drop(second);
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_guard_released_on_panic() {
        let live = Arc::new(LiveConnections::new());
        let inner = Arc::clone(&live);

        let result = thread::spawn(move || {
            let _guard = inner.enter();
            panic!("handler blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_serve_loop_answers_each_request() {
        let wire = [
            RequestBuilder::new().method("GET").url("/one").build().unwrap().to_wire(),
            RequestBuilder::new().method("GET").url("/two").build().unwrap().to_wire(),
        ]
        .concat();
        let mut conn = Connection::new(ScriptedTransport::chunked(&wire, 5));
        let live = Arc::new(LiveConnections::new());

        let seen = Mutex::new(Vec::new());
        serve_loop(
            &mut conn,
            |request| {
                seen.lock().unwrap().push(request.as_request().unwrap().url().to_string());
                echo_url(request)
            },
            &live,
            BUDGET,
        );

        assert_eq!(*seen.lock().unwrap(), vec!["/one", "/two"]);
        assert_eq!(
            conn.get_ref().written,
            b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n/oneHTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n/two".to_vec()
        );
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_serve_loop_uses_adaptive_timeout() {
        let wire = RequestBuilder::new().method("GET").url("/abc").build().unwrap().to_wire();
        let mut conn = Connection::new(ScriptedTransport::new(vec![Step::Data(wire), Step::Timeout]));
        let live = Arc::new(LiveConnections::new());

        // four other connections are open while this one is served
        let others: Vec<_> = (0..4).map(|_| live.enter()).collect();
        serve_loop(&mut conn, echo_url, &live, BUDGET);

        assert_eq!(
            conn.get_ref().timeouts,
            vec![Some(Duration::from_secs(10)), Some(Duration::from_secs(10))]
        );
        assert_eq!(live.count(), 4);
        drop(others);
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_serve_loop_rejects_garbage() {
        let mut conn = Connection::new(ScriptedTransport::chunked(
            b"GET / HTTP/1.1\r\nnot a header\r\n\r\n",
            64,
        ));
        let live = Arc::new(LiveConnections::new());
        serve_loop(&mut conn, echo_url, &live, BUDGET);

        assert_eq!(
            conn.get_ref().written,
            b"HTTP/1.1 400 Bad Request\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn test_serve_loop_rejects_oversized_body() {
        let mut conn = Connection::new(ScriptedTransport::chunked(
            b"POST /big HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\nxx",
            64,
        ));
        let live = Arc::new(LiveConnections::new());
        let calls = AtomicUsize::new(0);

        serve_loop(
            &mut conn,
            |request| {
                calls.fetch_add(1, Ordering::SeqCst);
                echo_url(request)
            },
            &live,
            BUDGET,
        );

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            conn.get_ref().written,
            b"HTTP/1.1 400 Bad Request\r\n\r\n".to_vec()
        );
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_serve_loop_stops_on_send_failure() {
        let wire = [
            RequestBuilder::new().method("GET").url("/a").build().unwrap().to_wire(),
            RequestBuilder::new().method("GET").url("/b").build().unwrap().to_wire(),
        ]
        .concat();
        let mut transport = ScriptedTransport::chunked(&wire, wire.len());
        transport.fail_writes = true;
        let mut conn = Connection::new(transport);
        let live = Arc::new(LiveConnections::new());

        let calls = AtomicUsize::new(0);
        serve_loop(
            &mut conn,
            |request| {
                calls.fetch_add(1, Ordering::SeqCst);
                echo_url(request)
            },
            &live,
            BUDGET,
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_serve_connection_with_handler_trait() {
        struct NotFound;
        impl Handler for NotFound {
            fn handle(&self, _request: &Message) -> Message {
                ResponseBuilder::new().with_status(Status::NOT_FOUND).build().unwrap()
            }
        }

        let wire = RequestBuilder::new().method("GET").url("/missing").build().unwrap().to_wire();
        let conn = Connection::new(ScriptedTransport::chunked(&wire, 3));
        let live = Arc::new(LiveConnections::new());

        serve_connection(conn, &NotFound, &live, BUDGET);
        assert_eq!(live.count(), 0);
    }
}
