//! Server and client configuration

use crate::http::connection::DEFAULT_READ_BUFFER_SIZE;
use crate::http::DEFAULT_MAX_MESSAGE_SIZE;
use std::time::Duration;

/// Idle timeout shared out between all live connections
pub const DEFAULT_TIMEOUT_BUDGET: Duration = Duration::from_secs(50);

/// How long a client waits for a response by default
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1000);

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default listen backlog
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    addr: String,
    timeout_budget: Duration,
    backlog: i32,
    read_buffer_size: usize,
    max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: DEFAULT_LISTEN_ADDR.to_string(),
            timeout_budget: DEFAULT_TIMEOUT_BUDGET,
            backlog: DEFAULT_BACKLOG,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        ServerConfig {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Total idle timeout, divided by the number of live connections
    pub fn timeout_budget(&self) -> Duration {
        self.timeout_budget
    }

    pub fn with_timeout_budget(mut self, budget: Duration) -> Self {
        self.timeout_budget = budget;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn backlog(&self) -> i32 {
        self.backlog
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Largest message accepted, head and declared body together
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    receive_timeout: Duration,
    read_buffer_size: usize,
    max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Largest message accepted, head and declared body together
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }
}
