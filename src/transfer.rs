//! Command-file driven transfers
//!
//! A command file is a whitespace-separated list of records
//! `<client_get|client_post> <path> <host> <port>`. Each record opens its own
//! connection; a failing record is logged and the run continues.

use crate::config::ClientConfig;
use crate::files::{content_type, relative_path, write_file};
use crate::http::{self, Client, Message, Status};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Transfer errors
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("record {0} is incomplete")]
    Incomplete(usize),

    #[error("invalid path {0:?}")]
    InvalidPath(String),

    #[error("server answered {0}")]
    Status(Status),

    #[error(transparent)]
    Http(#[from] http::Error),

    #[error("file error: {0}")]
    Io(#[from] io::Error),
}

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Download `path` from the server
    Get,
    /// Upload the local `path` to the server
    Post,
}

impl Action {
    fn from_token(token: &str) -> Result<Self, TransferError> {
        match token {
            "client_get" => Ok(Action::Get),
            "client_post" => Ok(Action::Post),
            _ => Err(TransferError::UnknownCommand(token.to_string())),
        }
    }
}

/// One record of a command file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub path: String,
    pub host: String,
    pub port: String,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            Action::Get => "client_get",
            Action::Post => "client_post",
        };
        write!(f, "{} {} {} {}", action, self.path, self.host, self.port)
    }
}

/// Parse the text of a command file
///
/// Malformed records are logged and skipped; the rest are still returned.
pub fn parse_commands(text: &str) -> Vec<Command> {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    tokens
        .chunks(4)
        .enumerate()
        .filter_map(|(index, record)| match parse_record(index + 1, record) {
            Ok(command) => Some(command),
            Err(err) => {
                warn!(record = index + 1, error = %err, "skipping command");
                None
            }
        })
        .collect()
}

fn parse_record(number: usize, record: &[&str]) -> Result<Command, TransferError> {
    let [action, path, host, port] = record else {
        return Err(TransferError::Incomplete(number));
    };

    Ok(Command {
        action: Action::from_token(action)?,
        path: path.to_string(),
        host: host.to_string(),
        port: port.to_string(),
    })
}

/// Outcome of a whole run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Local files live under a root directory
#[derive(Debug, Clone)]
pub struct Transfer {
    root: PathBuf,
    config: ClientConfig,
}

impl Transfer {
    pub fn new(root: impl Into<PathBuf>, config: ClientConfig) -> Self {
        Transfer {
            root: root.into(),
            config,
        }
    }

    /// Execute every command, logging failures per item
    pub fn run(&self, commands: &[Command]) -> Summary {
        let mut summary = Summary::default();

        for command in commands {
            match self.execute(command) {
                Ok(bytes) => {
                    info!(%command, bytes, "transfer done");
                    summary.succeeded += 1;
                }
                Err(err) => {
                    error!(%command, error = %err, "transfer failed");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Execute one command, returning the number of payload bytes moved
    pub fn execute(&self, command: &Command) -> Result<usize, TransferError> {
        let local = self.local_path(&command.path)?;
        let mut client = Client::connect_with(&command.host, &command.port, self.config.clone())?;

        match command.action {
            Action::Get => {
                let response = client.get(&command.path)?;
                ensure_ok(&response)?;
                write_file(&local, response.body())?;
                Ok(response.body().len())
            }
            Action::Post => {
                let data = fs::read(&local)?;
                let len = data.len();
                let response = client.post(&command.path, content_type(&local), data)?;
                ensure_ok(&response)?;
                Ok(len)
            }
        }
    }

    fn local_path(&self, path: &str) -> Result<PathBuf, TransferError> {
        relative_path(path)
            .map(|relative| self.root.join(relative))
            .ok_or_else(|| TransferError::InvalidPath(path.to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn ensure_ok(response: &Message) -> Result<(), TransferError> {
    let status = response.as_response()?.status();
    if status == Status::OK {
        Ok(())
    } else {
        Err(TransferError::Status(status))
    }
}
