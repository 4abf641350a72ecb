//! Error types for the editor bridge
//!
//! Two families live here:
//! - [`BridgeError`]: setup and lifecycle failures that the owner of a
//!   listener or registry must handle (bind failures, duplicate commands).
//! - [`CommandError`] / [`HandlerError`]: per-call failures that never cross
//!   the dispatch boundary as control flow. They are rendered into a failed
//!   [`ResultEnvelope`](crate::protocol::ResultEnvelope) instead.

use std::net::SocketAddr;

use thiserror::Error;

/// Setup and lifecycle errors
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The listening socket could not be bound (port in use, permission, ...)
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A command with this name is already registered
    #[error("command already registered: {0}")]
    DuplicateCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Per-call dispatch failures, reported inside a failed result envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Handler(String),
}

impl CommandError {
    /// Validation failure naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error returned by a command handler
///
/// The message is passed through verbatim as the `error` of the result
/// envelope, so it should be short and readable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("invalid parameters: {}", err))
    }
}

impl From<HandlerError> for CommandError {
    fn from(err: HandlerError) -> Self {
        CommandError::Handler(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message_contains_name() {
        let err = CommandError::UnknownCommand("spawn_tree".to_string());
        assert_eq!(err.to_string(), "unknown command: spawn_tree");
    }

    #[test]
    fn test_handler_error_passes_message_through() {
        let err: CommandError = HandlerError::new("class not found").into();
        assert_eq!(err.to_string(), "class not found");
    }

    #[test]
    fn test_bind_error_names_address() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let err = BridgeError::Bind {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.to_string().contains("127.0.0.1:7000"));
    }
}
