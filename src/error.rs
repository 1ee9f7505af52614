//! Error types for the rendezvous gateway.

use std::error::Error as StdError;
use std::fmt;
use std::result;
use tonic::Status;

/// A specialized Result type for gateway operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for gateway operations.
#[derive(Debug)]
pub enum Error {
    /// Registry lookup miss for an identity
    NotFound(String),
    /// No registered service carries the requested target name
    TargetNotFound(String),
    /// A target was resolved but could not be handed the message
    DeliveryFailed(String),
    /// Missing or invalid identity on a stream handshake
    Unauthenticated(String),
    /// Malformed request from a caller
    InvalidArgument(String),
    /// Registry storage faults
    Storage(String),
    /// Configuration errors
    Config(String),
    /// Transport-level failures (listener, channel, stream)
    Transport(String),
    /// I/O errors
    Io(std::io::Error),
    /// Internal errors
    Internal(String),
}

impl Error {
    /// Whether a caller may reasonably retry the same operation later.
    ///
    /// Registration and connection binding are not atomic with respect to each
    /// other, so a forwarding miss can simply mean the target is mid-handshake.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TargetNotFound(_) | Error::DeliveryFailed(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(id) => write!(f, "service not found: {}", id),
            Error::TargetNotFound(name) => write!(f, "target service not found: {}", name),
            Error::DeliveryFailed(msg) => write!(f, "failed to send message: {}", msg),
            Error::Unauthenticated(msg) => write!(f, "unauthenticated: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) | Error::TargetNotFound(_) => Status::not_found(err.to_string()),
            Error::DeliveryFailed(_) => Status::unavailable(err.to_string()),
            Error::Unauthenticated(msg) => Status::unauthenticated(msg),
            Error::InvalidArgument(msg) => Status::invalid_argument(msg),
            Error::Storage(_) | Error::Internal(_) | Error::Io(_) => {
                Status::internal(err.to_string())
            }
            Error::Config(msg) => Status::failed_precondition(format!("Config error: {}", msg)),
            Error::Transport(_) => Status::unavailable(err.to_string()),
        }
    }
}
