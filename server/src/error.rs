//! Error types for the Tasty gateway server.
//!
//! The taxonomy mirrors how failures surface to callers:
//!
//! - [`ServerError::Auth`] - bad API key or absent/invalid session token (401)
//! - [`ServerError::Validation`] - missing or malformed request fields (400)
//! - [`ServerError::Channel`] - broadcast infrastructure failures; logged and
//!   swallowed, never returned to the HTTP caller
//! - [`ServerError::Internal`] - anything unexpected (500)
//!
//! Authorization failures in the route guard are not errors at all; they
//! manifest only as redirects.

use std::error::Error;
use std::fmt;

use crate::config::ConfigError;

/// Top-level error type for the Tasty gateway server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during startup.
    Config(ConfigError),

    /// Authentication failure: bad shared-secret key or invalid session token.
    Auth(String),

    /// Request validation failure, such as a missing required field.
    Validation(String),

    /// Notification channel failure, such as broadcasting before the
    /// channel server exists. Swallowed at the endpoint boundary.
    Channel(String),

    /// Unexpected internal server error.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Channel(msg) => write!(f, "notification channel error: {msg}"),
            Self::Internal(msg) => write!(f, "internal server error: {msg}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl ServerError {
    /// Creates a new authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new notification channel error.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` if this error indicates a client-side problem.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Validation(_))
    }

    /// Returns `true` if this error indicates a server-side problem.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Config(_) | Self::Channel(_))
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
