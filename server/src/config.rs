//! Server configuration module.
//!
//! Parses configuration from environment variables for the Tasty gateway.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TASTY_AUTH_SECRET` | Yes* | - | HS256 key verifying session tokens |
//! | `TASTY_API_KEY` | Yes* | - | Shared secret for the notification endpoint |
//! | `TASTY_ENV` | No | development | `production` selects the production CORS origins |
//! | `PORT` | No | 8080 | HTTP server port |
//! | `TASTY_UNSAFE_NO_AUTH` | No | false | Disable all authentication (dev only) |
//!
//! *Not required if `TASTY_UNSAFE_NO_AUTH=true`

use std::env;

use thiserror::Error;
use tracing::warn;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Browser origins allowed to reach the notification channel in production.
const PRODUCTION_ORIGINS: &[&str] = &[
    "https://app.tastycreative.com",
    "https://tastycreative.com",
];

/// Browser origin allowed during local development.
const DEVELOPMENT_ORIGINS: &[&str] = &["http://localhost:3000"];

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Deployment environment, selecting the CORS origin allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Returns the browser origins allowed for this environment.
    #[must_use]
    pub fn allowed_origins(self) -> &'static [&'static str] {
        match self {
            Self::Production => PRODUCTION_ORIGINS,
            Self::Development => DEVELOPMENT_ORIGINS,
        }
    }
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HS256 secret used to verify session tokens.
    pub auth_secret: Option<String>,

    /// Shared secret expected in the `x-api-key` header of broadcast calls.
    pub api_key: Option<String>,

    /// Deployment environment.
    pub environment: Environment,

    /// HTTP server port.
    pub port: u16,

    /// When true, disables all authentication (development only).
    pub unsafe_no_auth: bool,
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing (when
    /// `TASTY_UNSAFE_NO_AUTH` is not true) or have invalid formats.
    pub fn from_env() -> Result<Self, ConfigError> {
        let unsafe_no_auth = parse_bool_env("TASTY_UNSAFE_NO_AUTH");
        let port = parse_port()?;
        let environment = parse_environment()?;
        let auth_secret = env::var("TASTY_AUTH_SECRET").ok().filter(|s| !s.is_empty());
        let api_key = env::var("TASTY_API_KEY").ok().filter(|s| !s.is_empty());

        let config = Self {
            auth_secret,
            api_key,
            environment,
            port,
            unsafe_no_auth,
        };

        config.validate()?;

        if config.unsafe_no_auth {
            warn!(
                "TASTY_UNSAFE_NO_AUTH is enabled - all authentication is disabled. \
                 Do not use in production!"
            );
        }

        Ok(config)
    }

    /// Returns the browser origins allowed for the configured environment.
    #[must_use]
    pub fn allowed_origins(&self) -> &'static [&'static str] {
        self.environment.allowed_origins()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.unsafe_no_auth {
            return Ok(());
        }

        if self.auth_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("TASTY_AUTH_SECRET".to_string()));
        }

        if self.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("TASTY_API_KEY".to_string()));
        }

        Ok(())
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse the TASTY_ENV environment variable.
fn parse_environment() -> Result<Environment, ConfigError> {
    match env::var("TASTY_ENV") {
        Ok(value) if value.eq_ignore_ascii_case("production") => Ok(Environment::Production),
        Ok(value) if value.eq_ignore_ascii_case("development") || value.is_empty() => {
            Ok(Environment::Development)
        }
        Ok(value) => Err(ConfigError::InvalidFormat {
            var: "TASTY_ENV".to_string(),
            message: format!("expected 'production' or 'development', got '{value}'"),
        }),
        Err(_) => Ok(Environment::Development),
    }
}
