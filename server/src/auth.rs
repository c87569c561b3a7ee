//! Shared-secret authentication for the broadcast endpoint.
//!
//! Callers of `POST /api/notification` prove themselves with a fixed key in
//! the `x-api-key` header. The comparison is constant-time so the key cannot
//! be probed byte by byte.

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors that can occur during API key verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The request carried no key, or an empty one.
    #[error("missing api key")]
    MissingKey,

    /// The supplied key did not match the configured secret.
    #[error("invalid api key")]
    InvalidKey,
}

/// Verifies a caller-supplied API key against the configured secret.
///
/// # Example
///
/// ```rust
/// use tasty_server::auth::{verify_api_key, AuthError};
///
/// assert!(verify_api_key(Some("s3cret"), "s3cret").is_ok());
/// assert_eq!(
///     verify_api_key(Some("wrong"), "s3cret"),
///     Err(AuthError::InvalidKey)
/// );
/// assert_eq!(verify_api_key(None, "s3cret"), Err(AuthError::MissingKey));
/// ```
pub fn verify_api_key(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let provided = provided
        .filter(|key| !key.is_empty())
        .ok_or(AuthError::MissingKey)?;

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}
