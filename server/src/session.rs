//! Session token reading.
//!
//! Browsers carry a signed session token in the `tasty_session` cookie; API
//! clients may send the same token as an `Authorization: Bearer` header. The
//! token is an HS256 JWT whose claims carry the identity subject and the
//! admin flag.
//!
//! Verification is deliberately fail-open to "absent token": a malformed,
//! expired, or wrongly-signed token yields `None`, exactly like no token at
//! all. The route guard turns that into a login redirect rather than an
//! error, so the security-relevant default stays an explicit state-machine
//! transition instead of an exception path.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "tasty_session";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity subject, set at login.
    pub sub: String,

    /// Whether the subject may reach admin routes. Tokens minted before the
    /// flag existed simply lack the claim, which reads as false.
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Errors that can occur when issuing a session token.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The signing secret is empty.
    #[error("session secret is empty")]
    EmptySecret,

    /// Token encoding failed.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Signs a session token for the given claims.
///
/// Login itself is handled outside this service; this helper exists for
/// operator tooling and tests that need a valid token.
pub fn issue_session_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::EmptySecret);
    }

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|err| SessionError::Encoding(err.to_string()))
}

/// Decodes and verifies a session token, failing open to `None`.
///
/// Every failure mode (bad signature, expired, malformed, empty secret) is
/// treated identically to an absent token.
#[must_use]
pub fn decode_session_token(token: &str, secret: &str) -> Option<SessionClaims> {
    if secret.is_empty() {
        debug!("session secret is empty, treating token as absent");
        return None;
    }

    let key = DecodingKey::from_secret(secret.as_bytes());
    match decode::<SessionClaims>(token, &key, &Validation::default()) {
        Ok(data) => Some(data.claims),
        Err(err) => {
            debug!(error = %err, "session token rejected");
            None
        }
    }
}

/// Resolves session claims from request headers.
///
/// Looks for the session cookie first, then an `Authorization: Bearer`
/// header. Returns `None` when no token is present or verification fails.
#[must_use]
pub fn claims_from_headers(headers: &HeaderMap, secret: &str) -> Option<SessionClaims> {
    let token = cookie_token(headers).or_else(|| bearer_token(headers))?;
    decode_session_token(&token, secret)
}

/// Extracts the session cookie value, if present.
fn cookie_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };

        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name.trim() == SESSION_COOKIE && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

/// Extracts a bearer token from the Authorization header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    const SECRET: &str = "test-secret";

    fn claims(sub: &str, is_admin: bool) -> SessionClaims {
        SessionClaims {
            sub: sub.to_string(),
            is_admin,
            exp: Utc::now().timestamp() + 3600,
        }
    }

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    #[test]
    fn token_round_trips() {
        let claims = claims("user-1", true);
        let token = issue_session_token(&claims, SECRET).unwrap();

        let decoded = decode_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn expired_token_reads_as_absent() {
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            is_admin: true,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = issue_session_token(&claims, SECRET).unwrap();

        assert!(decode_session_token(&token, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_reads_as_absent() {
        let token = issue_session_token(&claims("user-1", false), SECRET).unwrap();

        assert!(decode_session_token(&token, "other-secret").is_none());
    }

    #[test]
    fn malformed_token_reads_as_absent() {
        assert!(decode_session_token("not-a-jwt", SECRET).is_none());
    }

    #[test]
    fn empty_secret_reads_as_absent() {
        let token = issue_session_token(&claims("user-1", false), SECRET).unwrap();

        assert!(decode_session_token(&token, "").is_none());
    }

    #[test]
    fn missing_admin_claim_defaults_to_false() {
        // A token minted without the isAdmin claim at all.
        #[derive(Serialize)]
        struct BareClaims {
            sub: String,
            exp: i64,
        }

        let bare = BareClaims {
            sub: "user-1".to_string(),
            exp: Utc::now().timestamp() + 3600,
        };
        let key = EncodingKey::from_secret(SECRET.as_bytes());
        let token = encode(&Header::default(), &bare, &key).unwrap();

        let decoded = decode_session_token(&token, SECRET).unwrap();
        assert!(!decoded.is_admin);
    }

    #[test]
    fn issue_rejects_empty_secret() {
        let result = issue_session_token(&claims("user-1", false), "");
        assert!(matches!(result, Err(SessionError::EmptySecret)));
    }

    #[test]
    fn claims_resolve_from_session_cookie() {
        let token = issue_session_token(&claims("user-1", true), SECRET).unwrap();
        let headers = headers_with_cookie(&format!("theme=dark; {SESSION_COOKIE}={token}"));

        let decoded = claims_from_headers(&headers, SECRET).unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert!(decoded.is_admin);
    }

    #[test]
    fn claims_resolve_from_bearer_header() {
        let token = issue_session_token(&claims("user-2", false), SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let decoded = claims_from_headers(&headers, SECRET).unwrap();
        assert_eq!(decoded.sub, "user-2");
        assert!(!decoded.is_admin);
    }

    #[test]
    fn no_headers_yields_no_claims() {
        assert!(claims_from_headers(&HeaderMap::new(), SECRET).is_none());
    }

    #[test]
    fn unrelated_cookies_are_ignored() {
        let headers = headers_with_cookie("theme=dark; lang=en");
        assert!(claims_from_headers(&headers, SECRET).is_none());
    }

    #[test]
    fn invalid_cookie_token_reads_as_absent() {
        let headers = headers_with_cookie(&format!("{SESSION_COOKIE}=garbage"));
        assert!(claims_from_headers(&headers, SECRET).is_none());
    }
}
