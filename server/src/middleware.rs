//! Route access middleware.
//!
//! Every request to a guarded path runs through a small state machine that
//! decides between passing the request on and redirecting the browser. Only
//! `/` and `/admin` (plus descendants) are guarded at all; every other path
//! bypasses the machine entirely.
//!
//! The decision logic is a pure function over the path and the (optionally
//! absent) session claims, so the security-relevant transitions are
//! auditable in one place and token verification failures collapse into the
//! "no token" state instead of raising.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use crate::routes::AppState;
use crate::session::{claims_from_headers, SessionClaims};

/// Redirect target for unauthenticated requests.
pub const LOGIN_PATH: &str = "/login";

/// Classification of a request path for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// The exact public root `/`.
    Root,
    /// Anything under the `/admin` prefix.
    Admin,
    /// Everything else.
    Unclassified,
}

/// Outcome of evaluating the access state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Let the request through to its handler.
    Allow,
    /// Send the browser elsewhere; never surfaced as an error.
    Redirect(String),
}

/// Classifies a path by prefix match.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if path == "/" {
        RouteClass::Root
    } else if path.starts_with("/admin") {
        RouteClass::Admin
    } else {
        RouteClass::Unclassified
    }
}

/// Whether a path is subject to access control at all.
///
/// Matches `/` exactly and `/admin` with any descendants. Paths outside the
/// matcher never enter [`evaluate`]; they are passed through untouched.
#[must_use]
pub fn is_guarded(path: &str) -> bool {
    path == "/" || path == "/admin" || path.starts_with("/admin/")
}

/// Runs the access state machine for a guarded path.
///
/// Transitions are evaluated in a fixed order. Root and Admin are disjoint
/// today, but the ordering is load-bearing should the prefixes ever
/// overlap, so it must not be rearranged.
#[must_use]
pub fn evaluate(path: &str, claims: Option<&SessionClaims>) -> RouteDecision {
    let class = classify(path);

    if class == RouteClass::Root && claims.is_none() {
        return RouteDecision::Redirect(LOGIN_PATH.to_string());
    }

    if class == RouteClass::Admin && claims.is_none() {
        return RouteDecision::Redirect(format!("{LOGIN_PATH}?callbackUrl={path}"));
    }

    if class == RouteClass::Admin {
        if let Some(claims) = claims {
            if !claims.is_admin {
                return RouteDecision::Redirect("/".to_string());
            }
        }
    }

    RouteDecision::Allow
}

/// Axum middleware applying the access state machine to page routes.
///
/// Session claims are resolved fail-open: any verification failure reads as
/// an absent token and lands on the login redirect. With
/// `TASTY_UNSAFE_NO_AUTH` the guard is disabled entirely.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    if state.config.unsafe_no_auth || !is_guarded(&path) {
        return next.run(request).await;
    }

    let claims = state
        .config
        .auth_secret
        .as_deref()
        .and_then(|secret| claims_from_headers(request.headers(), secret));

    match evaluate(&path, claims.as_ref()) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::Redirect(target) => {
            debug!(path = %path, target = %target, "Request redirected");
            Redirect::temporary(&target).into_response()
        }
    }
}
