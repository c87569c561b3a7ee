//! Integration tests for the route access guard.
//!
//! Exercises the full router with real signed session tokens: every
//! combination of path class and token state from the access state machine,
//! plus the bypass behavior for paths outside the guard's matcher.

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, COOKIE, LOCATION};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use tasty_server::config::{Config, Environment};
use tasty_server::routes::{create_router, AppState};
use tasty_server::session::{issue_session_token, SessionClaims, SESSION_COOKIE};

const AUTH_SECRET: &str = "integration-auth-secret";

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config() -> Config {
    Config {
        auth_secret: Some(AUTH_SECRET.to_string()),
        api_key: Some("integration-api-key".to_string()),
        environment: Environment::Development,
        port: 0,
        unsafe_no_auth: false,
    }
}

fn make_app() -> Router {
    create_router(AppState::new(test_config()))
}

fn signed_token(sub: &str, is_admin: bool, exp_offset_secs: i64) -> String {
    let claims = SessionClaims {
        sub: sub.to_string(),
        is_admin,
        exp: Utc::now().timestamp() + exp_offset_secs,
    };
    issue_session_token(&claims, AUTH_SECRET).unwrap()
}

async fn get_with_cookie(app: Router, uri: &str, cookie: Option<String>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn admin_cookie() -> String {
    format!("{SESSION_COOKIE}={}", signed_token("admin-1", true, 3600))
}

fn member_cookie() -> String {
    format!("{SESSION_COOKIE}={}", signed_token("member-1", false, 3600))
}

// ============================================================================
// Root path
// ============================================================================

#[tokio::test]
async fn root_without_token_redirects_to_login_without_callback() {
    let response = get_with_cookie(make_app(), "/", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/login");
}

#[tokio::test]
async fn root_with_member_token_is_allowed() {
    let response = get_with_cookie(make_app(), "/", Some(member_cookie())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn root_with_admin_token_is_allowed() {
    let response = get_with_cookie(make_app(), "/", Some(admin_cookie())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Admin paths
// ============================================================================

#[tokio::test]
async fn admin_without_token_redirects_with_exact_callback_path() {
    for path in ["/admin", "/admin/models", "/admin/models/42/edit"] {
        let response = get_with_cookie(make_app(), path, None).await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[LOCATION],
            format!("/login?callbackUrl={path}").as_str(),
            "callback must preserve the original path for {path}"
        );
    }
}

#[tokio::test]
async fn admin_with_member_token_redirects_to_root() {
    let response = get_with_cookie(make_app(), "/admin/models", Some(member_cookie())).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/");
}

#[tokio::test]
async fn admin_with_admin_token_is_allowed() {
    let response = get_with_cookie(make_app(), "/admin/models", Some(admin_cookie())).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Token failure modes read as absent
// ============================================================================

#[tokio::test]
async fn expired_token_redirects_like_no_token() {
    let cookie = format!(
        "{SESSION_COOKIE}={}",
        signed_token("admin-1", true, -3600) // expired an hour ago
    );
    let response = get_with_cookie(make_app(), "/admin/models", Some(cookie)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[LOCATION],
        "/login?callbackUrl=/admin/models"
    );
}

#[tokio::test]
async fn tampered_token_redirects_like_no_token() {
    let claims = SessionClaims {
        sub: "admin-1".to_string(),
        is_admin: true,
        exp: Utc::now().timestamp() + 3600,
    };
    let foreign = issue_session_token(&claims, "some-other-secret").unwrap();
    let cookie = format!("{SESSION_COOKIE}={foreign}");

    let response = get_with_cookie(make_app(), "/", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "/login");
}

#[tokio::test]
async fn garbage_cookie_redirects_like_no_token() {
    let cookie = format!("{SESSION_COOKIE}=definitely-not-a-jwt");
    let response = get_with_cookie(make_app(), "/", Some(cookie)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

// ============================================================================
// Bearer tokens
// ============================================================================

#[tokio::test]
async fn bearer_token_satisfies_the_guard() {
    let response = make_app()
        .oneshot(
            Request::builder()
                .uri("/admin/models")
                .header(
                    AUTHORIZATION,
                    format!("Bearer {}", signed_token("admin-1", true, 3600)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Matcher bypass
// ============================================================================

#[tokio::test]
async fn unguarded_paths_never_redirect() {
    for uri in ["/login", "/health", "/api/socket", "/api/auth/session"] {
        let response = get_with_cookie(make_app(), uri, None).await;

        assert_ne!(
            response.status(),
            StatusCode::TEMPORARY_REDIRECT,
            "{uri} must bypass the guard entirely"
        );
    }
}
