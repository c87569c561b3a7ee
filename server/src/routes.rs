//! HTTP route handlers for the Tasty gateway.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /api/notification` - Validate and broadcast a notification
//! - `GET /api/socket` - Bootstrap the channel server / WebSocket upgrade
//! - `GET /api/auth/session` - Session token inspection
//! - `GET /health` - Health check endpoint
//!
//! plus the minimal page routes (`/`, `/admin`, `/login`) the route guard
//! protects.
//!
//! All routes share application state through [`AppState`]: the parsed
//! configuration and the channel registry, both owned by the composition
//! root and cloned per request handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ws::WebSocket, DefaultBodyLimit, FromRequestParts, Request, State, WebSocketUpgrade},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::auth::verify_api_key;
use crate::broadcast::NotificationBroadcaster;
use crate::config::Config;
use crate::error::ServerError;
use crate::middleware::route_guard;
use crate::registry::{ChannelConfig, ChannelRegistry};
use crate::session::claims_from_headers;
use crate::types::NotificationRecord;

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the broadcast shared secret.
const HEADER_API_KEY: &str = "x-api-key";

/// Path the notification channel is served on.
const SOCKET_PATH: &str = "/api/socket";

/// Maximum body size for notification submission (1 MB).
const MAX_BODY_SIZE: usize = 1024 * 1024;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Registry holding the single channel server handle.
    pub registry: ChannelRegistry,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates a new application state with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: ChannelRegistry::new(),
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("registry", &self.registry)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// The route guard wraps every route but only evaluates `/` and `/admin`
/// descendants; API paths bypass it. CORS is derived from the configured
/// environment's origin allow-list.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(get_index))
        .route("/admin", get(get_admin))
        .route("/admin/{*rest}", get(get_admin))
        .route("/login", get(get_login))
        .route("/health", get(get_health))
        .route("/api/notification", post(post_notification))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .route("/api/socket", get(get_socket))
        .route("/api/auth/session", get(get_session))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            route_guard,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the CORS layer from the environment's origin allow-list.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_API_KEY)])
        .allow_credentials(true)
}

// ============================================================================
// Error Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Maps a [`ServerError`] to its HTTP representation.
///
/// Server-side failures are reported as a generic 500 without leaking
/// internals; client-side failures carry their message.
fn error_response(err: &ServerError) -> Response {
    let (status, message) = match err {
        ServerError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        ServerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        _ => {
            error!(error = %err, "Request failed unexpectedly");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse::new(message))).into_response()
}

// ============================================================================
// POST /api/notification - Notification Broadcast
// ============================================================================

/// Request body for notification submission.
#[derive(Debug, Deserialize)]
struct NotificationRequest {
    message: Option<String>,
    #[serde(default)]
    data: Option<HashMap<String, Value>>,
}

/// Response body for a successful broadcast.
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    /// Always true on the 200 path.
    pub success: bool,

    /// The record that was fanned out.
    pub notification: NotificationRecord,
}

/// POST /api/notification - Validate and broadcast a notification.
///
/// # Authentication
///
/// Requires the configured shared secret in the `x-api-key` header unless
/// `TASTY_UNSAFE_NO_AUTH` is enabled.
///
/// # Responses
///
/// - `200 OK` - `{ "success": true, "notification": { ... } }`
/// - `400 Bad Request` - missing or malformed `message`
/// - `401 Unauthorized` - wrong or missing key
/// - `500 Internal Server Error` - unexpected processing failure
///
/// The endpoint reports success even when no client was connected to
/// receive the record; delivery is fire-and-forget.
async fn post_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process_notification(&state, &headers, &body) {
        Ok(record) => (
            StatusCode::OK,
            Json(NotificationResponse {
                success: true,
                notification: record,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Validates the request and performs the broadcast.
fn process_notification(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<NotificationRecord, ServerError> {
    if !state.config.unsafe_no_auth {
        let expected = state
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ServerError::internal("broadcast api key not configured"))?;

        let provided = headers.get(HEADER_API_KEY).and_then(|v| v.to_str().ok());
        verify_api_key(provided, expected).map_err(|err| {
            debug!(error = %err, "Broadcast caller rejected");
            ServerError::auth("Unauthorized")
        })?;
    }

    let request: NotificationRequest = serde_json::from_slice(body)
        .map_err(|err| ServerError::validation(format!("invalid notification payload: {err}")))?;

    let message = request
        .message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ServerError::validation("message is required"))?;

    let record = NotificationRecord::new(message, request.data.unwrap_or_default());

    // Fire-and-forget: a missing channel server is logged inside the
    // registry and the caller still sees success.
    let receivers = state.registry.broadcast(record.clone());
    info!(receivers, message = %record.message, "Notification broadcast");

    Ok(record)
}

// ============================================================================
// GET /api/socket - Channel Bootstrap + WebSocket
// ============================================================================

/// GET /api/socket - Bootstrap the channel server, upgrading if requested.
///
/// A plain GET creates the channel server if absent and returns a text
/// confirmation. A WebSocket upgrade request additionally joins the caller
/// to the notification stream. Creation is idempotent: repeat calls observe
/// the handle built by the first one, whatever configuration they carry.
async fn get_socket(State(state): State<AppState>, req: Request) -> Response {
    let server = state.registry.create(ChannelConfig::for_environment(
        SOCKET_PATH,
        state.config.environment,
    ));

    let (mut parts, _body) = req.into_parts();
    let ws = WebSocketUpgrade::from_request_parts(&mut parts, &state)
        .await
        .ok();

    match ws {
        Some(upgrade) => {
            let broadcaster = server.broadcaster().clone();
            upgrade.on_upgrade(move |socket| handle_socket(socket, broadcaster))
        }
        None => (StatusCode::OK, "Notification channel ready").into_response(),
    }
}

/// Handles an established WebSocket connection.
///
/// Subscribes to the broadcaster and forwards every record to the client as
/// a JSON text message. Connect and disconnect are logged per client id; no
/// other behavior is attached to the connection lifecycle.
async fn handle_socket(socket: WebSocket, broadcaster: NotificationBroadcaster) {
    use axum::extract::ws::Message;
    use futures_util::{SinkExt, StreamExt};

    let client_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let mut notification_rx = broadcaster.subscribe();

    info!(client_id = %client_id, "Client connected");

    // Forward broadcast records to the client.
    let forward_task = tokio::spawn(async move {
        loop {
            match notification_rx.recv().await {
                Ok(record) => match serde_json::to_string(&record) {
                    Ok(json) => {
                        if let Err(err) = sender.send(Message::Text(json.into())).await {
                            debug!(error = %err, "Failed to send notification to client");
                            break;
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "Failed to serialize notification");
                    }
                },
                Err(RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Client lagged, skipped notifications");
                }
                Err(RecvError::Closed) => {
                    debug!("Notification broadcaster closed");
                    break;
                }
            }
        }
    });

    // No client-to-server message contract beyond close and ping.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => {
                debug!(client_id = %client_id, "Client sent close frame");
                break;
            }
            Ok(Message::Ping(data)) => {
                // axum answers pongs automatically
                trace!(data_len = data.len(), "Received ping");
            }
            Ok(_) => {}
            Err(err) => {
                debug!(client_id = %client_id, error = %err, "WebSocket error");
                break;
            }
        }
    }

    forward_task.abort();
    info!(client_id = %client_id, "Client disconnected");
}

// ============================================================================
// GET /api/auth/session - Session Inspection
// ============================================================================

/// Response body for a valid session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: crate::session::SessionClaims,
}

/// GET /api/auth/session - Report the caller's session claims.
///
/// API surface, not page surface: an absent or invalid token yields 401
/// rather than a redirect.
async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let claims = state
        .config
        .auth_secret
        .as_deref()
        .and_then(|secret| claims_from_headers(&headers, secret));

    match claims {
        Some(claims) => (
            StatusCode::OK,
            Json(SessionResponse {
                authenticated: true,
                user: claims,
            }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response(),
    }
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of connected notification subscribers.
    pub connections: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint. No authentication required.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state
        .registry
        .current()
        .map_or(0, |server| server.subscriber_count());

    Json(HealthResponse {
        status: "ok".to_string(),
        connections,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Page routes
// ============================================================================

async fn get_index() -> Html<&'static str> {
    Html("<h1>Tasty Creative</h1>")
}

async fn get_admin() -> Html<&'static str> {
    Html("<h1>Tasty Creative - Admin</h1>")
}

async fn get_login() -> Html<&'static str> {
    Html("<h1>Sign in to Tasty Creative</h1>")
}

// ============================================================================
// Tests
// ============================================================================
