//! Tasty gateway - Main entry point.
//!
//! This binary starts the Tasty Creative gateway with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`tasty_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Development mode (no auth)
//! TASTY_UNSAFE_NO_AUTH=true cargo run --bin tasty-server
//!
//! # Production mode
//! TASTY_AUTH_SECRET="token-secret" \
//! TASTY_API_KEY="broadcast-key" \
//! TASTY_ENV=production \
//! PORT=8080 \
//! cargo run --release --bin tasty-server
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use tasty_server::config::Config;
use tasty_server::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Required environment variables (when auth enabled):");
            eprintln!("  TASTY_AUTH_SECRET     - HS256 key verifying session tokens");
            eprintln!("  TASTY_API_KEY         - Shared secret for the notification endpoint");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  TASTY_ENV             - 'production' or 'development' (default)");
            eprintln!("  PORT                  - HTTP server port (default: 8080)");
            eprintln!("  RUST_LOG              - Log level filter (default: info)");
            eprintln!("  TASTY_UNSAFE_NO_AUTH  - Disable auth (dev only, set to 'true')");
            return ExitCode::from(1);
        }
    };

    let auth_mode = if config.unsafe_no_auth {
        "disabled (UNSAFE)"
    } else {
        "enabled"
    };
    info!(
        port = config.port,
        auth_mode = auth_mode,
        environment = ?config.environment,
        "Tasty gateway starting"
    );

    let state = AppState::new(config.clone());
    let app = create_router(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON-formatted output with environment-based log level filtering via
/// `RUST_LOG`, defaulting to `info`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Creates a future that resolves when a shutdown signal is received.
///
/// Listens for SIGTERM (container orchestrator shutdown) and SIGINT
/// (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
