//! Notification channel registry.
//!
//! The registry owns the single channel server handle for the process. It is
//! constructed once at startup and handed to request handlers through the
//! application state, so "at most one instance" holds without any global
//! mutable variable: clones share one [`OnceCell`], and the first creation
//! wins even under concurrent first requests.
//!
//! Creation is idempotent but silent: a second `create` call returns the
//! existing handle and its configuration is ignored. There is no shutdown
//! path; the handle lives until the process exits.

use std::sync::Arc;

use axum::http::Method;
use once_cell::sync::OnceCell;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, error, info};

use crate::broadcast::NotificationBroadcaster;
use crate::config::Environment;
use crate::types::NotificationRecord;

/// Configuration captured when the channel server is created.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// URL path the channel is served on.
    pub path: String,

    /// Browser origins allowed to connect.
    pub allowed_origins: Vec<String>,

    /// HTTP methods allowed on the channel path.
    pub allowed_methods: Vec<Method>,

    /// Whether credentialed cross-origin requests are allowed.
    pub allow_credentials: bool,
}

impl ChannelConfig {
    /// Builds the channel configuration for a deployment environment.
    #[must_use]
    pub fn for_environment(path: impl Into<String>, environment: Environment) -> Self {
        Self {
            path: path.into(),
            allowed_origins: environment
                .allowed_origins()
                .iter()
                .map(|origin| (*origin).to_string())
                .collect(),
            allowed_methods: vec![Method::GET, Method::POST],
            allow_credentials: true,
        }
    }
}

/// The live broadcast server handle: configuration plus fan-out hub.
#[derive(Debug)]
pub struct ChannelServer {
    config: ChannelConfig,
    broadcaster: NotificationBroadcaster,
}

impl ChannelServer {
    fn new(config: ChannelConfig) -> Self {
        info!(
            path = %config.path,
            origins = config.allowed_origins.len(),
            "Notification channel server created"
        );
        Self {
            config,
            broadcaster: NotificationBroadcaster::new(),
        }
    }

    /// The configuration the server was created with.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// The fan-out hub; cloneable for WebSocket connection tasks.
    #[must_use]
    pub fn broadcaster(&self) -> &NotificationBroadcaster {
        &self.broadcaster
    }

    /// Subscribes to records broadcast after this call.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<NotificationRecord> {
        self.broadcaster.subscribe()
    }

    /// Emits a record to every connected client.
    pub fn broadcast(&self, record: NotificationRecord) -> usize {
        self.broadcaster.broadcast(record)
    }

    /// Number of currently connected subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }
}

/// Process-scoped holder of the single channel server handle.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use tasty_server::config::Environment;
/// use tasty_server::registry::{ChannelConfig, ChannelRegistry};
/// use tasty_server::types::NotificationRecord;
///
/// let registry = ChannelRegistry::new();
/// assert!(registry.current().is_none());
///
/// // Broadcasting before creation is a logged no-op.
/// let record = NotificationRecord::new("lost", HashMap::new());
/// assert_eq!(registry.broadcast(record), 0);
///
/// registry.create(ChannelConfig::for_environment(
///     "/api/socket",
///     Environment::Development,
/// ));
/// assert!(registry.current().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<OnceCell<ChannelServer>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking lookup of the current server handle. Never creates.
    #[must_use]
    pub fn current(&self) -> Option<&ChannelServer> {
        self.inner.get()
    }

    /// Creates the channel server if absent, returning the live handle.
    ///
    /// If a handle already exists, it is returned unchanged and the new
    /// configuration is ignored. Under concurrent first calls exactly one
    /// caller's configuration takes effect.
    pub fn create(&self, config: ChannelConfig) -> &ChannelServer {
        let mut created = false;
        let server = self.inner.get_or_init(|| {
            created = true;
            ChannelServer::new(config)
        });

        if !created {
            debug!("Channel server already exists, ignoring new configuration");
        }

        server
    }

    /// Emits a record to every connected client, if the server exists.
    ///
    /// When no server has been created yet the record is dropped: the
    /// failure is logged here and never surfaced to the HTTP caller.
    pub fn broadcast(&self, record: NotificationRecord) -> usize {
        match self.inner.get() {
            Some(server) => server.broadcast(record),
            None => {
                error!("Notification dropped: channel server has not been created");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    fn dev_config(path: &str) -> ChannelConfig {
        ChannelConfig::for_environment(path, Environment::Development)
    }

    fn make_record(message: &str) -> NotificationRecord {
        NotificationRecord::new(message, HashMap::new())
    }

    #[test]
    fn current_is_none_before_creation() {
        let registry = ChannelRegistry::new();
        assert!(registry.current().is_none());
    }

    #[test]
    fn create_stores_the_handle() {
        let registry = ChannelRegistry::new();
        registry.create(dev_config("/api/socket"));

        let server = registry.current().expect("server should exist");
        assert_eq!(server.config().path, "/api/socket");
        assert_eq!(server.subscriber_count(), 0);
    }

    #[test]
    fn create_is_idempotent_and_keeps_first_config() {
        let registry = ChannelRegistry::new();
        registry.create(dev_config("/api/socket"));
        registry.create(ChannelConfig::for_environment(
            "/other/path",
            Environment::Production,
        ));

        let server = registry.current().expect("server should exist");
        assert_eq!(server.config().path, "/api/socket");
        assert_eq!(server.config().allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn clones_share_the_same_cell() {
        let registry = ChannelRegistry::new();
        let clone = registry.clone();

        registry.create(dev_config("/api/socket"));
        assert!(clone.current().is_some());
    }

    #[test]
    fn concurrent_creation_first_writer_wins() {
        let registry = ChannelRegistry::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let path = format!("/socket-{i}");
                    registry.create(dev_config(&path)).config().path.clone()
                })
            })
            .collect();

        let observed: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every thread observed the same single handle.
        let winner = registry.current().unwrap().config().path.clone();
        assert!(observed.iter().all(|path| *path == winner));
    }

    #[test]
    fn broadcast_without_server_drops_silently() {
        let registry = ChannelRegistry::new();
        assert_eq!(registry.broadcast(make_record("lost")), 0);
        assert!(registry.current().is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers_through_registry() {
        let registry = ChannelRegistry::new();
        let server = registry.create(dev_config("/api/socket"));
        let mut rx = server.subscribe();

        let receivers = registry.broadcast(make_record("hi"));
        assert_eq!(receivers, 1);
        assert_eq!(rx.recv().await.unwrap().message, "hi");
    }

    #[test]
    fn for_environment_selects_origin_list() {
        let dev = ChannelConfig::for_environment("/api/socket", Environment::Development);
        assert_eq!(dev.allowed_origins, vec!["http://localhost:3000"]);
        assert!(dev.allow_credentials);
        assert_eq!(dev.allowed_methods, vec![Method::GET, Method::POST]);

        let prod = ChannelConfig::for_environment("/api/socket", Environment::Production);
        assert!(prod
            .allowed_origins
            .contains(&"https://app.tastycreative.com".to_string()));
    }
}
