//! Tasty gateway - notification hub and route access guard.
//!
//! This crate provides the server component of the Tasty Creative admin
//! dashboard, responsible for:
//! - Broadcasting notifications to connected browser clients in real time
//! - Gating page routes by session token claims
//!
//! # Architecture
//!
//! Notifications flow from an authenticated HTTP caller through the channel
//! registry to every connected WebSocket client, fire-and-forget and without
//! persistent storage. The route guard classifies each page request and
//! either passes it through or redirects, never raising errors to the
//! browser.

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod session;
pub mod types;
