//! Shared notification types for the Tasty gateway.
//!
//! The wire format keeps caller-supplied attributes at the top level of the
//! JSON object (flattened), so a broadcast built from
//! `{ "message": "hi", "data": { "priority": "high" } }` serializes as
//! `{ "message": "hi", "timestamp": "...", "priority": "high" }`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope fields that caller attributes are never allowed to override.
const RESERVED_FIELDS: &[&str] = &["message", "timestamp"];

/// A single notification fanned out to connected clients.
///
/// Records are immutable once constructed and are never persisted; they
/// exist only for the duration of the broadcast send.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use tasty_server::types::NotificationRecord;
///
/// let record = NotificationRecord::new("deploy finished", HashMap::new());
/// assert_eq!(record.message, "deploy finished");
/// assert!(record.attributes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Human-readable notification text.
    pub message: String,

    /// Creation time, stamped when the record is built.
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied extra fields, merged into the top level of the
    /// serialized object.
    #[serde(flatten)]
    pub attributes: HashMap<String, Value>,
}

impl NotificationRecord {
    /// Builds a record stamped with the current time.
    ///
    /// Attributes named like a reserved envelope field (`message`,
    /// `timestamp`) are dropped so callers cannot overwrite the envelope.
    #[must_use]
    pub fn new(message: impl Into<String>, mut attributes: HashMap<String, Value>) -> Self {
        for field in RESERVED_FIELDS {
            attributes.remove(*field);
        }

        Self {
            message: message.into(),
            timestamp: Utc::now(),
            attributes,
        }
    }
}
