//! Custom objects — free-form JSON documents stored per container/key.
//!
//! The engine uses them as its persisted waiting room for drafts whose
//! referenced resources do not exist yet, but the shape is generic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored custom object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObject {
    /// Namespace grouping related objects.
    pub container: String,
    /// Unique within the container.
    pub key: String,
    pub version: u64,
    pub value: serde_json::Value,
    pub last_modified_at: DateTime<Utc>,
}

/// Upsert payload for a custom object. The platform creates or replaces
/// by `(container, key)` without a version check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObjectDraft {
    pub container: String,
    pub key: String,
    pub value: serde_json::Value,
}

impl CustomObjectDraft {
    /// Creates an upsert payload.
    #[must_use]
    pub fn new(
        container: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
            value,
        }
    }
}
