//! References to other resources.
//!
//! A reference is either already resolved (it carries the target's
//! server-assigned id) or symbolic (it carries the target's natural
//! key). Drafts arrive with symbolic references; the engine rewrites
//! them to resolved ones before anything is written.

use crate::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to another resource: a resolved `id` or a symbolic `key`.
///
/// Serializes as a one-field object, `{"id": …}` or `{"key": …}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    #[serde(rename = "id")]
    Id(ResourceId),
    #[serde(rename = "key")]
    Key(String),
}

impl Reference {
    /// Creates a resolved reference.
    #[must_use]
    pub const fn by_id(id: ResourceId) -> Self {
        Self::Id(id)
    }

    /// Creates a symbolic reference.
    #[must_use]
    pub fn by_key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// The resolved id, if this reference has one.
    #[must_use]
    pub const fn as_id(&self) -> Option<ResourceId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Key(_) => None,
        }
    }

    /// The symbolic key, if this reference still carries one.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Key(key) => Some(key),
        }
    }

    /// True once the reference carries a resolved id.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Id(_))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Key(key) => write!(f, "key:{key}"),
        }
    }
}
