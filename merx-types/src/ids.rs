//! Identifier types used throughout the merx core.
//!
//! Resource ids are server-assigned UUIDs; the engine never mints them
//! except in tests. Resource kinds name the families a reference can
//! point at.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Server-assigned identifier of a remote resource.
/// Immutable for the lifetime of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Creates a fresh random resource ID.
    /// Only the platform mints these in production; tests use this freely.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a resource ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a resource ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The resource families a reference can point at.
///
/// `Category` is the synced family itself (parent references are
/// category-to-category); `Type` backs custom field blocks; `Channel`
/// exists only as a reference target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Category,
    Type,
    Channel,
}

impl ResourceKind {
    /// The plural path segment used in API URLs.
    #[must_use]
    pub const fn path_segment(&self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Type => "types",
            Self::Channel => "channels",
        }
    }

    /// Human-readable singular name, used in error messages.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Type => "Type",
            Self::Channel => "Channel",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ResourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" | "categories" => Ok(Self::Category),
            "type" | "types" => Ok(Self::Type),
            "channel" | "channels" => Ok(Self::Channel),
            other => Err(crate::Error::UnknownKind(other.to_string())),
        }
    }
}
