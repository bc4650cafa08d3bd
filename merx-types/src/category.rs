//! Categories, category drafts and their asset sub-entities.
//!
//! `Category` is the remote, versioned shape returned by the platform;
//! `CategoryDraft` is the caller-supplied desired state. The two differ
//! only in the server-assigned fields (`id`, `version`) — everything
//! else is diffed field by field by the planner.

use crate::{LocalizedString, Reference};
use crate::ids::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A category as it exists on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Server-assigned, immutable.
    pub id: ResourceId,
    /// Optimistic-concurrency version; every accepted update increments it.
    pub version: u64,
    /// Natural key, unique per project.
    pub key: String,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    /// Parent category; always resolved (`id` form) on fetched resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<Asset>,
}

/// Desired state for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    /// Natural key; must be non-blank for the draft to be syncable.
    pub key: String,
    pub name: LocalizedString,
    pub slug: LocalizedString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    /// Parent category, usually in symbolic (`key`) form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomFieldsDraft>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetDraft>,
}

impl CategoryDraft {
    /// Creates a draft with the required fields; everything else starts empty.
    #[must_use]
    pub fn new(key: impl Into<String>, name: LocalizedString, slug: LocalizedString) -> Self {
        Self {
            key: key.into(),
            name,
            slug,
            description: None,
            parent: None,
            order_hint: None,
            external_id: None,
            custom: None,
            assets: Vec::new(),
        }
    }

    /// Sets the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: Reference) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: LocalizedString) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the order hint.
    #[must_use]
    pub fn with_order_hint(mut self, order_hint: impl Into<String>) -> Self {
        self.order_hint = Some(order_hint.into());
        self
    }

    /// Sets the external id.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Sets the custom fields block.
    #[must_use]
    pub fn with_custom(mut self, custom: CustomFieldsDraft) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Replaces the asset list.
    #[must_use]
    pub fn with_assets(mut self, assets: Vec<AssetDraft>) -> Self {
        self.assets = assets;
        self
    }
}

/// An asset attached to an existing category.
///
/// Assets are addressed by key in update actions, so the key is the
/// stable sub-identity the planner matches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub key: String,
    pub name: LocalizedString,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<AssetSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Desired state for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDraft {
    pub key: String,
    pub name: LocalizedString,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<AssetSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AssetDraft {
    /// Creates an asset draft with a key and name and no sources or tags.
    #[must_use]
    pub fn new(key: impl Into<String>, name: LocalizedString) -> Self {
        Self {
            key: key.into(),
            name,
            sources: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Adds a source.
    #[must_use]
    pub fn with_source(mut self, source: AssetSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Replaces the tag list.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// One downloadable location of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl AssetSource {
    /// Creates a source pointing at a URI, with no source key.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            key: None,
        }
    }
}

/// Custom fields on an existing category; the type reference is always
/// resolved on fetched resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFields {
    #[serde(rename = "type")]
    pub type_ref: Reference,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Custom fields on a draft; the type reference usually arrives in
/// symbolic (`key`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldsDraft {
    #[serde(rename = "type")]
    pub type_ref: Reference,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl CustomFieldsDraft {
    /// Creates a custom fields block for the given type with no field values.
    #[must_use]
    pub fn of_type(type_ref: Reference) -> Self {
        Self {
            type_ref,
            fields: BTreeMap::new(),
        }
    }

    /// Sets one field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}
