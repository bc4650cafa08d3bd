//! Update actions for categories.
//!
//! An action is the wire form of one computed mutation. Actions are
//! inert — ordering rules (removals before additions, reorder before
//! adds) live in the planner that emits them.

use crate::category::{AssetDraft, AssetSource};
use crate::{LocalizedString, Reference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One update action applied to a category.
///
/// Serialized with an `action` tag, e.g.
/// `{"action": "changeName", "name": {"en": "Shoes"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CategoryUpdateAction {
    ChangeName {
        name: LocalizedString,
    },

    ChangeSlug {
        slug: LocalizedString,
    },

    /// `None` clears the description.
    SetDescription {
        description: Option<LocalizedString>,
    },

    /// Moves the category under a new parent. There is no unset form;
    /// the platform rejects parentless moves for non-root categories.
    ChangeParent {
        parent: Reference,
    },

    ChangeOrderHint {
        order_hint: String,
    },

    /// `None` clears the external id.
    SetExternalId {
        external_id: Option<String>,
    },

    /// Replaces the whole custom fields block; `type_ref: None` removes it.
    SetCustomType {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        type_ref: Option<Reference>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<BTreeMap<String, serde_json::Value>>,
    },

    /// Sets one custom field value; `None` removes the field.
    SetCustomField {
        name: String,
        value: Option<serde_json::Value>,
    },

    RemoveAsset {
        asset_key: String,
    },

    ChangeAssetName {
        asset_key: String,
        name: LocalizedString,
    },

    SetAssetSources {
        asset_key: String,
        sources: Vec<AssetSource>,
    },

    SetAssetTags {
        asset_key: String,
        tags: Vec<String>,
    },

    /// Reorders the surviving assets; the list names every asset key in
    /// its new order.
    ChangeAssetOrder {
        asset_order: Vec<String>,
    },

    AddAsset {
        asset: AssetDraft,
        position: u32,
    },
}
