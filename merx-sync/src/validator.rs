//! Batch validation.
//!
//! Runs before anything touches the network. Invalid drafts are failed
//! terminally (one failure per draft, first problem wins) and never
//! reach the resolver; the keys referenced by the surviving drafts are
//! collected so the identity cache can be warmed in bulk.

use crate::error::SyncError;
use crate::options::SyncOptions;
use crate::stats::SyncStatistics;
use merx_types::{CategoryDraft, Reference, ResourceKind};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Shared with the planner, which re-checks asset keys when it re-plans
/// against refetched state during conflict recovery.
pub(crate) fn duplicate_asset_keys_message(draft_key: &str, asset_key: &str) -> String {
    format!(
        "CategoryDraft with key '{draft_key}' has duplicate asset keys: '{asset_key}'. \
         Asset keys are expected to be unique inside their category."
    )
}

/// Keys referenced by the valid drafts of one batch, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedKeys {
    keys: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl ReferencedKeys {
    fn add(&mut self, kind: ResourceKind, key: &str) {
        self.keys.entry(kind).or_default().insert(key.to_string());
    }

    /// The collected keys for one kind.
    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> Option<&BTreeSet<String>> {
        self.keys.get(&kind)
    }

    /// Iterates over `(kind, keys)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &BTreeSet<String>)> {
        self.keys.iter().map(|(kind, keys)| (*kind, keys))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Validates drafts before they enter the pipeline.
#[derive(Debug)]
pub struct BatchValidator {
    options: Arc<SyncOptions>,
    statistics: Arc<SyncStatistics>,
}

impl BatchValidator {
    pub fn new(options: Arc<SyncOptions>, statistics: Arc<SyncStatistics>) -> Self {
        Self {
            options,
            statistics,
        }
    }

    /// Splits a batch into syncable drafts and the keys they reference.
    ///
    /// Each invalid draft is reported through the error callback and
    /// counted as one terminal failure.
    pub fn validate_and_collect(
        &self,
        drafts: Vec<CategoryDraft>,
    ) -> (Vec<CategoryDraft>, ReferencedKeys) {
        let mut valid = Vec::with_capacity(drafts.len());
        let mut referenced = ReferencedKeys::default();

        for draft in drafts {
            if let Err(message) = validate_draft(&draft) {
                debug!(key = %draft.key, "Draft rejected by validation");
                self.statistics.record_failure(
                    &message,
                    (!is_blank(&draft.key)).then_some(draft.key.as_str()),
                );
                self.options
                    .report_error(&SyncError::Validation(message), Some(&draft));
                continue;
            }

            collect_referenced_keys(&draft, &mut referenced);
            valid.push(draft);
        }

        (valid, referenced)
    }
}

/// Returns the first validation problem of a draft, if any.
fn validate_draft(draft: &CategoryDraft) -> Result<(), String> {
    if is_blank(&draft.key) {
        return Err(format!(
            "CategoryDraft with name: {} doesn't have a key. \
             Please make sure all category drafts have keys.",
            draft.name
        ));
    }

    let mut seen_asset_keys = BTreeSet::new();
    for (position, asset) in draft.assets.iter().enumerate() {
        if is_blank(&asset.key) {
            return Err(format!(
                "AssetDraft at position '{position}' of CategoryDraft with key '{}' \
                 has no key set. Please make sure all asset drafts have keys.",
                draft.key
            ));
        }
        if !seen_asset_keys.insert(asset.key.as_str()) {
            return Err(duplicate_asset_keys_message(&draft.key, &asset.key));
        }
    }

    Ok(())
}

/// Collects the symbolic (key-form, non-blank) references of a draft.
/// Blank reference keys are left for the resolver to fail with a precise
/// message; id-form references need no lookup.
fn collect_referenced_keys(draft: &CategoryDraft, referenced: &mut ReferencedKeys) {
    if let Some(Reference::Key(key)) = &draft.parent {
        if !is_blank(key) {
            referenced.add(ResourceKind::Category, key);
        }
    }
    if let Some(custom) = &draft.custom {
        if let Reference::Key(key) = &custom.type_ref {
            if !is_blank(key) {
                referenced.add(ResourceKind::Type, key);
            }
        }
    }
}
