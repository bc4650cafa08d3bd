//! Persisted waiting room for drafts blocked on missing references.
//!
//! Entries are stored as platform custom objects so they survive process
//! restarts: a draft parked in one run is picked up again in a later run
//! once the resource it waits for has been created.

use std::collections::BTreeSet;
use std::sync::Arc;

use merx_client::PlatformApi;
use merx_types::{CategoryDraft, CustomObjectDraft};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// Container holding parked category drafts.
pub const UNRESOLVED_CONTAINER: &str = "merx-sync.unresolved-references.category-drafts";

/// Page size for full-container scans.
const SCAN_PAGE_SIZE: u32 = 500;

/// A parked draft together with the referenced keys it is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingToBeResolved {
    pub draft: CategoryDraft,
    pub missing_referenced_keys: BTreeSet<String>,
}

impl WaitingToBeResolved {
    #[must_use]
    pub fn new(draft: CategoryDraft, missing_referenced_keys: BTreeSet<String>) -> Self {
        Self {
            draft,
            missing_referenced_keys,
        }
    }

    /// Key of the parked draft.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.draft.key
    }
}

/// Custom-object key for a draft key. Hashing keeps arbitrary draft keys
/// inside the platform's key character set and length limit.
fn hash_key(draft_key: &str) -> String {
    hex::encode(Sha256::digest(draft_key.as_bytes()))
}

/// Reads and writes [`WaitingToBeResolved`] entries under
/// [`UNRESOLVED_CONTAINER`].
///
/// Store faults are returned to the caller rather than handled here; the
/// orchestrator treats them as non-fatal and keeps the run going.
pub struct UnresolvedReferenceStore {
    api: Arc<dyn PlatformApi>,
}

impl UnresolvedReferenceStore {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// Parks an entry, replacing any previous record for the same draft.
    pub async fn save(&self, entry: &WaitingToBeResolved) -> SyncResult<()> {
        let value = serde_json::to_value(entry)?;
        let draft = CustomObjectDraft::new(UNRESOLVED_CONTAINER, hash_key(entry.key()), value);
        self.api.upsert_custom_object(&draft).await?;
        Ok(())
    }

    /// Fetches the entries parked for `draft_keys`. Issues no request
    /// when `draft_keys` is empty.
    pub async fn fetch(&self, draft_keys: &[String]) -> SyncResult<Vec<WaitingToBeResolved>> {
        if draft_keys.is_empty() {
            return Ok(Vec::new());
        }
        let hashed: Vec<String> = draft_keys.iter().map(|key| hash_key(key)).collect();
        let objects = self
            .api
            .fetch_custom_objects(UNRESOLVED_CONTAINER, &hashed)
            .await?;
        objects
            .into_iter()
            .map(|object| serde_json::from_value(object.value).map_err(SyncError::from))
            .collect()
    }

    /// Scans the whole container page by page. Entries that fail to
    /// decode are skipped with a warning instead of aborting the scan.
    pub async fn fetch_all(&self) -> SyncResult<Vec<WaitingToBeResolved>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .api
                .fetch_custom_objects_page(
                    UNRESOLVED_CONTAINER,
                    None,
                    SCAN_PAGE_SIZE,
                    cursor.as_deref(),
                )
                .await?;
            for object in page.results {
                match serde_json::from_value::<WaitingToBeResolved>(object.value) {
                    Ok(entry) => entries.push(entry),
                    Err(error) => {
                        warn!(key = %object.key, %error, "skipping undecodable waiting-room entry");
                    }
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(entries)
    }

    /// Removes the entry parked for `draft_key`. Removing an absent entry
    /// is a no-op.
    pub async fn delete(&self, draft_key: &str) -> SyncResult<()> {
        self.api
            .delete_custom_object(UNRESOLVED_CONTAINER, &hash_key(draft_key))
            .await?;
        Ok(())
    }
}
