//! Key → id identity cache.
//!
//! One cache instance lives for one sync run. Entries are keyed by
//! `(kind, key)` and hold a [`OnceCell`] slot so that concurrent lookups
//! for the same key collapse into a single remote call: the first task
//! runs the lookup, the rest await the slot. A failed lookup leaves the
//! slot uninitialized, so a later draft referencing the same key gets a
//! fresh chance instead of a poisoned entry.

use lru::LruCache;
use merx_client::ApiFault;
use merx_types::{ResourceId, ResourceKind};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Option<ResourceId>>>;

/// Bounded cache of resolved resource identities.
#[derive(Debug)]
pub struct IdentityCache {
    entries: Mutex<LruCache<(ResourceKind, String), Slot>>,
}

impl IdentityCache {
    /// Creates a cache holding at most `capacity` entries; capacities
    /// below 1 are clamped to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<(ResourceKind, String), Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a known identity, replacing any previous slot for the key.
    /// Used to warm the cache from bulk lookups and local creates.
    pub fn insert(&self, kind: ResourceKind, key: &str, id: ResourceId) {
        let slot = Arc::new(OnceCell::new_with(Some(Some(id))));
        self.lock().put((kind, key.to_string()), slot);
    }

    /// Records that a key does not exist remotely. Bulk warm-ups store
    /// this for requested-but-absent keys so per-draft resolution does
    /// not re-ask; a later [`insert`](Self::insert) (e.g. after the
    /// resource is created locally) replaces it.
    pub fn insert_absent(&self, kind: ResourceKind, key: &str) {
        let slot = Arc::new(OnceCell::new_with(Some(None)));
        self.lock().put((kind, key.to_string()), slot);
    }

    /// Returns the cached resolution for a key, if one is present and
    /// complete. Does not promote the entry.
    #[must_use]
    pub fn peek(&self, kind: ResourceKind, key: &str) -> Option<Option<ResourceId>> {
        self.lock()
            .peek(&(kind, key.to_string()))
            .and_then(|slot| slot.get().copied())
    }

    /// Resolves a key through the cache, invoking `lookup` at most once
    /// per key across all concurrent callers. `Ok(None)` (the key does
    /// not exist remotely) is cached for the lifetime of the entry;
    /// errors are returned to the caller and cache nothing.
    pub async fn get_or_lookup<F, Fut>(
        &self,
        kind: ResourceKind,
        key: &str,
        lookup: F,
    ) -> Result<Option<ResourceId>, ApiFault>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ResourceId>, ApiFault>>,
    {
        // Take the slot under the lock; await strictly outside it.
        let slot: Slot = {
            let mut entries = self.lock();
            entries
                .get_or_insert((kind, key.to_string()), || Arc::new(OnceCell::new()))
                .clone()
        };

        let resolved = slot.get_or_try_init(lookup).await?;
        Ok(*resolved)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
