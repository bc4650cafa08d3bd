//! Batch orchestration over the whole pipeline.
//!
//! A run splits the input into bounded batches and drives each through
//! validation, reference resolution, planning and writing. Batches run
//! sequentially; drafts inside a batch run concurrently. Nothing escapes
//! a run as an error: every fault is folded into the statistics and the
//! caller-supplied callbacks, and the run always produces a snapshot.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use merx_client::PlatformApi;
use merx_types::{Category, CategoryDraft, ResourceKind};
use tracing::{debug, info, warn};

use crate::cache::IdentityCache;
use crate::error::SyncError;
use crate::options::SyncOptions;
use crate::planner::{MutationPlanner, Plan};
use crate::resolver::{ReferenceResolver, Resolution};
use crate::stats::{StatisticsSnapshot, SyncStatistics};
use crate::unresolved::{UnresolvedReferenceStore, WaitingToBeResolved};
use crate::validator::BatchValidator;
use crate::writer::{WriteCoordinator, WriteOutcome};

/// Reconciles batches of category drafts against the platform.
///
/// The struct is cheap to keep around; per-run state (statistics and the
/// identity cache) is created inside [`CategorySync::sync`] so one
/// instance can serve many runs without carrying stale identities over.
pub struct CategorySync {
    api: Arc<dyn PlatformApi>,
    store: UnresolvedReferenceStore,
    options: Arc<SyncOptions>,
}

impl CategorySync {
    pub fn new(api: Arc<dyn PlatformApi>, options: SyncOptions) -> Self {
        Self {
            store: UnresolvedReferenceStore::new(Arc::clone(&api)),
            api,
            options: Arc::new(options),
        }
    }

    /// Syncs `drafts` and returns the run's statistics.
    ///
    /// After a batch settles drafts, the waiting room is checked: entries
    /// whose missing references now exist re-enter the pipeline as an
    /// extra batch, each entry at most once per run. A chain of parked
    /// drafts therefore drains fully in the run that creates its tail.
    pub async fn sync(&self, drafts: Vec<CategoryDraft>) -> StatisticsSnapshot {
        let statistics = Arc::new(SyncStatistics::new());
        let cache = Arc::new(IdentityCache::new(self.options.cache_capacity));
        let mut reattempted: HashSet<String> = HashSet::new();

        info!(
            drafts = drafts.len(),
            batch_size = self.options.batch_size,
            "category sync started"
        );

        for (index, chunk) in drafts.chunks(self.options.batch_size.max(1)).enumerate() {
            debug!(batch = index, size = chunk.len(), "processing batch");
            let mut batch = chunk.to_vec();
            while !batch.is_empty() {
                let settled = self.run_batch(batch, &cache, &statistics).await;
                self.clear_settled_entries(&settled, &statistics).await;
                batch = self
                    .collect_reattempts(&settled, &statistics, &mut reattempted)
                    .await;
            }
        }

        info!("{}", statistics.report_message());
        statistics.snapshot()
    }

    /// Runs one batch through the pipeline and returns the keys of drafts
    /// that now exist remotely (created, updated or found unchanged).
    async fn run_batch(
        &self,
        batch: Vec<CategoryDraft>,
        cache: &Arc<IdentityCache>,
        statistics: &Arc<SyncStatistics>,
    ) -> Vec<String> {
        let validator = BatchValidator::new(Arc::clone(&self.options), Arc::clone(statistics));
        let (valid, referenced) = validator.validate_and_collect(batch);
        if valid.is_empty() {
            return Vec::new();
        }

        let keys: Vec<String> = valid.iter().map(|draft| draft.key.clone()).collect();
        let existing_by_key: HashMap<String, Category> =
            match self.api.fetch_categories_by_keys(&keys).await {
                Ok(categories) => categories
                    .into_iter()
                    .map(|category| (category.key.clone(), category))
                    .collect(),
                Err(fault) => {
                    let error = SyncError::from(fault);
                    let message = format!(
                        "Failed to fetch existing categories with keys: '[{}]'. Reason: {error}",
                        keys.join(", ")
                    );
                    warn!("{message}");
                    for draft in &valid {
                        statistics.record_failure(&message, Some(&draft.key));
                        self.options.report_error(&error, Some(draft));
                    }
                    return Vec::new();
                }
            };

        // The bulk fetch already told us these ids; no need to ask again
        // when a sibling draft references one of them.
        for category in existing_by_key.values() {
            cache.insert(ResourceKind::Category, &category.key, category.id);
        }

        let pipeline = Pipeline {
            resolver: ReferenceResolver::new(
                Arc::clone(&self.api),
                Arc::clone(cache),
                Arc::clone(&self.options),
            ),
            planner: MutationPlanner::new(Arc::clone(&self.options)),
            writer: WriteCoordinator::new(Arc::clone(&self.api), Arc::clone(&self.options)),
        };
        pipeline.resolver.warm_cache(&referenced).await;

        let tasks = valid.into_iter().map(|draft| {
            let existing = existing_by_key.get(&draft.key).cloned();
            self.sync_one(draft, existing, &pipeline, cache, statistics)
        });
        join_all(tasks).await.into_iter().flatten().collect()
    }

    /// Drives one draft to a terminal state or parks it. Returns the
    /// draft key when the category is known to exist remotely afterwards.
    async fn sync_one(
        &self,
        draft: CategoryDraft,
        existing: Option<Category>,
        pipeline: &Pipeline,
        cache: &IdentityCache,
        statistics: &SyncStatistics,
    ) -> Option<String> {
        let draft_key = draft.key.clone();
        // Parked entries must keep their symbolic references, so hold on
        // to the pre-resolution draft.
        let original = draft.clone();

        let resolved = match pipeline.resolver.resolve(draft).await {
            Ok(Resolution::Resolved(resolved)) => resolved,
            Ok(Resolution::Deferred { missing }) => {
                self.park(original, missing, statistics).await;
                return None;
            }
            Err(error) => {
                let message = match &error {
                    SyncError::Validation(_) | SyncError::ReferenceResolution(_) => {
                        error.to_string()
                    }
                    _ => format!(
                        "Failed to process the CategoryDraft with key:'{draft_key}'. Reason: {error}"
                    ),
                };
                warn!("{message}");
                statistics.record_failure(&message, Some(&draft_key));
                self.options.report_error(&error, Some(&original));
                return None;
            }
        };

        let plan = match pipeline.planner.plan(existing.as_ref(), &resolved) {
            Ok(plan) => plan,
            Err(error) => {
                statistics.record_failure(&error.to_string(), Some(&draft_key));
                self.options.report_error(&error, Some(&original));
                return None;
            }
        };

        let outcome = match plan {
            Plan::Create => pipeline.writer.create(&resolved).await,
            Plan::NoChange => Ok(WriteOutcome::Unchanged),
            Plan::Update(actions) => match &existing {
                Some(existing) => pipeline.writer.update(existing, &resolved, actions).await,
                None => Ok(WriteOutcome::Unchanged),
            },
        };

        match outcome {
            Ok(WriteOutcome::Created(category)) => {
                debug!(key = %category.key, "created category");
                cache.insert(ResourceKind::Category, &category.key, category.id);
                statistics.record_created();
                Some(draft_key)
            }
            Ok(WriteOutcome::Updated(category)) => {
                debug!(key = %category.key, version = category.version, "updated category");
                cache.insert(ResourceKind::Category, &category.key, category.id);
                statistics.record_updated();
                Some(draft_key)
            }
            Ok(WriteOutcome::Unchanged) => {
                statistics.record_unchanged();
                Some(draft_key)
            }
            Ok(WriteOutcome::Skipped) => {
                // A cancelled create leaves nothing behind; do not treat
                // the key as existing.
                statistics.record_unchanged();
                None
            }
            Err(error) => {
                let message = if existing.is_some() {
                    format!("Failed to update Category with key: '{draft_key}'. Reason: {error}")
                } else {
                    format!("Failed to create Category with key: '{draft_key}'. Reason: {error}")
                };
                warn!("{message}");
                statistics.record_failure(&message, Some(&draft_key));
                self.options.report_error(&error, Some(&original));
                None
            }
        }
    }

    /// Parks a draft in the waiting room. A failed save is reported but
    /// does not turn the deferral into a failure.
    async fn park(
        &self,
        draft: CategoryDraft,
        missing: BTreeSet<String>,
        statistics: &SyncStatistics,
    ) {
        debug!(key = %draft.key, ?missing, "parking draft until its referenced resources exist");
        statistics.record_deferred(&draft.key, &missing);
        let entry = WaitingToBeResolved::new(draft, missing);
        if let Err(error) = self.store.save(&entry).await {
            let message = format!(
                "Failed to save unresolved-reference record with key: '{}'. Reason: {error}",
                entry.key()
            );
            warn!("{message}");
            self.options
                .report_error(&SyncError::Store(message), Some(&entry.draft));
        }
    }

    /// Deletes waiting-room entries for drafts that now exist remotely.
    /// With nothing settled this issues no request at all.
    async fn clear_settled_entries(&self, settled: &[String], statistics: &SyncStatistics) {
        let entries = match self.store.fetch(settled).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "failed to look up waiting-room entries for settled drafts");
                return;
            }
        };
        for entry in entries {
            statistics.clear_deferred(entry.key());
            if let Err(error) = self.store.delete(entry.key()).await {
                let message = format!(
                    "Failed to delete unresolved-reference record with key: '{}'. Reason: {error}",
                    entry.key()
                );
                warn!("{message}");
                self.options
                    .report_error(&SyncError::Store(message), Some(&entry.draft));
            }
        }
    }

    /// Scans the waiting room for entries unblocked by the keys settled
    /// in the last batch. Each entry re-enters at most once per run.
    async fn collect_reattempts(
        &self,
        settled: &[String],
        statistics: &SyncStatistics,
        reattempted: &mut HashSet<String>,
    ) -> Vec<CategoryDraft> {
        if settled.is_empty() {
            return Vec::new();
        }
        let entries = match self.store.fetch_all().await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "failed to scan the waiting room for ready drafts");
                return Vec::new();
            }
        };
        let settled: HashSet<&str> = settled.iter().map(String::as_str).collect();
        let mut ready = Vec::new();
        for entry in entries {
            let unblocked = entry
                .missing_referenced_keys
                .iter()
                .any(|key| settled.contains(key.as_str()));
            if !unblocked || !reattempted.insert(entry.key().to_string()) {
                continue;
            }
            debug!(key = %entry.key(), "re-attempting parked draft");
            statistics.clear_deferred(entry.key());
            ready.push(entry.draft);
        }
        if !ready.is_empty() {
            info!(
                drafts = ready.len(),
                "re-entering parked drafts whose references now exist"
            );
        }
        ready
    }
}

/// The per-batch stages, built fresh for every batch.
struct Pipeline {
    resolver: ReferenceResolver,
    planner: MutationPlanner,
    writer: WriteCoordinator,
}
