//! Run statistics.
//!
//! Counters are atomic so worker tasks can record outcomes without
//! coordination; the cause maps sit behind plain mutexes. `processed`
//! counts terminal outcomes only, so at any quiescent point
//! `processed == created + updated + unchanged + failed`. A deferred
//! draft has no terminal outcome yet: `deferred` is the number of
//! drafts currently parked, not a cumulative total.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Mutable statistics for one sync run.
#[derive(Debug)]
pub struct SyncStatistics {
    processed: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    unchanged: AtomicU64,
    failed: AtomicU64,
    deferred: AtomicU64,
    /// Failure message → keys of the drafts it affected.
    failure_causes: Mutex<BTreeMap<String, BTreeSet<String>>>,
    /// Missing referenced key → keys of the drafts waiting on it.
    missing_dependencies: Mutex<BTreeMap<String, BTreeSet<String>>>,
    started_at: Instant,
}

impl Default for SyncStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatistics {
    /// Creates empty statistics, starting the clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            created: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            unchanged: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            failure_causes: Mutex::new(BTreeMap::new()),
            missing_dependencies: Mutex::new(BTreeMap::new()),
            started_at: Instant::now(),
        }
    }

    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, message: &str, draft_key: Option<&str>) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.causes()
            .entry(message.to_string())
            .or_default()
            .insert(draft_key.unwrap_or("<no key>").to_string());
    }

    /// Parks a draft: it is waiting on every key in `missing`.
    pub(crate) fn record_deferred(&self, draft_key: &str, missing: &BTreeSet<String>) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
        let mut waiting = self.waiting();
        for missing_key in missing {
            waiting
                .entry(missing_key.clone())
                .or_default()
                .insert(draft_key.to_string());
        }
    }

    /// Un-parks a draft before it re-enters the pipeline, or once it has
    /// settled. Decrements the gauge only when this run counted the draft
    /// as deferred, so the call is idempotent and safe for entries parked
    /// by previous runs.
    pub(crate) fn clear_deferred(&self, draft_key: &str) {
        let mut was_waiting = false;
        {
            let mut waiting = self.waiting();
            waiting.retain(|_, drafts| {
                was_waiting |= drafts.remove(draft_key);
                !drafts.is_empty()
            });
        }
        if was_waiting {
            self.deferred
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                    d.checked_sub(1)
                })
                .ok();
        }
    }

    fn causes(&self) -> MutexGuard<'_, BTreeMap<String, BTreeSet<String>>> {
        self.failure_causes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn waiting(&self) -> MutexGuard<'_, BTreeMap<String, BTreeSet<String>>> {
        self.missing_dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// An owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            failure_causes: self.causes().clone(),
            missing_dependencies: self.waiting().clone(),
            elapsed: self.started_at.elapsed(),
        }
    }

    /// Convenience for [`StatisticsSnapshot::report_message`].
    #[must_use]
    pub fn report_message(&self) -> String {
        self.snapshot().report_message()
    }
}

/// Immutable, serializable view of one run's statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub deferred: u64,
    /// Failure message → keys of the drafts it affected.
    pub failure_causes: BTreeMap<String, BTreeSet<String>>,
    /// Missing referenced key → keys of the drafts waiting on it.
    pub missing_dependencies: BTreeMap<String, BTreeSet<String>>,
    pub elapsed: Duration,
}

impl StatisticsSnapshot {
    /// One-line human summary of the run.
    #[must_use]
    pub fn report_message(&self) -> String {
        let mut message = format!(
            "Summary: {} categories were processed in total \
             ({} created, {} updated, {} unchanged and {} failed to sync)",
            self.processed, self.created, self.updated, self.unchanged, self.failed
        );
        if self.deferred > 0 {
            message.push_str(&format!(
                "; {} categories are waiting for missing referenced resources",
                self.deferred
            ));
        }
        message.push('.');
        message
    }
}
