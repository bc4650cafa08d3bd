//! Maintenance sweep for the waiting room.
//!
//! Entries whose dependency never materializes would otherwise sit in the
//! custom-object container forever. The cleanup deletes every entry not
//! modified for a caller-chosen number of days; it is meant to run out of
//! band, not as part of a sync.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use merx_client::{ApiFault, CustomObjectPage, PlatformApi};
use serde::Serialize;
use tracing::{info, warn};

use crate::unresolved::UNRESOLVED_CONTAINER;

/// Default number of entries fetched (and deleted) per page.
const DEFAULT_PAGE_SIZE: u32 = 500;

/// Invoked once per failed deletion or aborted scan.
pub type CleanupErrorCallback = Arc<dyn Fn(&ApiFault) + Send + Sync>;

/// Outcome counters of one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStatistics {
    /// Entries removed, entries already gone included.
    pub deleted: u64,
    /// Entries whose deletion failed.
    pub failed: u64,
}

impl CleanupStatistics {
    /// Renders the human-readable summary line.
    #[must_use]
    pub fn report_message(&self) -> String {
        format!(
            "Summary: {} unresolved-reference records were deleted in total ({} failed to delete).",
            self.deleted, self.failed
        )
    }
}

/// Deletes stale waiting-room entries page by page.
pub struct UnresolvedEntryCleanup {
    api: Arc<dyn PlatformApi>,
    page_size: u32,
    error_callback: Option<CleanupErrorCallback>,
}

impl UnresolvedEntryCleanup {
    #[must_use]
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            page_size: DEFAULT_PAGE_SIZE,
            error_callback: None,
        }
    }

    /// Sets the scan page size; values below 1 are clamped to 1.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the callback invoked for each fault encountered.
    #[must_use]
    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiFault) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Deletes every waiting-room entry not modified in the last `days`
    /// days. Deletions within a page run concurrently; an entry that is
    /// already gone counts as deleted. A scan fault ends the run early
    /// with the counters gathered so far.
    pub async fn cleanup(&self, days: i64) -> CleanupStatistics {
        let cutoff = Utc::now() - Duration::days(days);
        let mut statistics = CleanupStatistics::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self
                .api
                .fetch_custom_objects_page(
                    UNRESOLVED_CONTAINER,
                    Some(cutoff),
                    self.page_size,
                    cursor.as_deref(),
                )
                .await
            {
                Ok(page) => page,
                Err(fault) => {
                    warn!(%fault, "cleanup scan aborted");
                    self.report(&fault);
                    break;
                }
            };
            let CustomObjectPage { results, next } = page;

            let deletions = results.into_iter().map(|object| {
                let api = Arc::clone(&self.api);
                async move {
                    let result = api
                        .delete_custom_object(UNRESOLVED_CONTAINER, &object.key)
                        .await;
                    (object.key, result)
                }
            });
            for (key, result) in join_all(deletions).await {
                match result {
                    Ok(_) => statistics.deleted += 1,
                    Err(fault) => {
                        warn!(%key, %fault, "failed to delete waiting-room entry");
                        self.report(&fault);
                        statistics.failed += 1;
                    }
                }
            }

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            deleted = statistics.deleted,
            failed = statistics.failed,
            "waiting-room cleanup finished"
        );
        statistics
    }

    fn report(&self, fault: &ApiFault) {
        if let Some(callback) = &self.error_callback {
            callback(fault);
        }
    }
}
