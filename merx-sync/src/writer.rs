//! Write execution with single-shot conflict recovery.
//!
//! The coordinator owns the create/update calls and the one recovery
//! cycle allowed after an optimistic-concurrency conflict: refetch the
//! current remote state by key, replan against it, re-apply the update
//! hook and resubmit once. A second conflict is terminal.

use std::sync::Arc;

use merx_client::{ApiFault, PlatformApi};
use merx_types::{Category, CategoryDraft, CategoryUpdateAction};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::options::SyncOptions;
use crate::planner::{MutationPlanner, Plan};

const RECOVERY_FETCH_FAILED: &str =
    "Failed to fetch from the platform while retrying after concurrency modification.";
const RECOVERY_TARGET_GONE: &str =
    "Not found when attempting to fetch while retrying after concurrency modification.";

/// What happened to one draft's write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The category was created.
    Created(Category),
    /// The category was updated.
    Updated(Category),
    /// Remote state already matched, or the hook left nothing to send.
    Unchanged,
    /// A hook cancelled the write.
    Skipped,
}

/// Executes planned writes against the platform.
pub struct WriteCoordinator {
    api: Arc<dyn PlatformApi>,
    planner: MutationPlanner,
    options: Arc<SyncOptions>,
}

impl WriteCoordinator {
    pub fn new(api: Arc<dyn PlatformApi>, options: Arc<SyncOptions>) -> Self {
        Self {
            planner: MutationPlanner::new(Arc::clone(&options)),
            api,
            options,
        }
    }

    /// Creates the category, unless the `before_create` hook cancels it.
    pub async fn create(&self, draft: &CategoryDraft) -> SyncResult<WriteOutcome> {
        let draft = match &self.options.before_create {
            Some(hook) => match hook(draft.clone()) {
                Some(modified) => modified,
                None => {
                    debug!(key = %draft.key, "create cancelled by hook");
                    return Ok(WriteOutcome::Skipped);
                }
            },
            None => draft.clone(),
        };
        let created = self.api.create_category(&draft).await?;
        Ok(WriteOutcome::Created(created))
    }

    /// Applies `actions` to `existing`, recovering at most once from a
    /// version conflict.
    pub async fn update(
        &self,
        existing: &Category,
        draft: &CategoryDraft,
        actions: Vec<CategoryUpdateAction>,
    ) -> SyncResult<WriteOutcome> {
        if actions.is_empty() {
            return Ok(WriteOutcome::Unchanged);
        }
        let actions = match self.apply_update_hook(actions, draft, existing) {
            Hooked::Cancelled => return Ok(WriteOutcome::Skipped),
            Hooked::Empty => return Ok(WriteOutcome::Unchanged),
            Hooked::Actions(actions) => actions,
        };
        debug!(key = %draft.key, actions = actions.len(), "submitting update");
        match self
            .api
            .update_category(existing.id, existing.version, &actions)
            .await
        {
            Ok(updated) => Ok(WriteOutcome::Updated(updated)),
            Err(ApiFault::Conflict { current_version }) => {
                warn!(
                    key = %draft.key,
                    stale_version = existing.version,
                    current_version = ?current_version,
                    "version conflict, refetching and replanning"
                );
                self.recover_from_conflict(draft).await
            }
            Err(fault) => Err(fault.into()),
        }
    }

    /// One recovery cycle: refetch by key, replan against the fresh
    /// state, resubmit. Any fault on the resubmit is terminal, a second
    /// conflict included.
    async fn recover_from_conflict(&self, draft: &CategoryDraft) -> SyncResult<WriteOutcome> {
        let fresh = match self.api.fetch_category_by_key(&draft.key).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                return Err(SyncError::ConflictRecovery(RECOVERY_TARGET_GONE.to_string()));
            }
            Err(fault) => {
                warn!(key = %draft.key, %fault, "refetch failed during conflict recovery");
                return Err(SyncError::ConflictRecovery(RECOVERY_FETCH_FAILED.to_string()));
            }
        };
        let actions = match self.planner.plan(Some(&fresh), draft)? {
            Plan::Update(actions) => actions,
            // The concurrent write may already have applied our changes.
            _ => return Ok(WriteOutcome::Unchanged),
        };
        let actions = match self.apply_update_hook(actions, draft, &fresh) {
            Hooked::Cancelled => return Ok(WriteOutcome::Skipped),
            Hooked::Empty => return Ok(WriteOutcome::Unchanged),
            Hooked::Actions(actions) => actions,
        };
        debug!(key = %draft.key, actions = actions.len(), "resubmitting update");
        let updated = self
            .api
            .update_category(fresh.id, fresh.version, &actions)
            .await?;
        Ok(WriteOutcome::Updated(updated))
    }

    fn apply_update_hook(
        &self,
        actions: Vec<CategoryUpdateAction>,
        draft: &CategoryDraft,
        existing: &Category,
    ) -> Hooked {
        let actions = match &self.options.before_update {
            Some(hook) => match hook(actions, draft, existing) {
                Some(actions) => actions,
                None => {
                    debug!(key = %draft.key, "update cancelled by hook");
                    return Hooked::Cancelled;
                }
            },
            None => actions,
        };
        if actions.is_empty() {
            Hooked::Empty
        } else {
            Hooked::Actions(actions)
        }
    }
}

enum Hooked {
    Actions(Vec<CategoryUpdateAction>),
    Empty,
    Cancelled,
}
