//! Caller-facing options for a sync run.
//!
//! Options are built once and shared by every batch of a run. Hooks and
//! callbacks are plain `Arc<dyn Fn>` values so callers can capture their
//! own state; they are invoked inline on the worker tasks and must not
//! panic.

use crate::error::SyncError;
use merx_types::{Category, CategoryDraft, CategoryUpdateAction, ResourceKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default number of drafts per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default capacity of the identity cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// What to do when a referenced key does not exist on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReferenceFallback {
    /// The draft fails terminally.
    Fail,
    /// The draft is parked in the waiting room until the target appears.
    Defer,
    /// A minimal resource is created under the missing key, then resolution
    /// proceeds.
    Create,
}

impl MissingReferenceFallback {
    /// The built-in policy for a kind: parents can arrive in a later batch,
    /// everything else is treated as caller error.
    #[must_use]
    pub const fn default_for(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Category => Self::Defer,
            ResourceKind::Type | ResourceKind::Channel => Self::Fail,
        }
    }
}

/// Invoked once per failed draft with the classified error.
pub type ErrorCallback = Arc<dyn Fn(&SyncError, Option<&CategoryDraft>) + Send + Sync>;

/// Invoked for non-fatal anomalies (e.g. a field the platform cannot unset).
pub type WarningCallback = Arc<dyn Fn(&str, Option<&CategoryDraft>) + Send + Sync>;

/// Runs before each create; returning `None` cancels the write.
pub type BeforeCreateHook = Arc<dyn Fn(CategoryDraft) -> Option<CategoryDraft> + Send + Sync>;

/// Runs before each update with the planned actions, the draft and the
/// current remote state; returning `None` cancels the write.
pub type BeforeUpdateHook = Arc<
    dyn Fn(Vec<CategoryUpdateAction>, &CategoryDraft, &Category) -> Option<Vec<CategoryUpdateAction>>
        + Send
        + Sync,
>;

/// Options shared by every batch of a sync run.
#[derive(Clone)]
pub struct SyncOptions {
    /// Drafts per batch; batches run sequentially.
    pub batch_size: usize,
    /// Identity-cache capacity in entries.
    pub cache_capacity: usize,
    fallbacks: HashMap<ResourceKind, MissingReferenceFallback>,
    pub error_callback: Option<ErrorCallback>,
    pub warning_callback: Option<WarningCallback>,
    pub before_create: Option<BeforeCreateHook>,
    pub before_update: Option<BeforeUpdateHook>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fallbacks: HashMap::new(),
            error_callback: None,
            warning_callback: None,
            before_create: None,
            before_update: None,
        }
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("batch_size", &self.batch_size)
            .field("cache_capacity", &self.cache_capacity)
            .field("fallbacks", &self.fallbacks)
            .field("has_error_callback", &self.error_callback.is_some())
            .field("has_warning_callback", &self.warning_callback.is_some())
            .field("has_before_create", &self.before_create.is_some())
            .field("has_before_update", &self.before_update.is_some())
            .finish()
    }
}

impl SyncOptions {
    /// Starts a builder with the defaults.
    #[must_use]
    pub fn builder() -> SyncOptionsBuilder {
        SyncOptionsBuilder {
            options: Self::default(),
        }
    }

    /// The missing-reference policy for a kind, falling back to the
    /// built-in defaults where no override was set.
    #[must_use]
    pub fn fallback_for(&self, kind: ResourceKind) -> MissingReferenceFallback {
        self.fallbacks
            .get(&kind)
            .copied()
            .unwrap_or_else(|| MissingReferenceFallback::default_for(kind))
    }

    pub(crate) fn report_error(&self, error: &SyncError, draft: Option<&CategoryDraft>) {
        if let Some(callback) = &self.error_callback {
            callback(error, draft);
        }
    }

    pub(crate) fn report_warning(&self, message: &str, draft: Option<&CategoryDraft>) {
        if let Some(callback) = &self.warning_callback {
            callback(message, draft);
        }
    }
}

/// Builder for [`SyncOptions`].
#[derive(Debug)]
pub struct SyncOptionsBuilder {
    options: SyncOptions,
}

impl SyncOptionsBuilder {
    /// Sets the batch size; values below 1 are clamped to 1.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.options.batch_size = batch_size.max(1);
        self
    }

    /// Sets the identity-cache capacity; values below 1 are clamped to 1.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.options.cache_capacity = capacity.max(1);
        self
    }

    /// Overrides the missing-reference policy for one kind.
    #[must_use]
    pub fn missing_reference_fallback(
        mut self,
        kind: ResourceKind,
        fallback: MissingReferenceFallback,
    ) -> Self {
        self.options.fallbacks.insert(kind, fallback);
        self
    }

    /// Sets the per-draft error callback.
    #[must_use]
    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncError, Option<&CategoryDraft>) + Send + Sync + 'static,
    {
        self.options.error_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the warning callback.
    #[must_use]
    pub fn warning_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Option<&CategoryDraft>) + Send + Sync + 'static,
    {
        self.options.warning_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the hook applied to each draft before it is created.
    #[must_use]
    pub fn before_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(CategoryDraft) -> Option<CategoryDraft> + Send + Sync + 'static,
    {
        self.options.before_create = Some(Arc::new(hook));
        self
    }

    /// Sets the hook applied to planned actions before each update.
    #[must_use]
    pub fn before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(
                Vec<CategoryUpdateAction>,
                &CategoryDraft,
                &Category,
            ) -> Option<Vec<CategoryUpdateAction>>
            + Send
            + Sync
            + 'static,
    {
        self.options.before_update = Some(Arc::new(hook));
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> SyncOptions {
        self.options
    }
}
