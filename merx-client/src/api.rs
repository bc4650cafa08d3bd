//! Platform API abstraction.
//!
//! The reconciliation engine talks to the platform only through this
//! trait, so tests and alternative transports can stand in for the
//! HTTP client.

use crate::error::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use merx_types::{
    Category, CategoryDraft, CategoryUpdateAction, CustomObject, CustomObjectDraft, ResourceId,
    ResourceKind,
};
use std::collections::HashMap;

/// One page of custom objects, with the cursor for the next page.
#[derive(Debug, Clone)]
pub struct CustomObjectPage {
    pub results: Vec<CustomObject>,
    pub next: Option<String>,
}

/// Remote operations the engine consumes.
///
/// Every call returns a classified fault on failure; see
/// [`crate::ApiFault`]. Implementations must be safe to share across
/// concurrent per-draft tasks.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Fetches every category whose key is in `keys`. Missing keys are
    /// simply absent from the result; that is not a fault.
    async fn fetch_categories_by_keys(&self, keys: &[String]) -> ApiResult<Vec<Category>>;

    /// Fetches a single category by key. `Ok(None)` when it does not exist.
    async fn fetch_category_by_key(&self, key: &str) -> ApiResult<Option<Category>>;

    /// Bulk key→id lookup used to warm the identity cache: one round
    /// trip per kind per batch. Unknown keys are absent from the map.
    async fn fetch_ids_by_keys(
        &self,
        kind: ResourceKind,
        keys: &[String],
    ) -> ApiResult<HashMap<String, ResourceId>>;

    /// Creates a category from a fully resolved draft.
    async fn create_category(&self, draft: &CategoryDraft) -> ApiResult<Category>;

    /// Applies `actions` to the category, guarded by `version`.
    /// A stale version yields [`crate::ApiFault::Conflict`].
    async fn update_category(
        &self,
        id: ResourceId,
        version: u64,
        actions: &[CategoryUpdateAction],
    ) -> ApiResult<Category>;

    /// Creates a minimal resource of `kind` with the given key and a
    /// kind-appropriate default body. Used by the auto-create
    /// reference policy.
    async fn ensure_resource(&self, kind: ResourceKind, key: &str) -> ApiResult<ResourceId>;

    /// Creates or replaces a custom object by `(container, key)`.
    async fn upsert_custom_object(&self, draft: &CustomObjectDraft) -> ApiResult<CustomObject>;

    /// Fetches the custom objects in `container` whose key is in `keys`.
    async fn fetch_custom_objects(
        &self,
        container: &str,
        keys: &[String],
    ) -> ApiResult<Vec<CustomObject>>;

    /// Fetches one page of a container scan, oldest-modified filtering
    /// optional. Drives both the waiting-room sweep and cleanup.
    async fn fetch_custom_objects_page(
        &self,
        container: &str,
        modified_before: Option<DateTime<Utc>>,
        limit: u32,
        cursor: Option<&str>,
    ) -> ApiResult<CustomObjectPage>;

    /// Deletes a custom object. `Ok(None)` when it was already gone.
    async fn delete_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> ApiResult<Option<CustomObject>>;
}
