//! Reference resolution.
//!
//! Drafts arrive with symbolic (key-form) references; the platform only
//! accepts ids. The resolver rewrites each reference through the
//! identity cache, applying the per-kind missing-reference policy when
//! a key has no remote counterpart. The custom type is resolved before
//! the parent so a draft doomed by a terminal type failure never incurs
//! deferral bookkeeping.

use crate::cache::IdentityCache;
use crate::error::{SyncError, SyncResult};
use crate::options::{MissingReferenceFallback, SyncOptions};
use crate::validator::{is_blank, ReferencedKeys};
use merx_client::PlatformApi;
use merx_types::{CategoryDraft, Reference, ResourceId, ResourceKind};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The outcome of resolving one draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every reference is in id form; the draft is ready for planning.
    Resolved(CategoryDraft),
    /// One or more deferrable references have no remote counterpart yet.
    Deferred {
        /// The referenced keys that are missing, in stable order.
        missing: BTreeSet<String>,
    },
}

enum ResolvedRef {
    Found(ResourceId),
    Missing,
}

/// Resolves symbolic references against the platform, through the cache.
pub struct ReferenceResolver {
    api: Arc<dyn PlatformApi>,
    cache: Arc<IdentityCache>,
    options: Arc<SyncOptions>,
    /// Serializes create-on-miss so concurrent drafts sharing a missing
    /// key produce a single create.
    ensure_guard: Mutex<()>,
}

impl ReferenceResolver {
    pub fn new(
        api: Arc<dyn PlatformApi>,
        cache: Arc<IdentityCache>,
        options: Arc<SyncOptions>,
    ) -> Self {
        Self {
            api,
            cache,
            options,
            ensure_guard: Mutex::new(()),
        }
    }

    /// Warms the identity cache with one bulk lookup per referenced kind.
    ///
    /// Keys already cached (including negatively) are not re-requested, so
    /// a key settled in an earlier batch costs nothing here. Keys absent
    /// from the response are negatively cached so per-draft resolution
    /// does not re-ask. A failed bulk lookup leaves its kind's slots
    /// empty; affected drafts then fall back to single lookups.
    pub async fn warm_cache(&self, referenced: &ReferencedKeys) {
        for (kind, keys) in referenced.iter() {
            let keys: Vec<String> = keys
                .iter()
                .filter(|key| self.cache.peek(kind, key).is_none())
                .cloned()
                .collect();
            if keys.is_empty() {
                continue;
            }
            match self.api.fetch_ids_by_keys(kind, &keys).await {
                Ok(ids) => {
                    for key in &keys {
                        match ids.get(key) {
                            Some(id) => self.cache.insert(kind, key, *id),
                            None => self.cache.insert_absent(kind, key),
                        }
                    }
                    debug!(
                        kind = %kind,
                        requested = keys.len(),
                        found = ids.len(),
                        "Warmed identity cache"
                    );
                }
                Err(fault) => {
                    warn!(
                        kind = %kind,
                        error = %fault,
                        "Bulk id lookup failed; falling back to per-draft lookups"
                    );
                }
            }
        }
    }

    /// Rewrites the draft's symbolic references to id form.
    ///
    /// Missing deferrable references are collected across the whole draft
    /// so one pass reports every key it is waiting on.
    pub async fn resolve(&self, draft: CategoryDraft) -> SyncResult<Resolution> {
        let mut resolved = draft;
        let mut missing = BTreeSet::new();
        let draft_key = resolved.key.clone();

        let type_key = match &resolved.custom {
            Some(custom) => match &custom.type_ref {
                Reference::Key(key) => Some(key.clone()),
                Reference::Id(_) => None,
            },
            None => None,
        };
        if let Some(key) = type_key {
            match self
                .resolve_reference(ResourceKind::Type, &key, &draft_key, "custom type")
                .await?
            {
                ResolvedRef::Found(id) => {
                    if let Some(custom) = resolved.custom.as_mut() {
                        custom.type_ref = Reference::by_id(id);
                    }
                }
                ResolvedRef::Missing => {
                    missing.insert(key);
                }
            }
        }

        let parent_key = match &resolved.parent {
            Some(Reference::Key(key)) => Some(key.clone()),
            _ => None,
        };
        if let Some(key) = parent_key {
            match self
                .resolve_reference(ResourceKind::Category, &key, &draft_key, "parent")
                .await?
            {
                ResolvedRef::Found(id) => {
                    resolved.parent = Some(Reference::by_id(id));
                }
                ResolvedRef::Missing => {
                    missing.insert(key);
                }
            }
        }

        if missing.is_empty() {
            Ok(Resolution::Resolved(resolved))
        } else {
            debug!(key = %draft_key, ?missing, "Draft deferred on missing references");
            Ok(Resolution::Deferred { missing })
        }
    }

    async fn resolve_reference(
        &self,
        kind: ResourceKind,
        key: &str,
        draft_key: &str,
        field: &str,
    ) -> SyncResult<ResolvedRef> {
        if is_blank(key) {
            return Err(SyncError::ReferenceResolution(format!(
                "Failed to resolve {field} reference on CategoryDraft with key:'{draft_key}'. \
                 Reason: Reference 'key' field value is blank (null/empty)."
            )));
        }

        let api = Arc::clone(&self.api);
        let lookup_key = key.to_string();
        let looked_up = self
            .cache
            .get_or_lookup(kind, key, || async move {
                let ids = api
                    .fetch_ids_by_keys(kind, std::slice::from_ref(&lookup_key))
                    .await?;
                Ok(ids.get(&lookup_key).copied())
            })
            .await?;

        if let Some(id) = looked_up {
            return Ok(ResolvedRef::Found(id));
        }

        match self.options.fallback_for(kind) {
            MissingReferenceFallback::Fail => Err(SyncError::ReferenceResolution(format!(
                "Failed to resolve {field} reference on CategoryDraft with key:'{draft_key}'. \
                 Reason: {} with key '{key}' doesn't exist.",
                kind.display_name()
            ))),
            MissingReferenceFallback::Defer => Ok(ResolvedRef::Missing),
            MissingReferenceFallback::Create => {
                let _guard = self.ensure_guard.lock().await;
                // A concurrent draft may have created the key while we
                // waited for the guard.
                if let Some(Some(id)) = self.cache.peek(kind, key) {
                    return Ok(ResolvedRef::Found(id));
                }
                let id = self.api.ensure_resource(kind, key).await?;
                self.cache.insert(kind, key, id);
                debug!(kind = %kind, key, %id, "Created missing referenced resource");
                Ok(ResolvedRef::Found(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merx_client::{PlatformClient, PlatformClientConfig};
    use merx_types::{CustomFieldsDraft, LocalizedString};
    use pretty_assertions::assert_eq;

    /// An API pointed at a closed port; tests using it must resolve
    /// entirely from the cache.
    fn unreachable_api() -> Arc<dyn PlatformApi> {
        Arc::new(PlatformClient::new(PlatformClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            project_key: "unused".to_string(),
            ..Default::default()
        }))
    }

    fn resolver(options: SyncOptions) -> (ReferenceResolver, Arc<IdentityCache>) {
        let cache = Arc::new(IdentityCache::new(64));
        (
            ReferenceResolver::new(unreachable_api(), Arc::clone(&cache), Arc::new(options)),
            cache,
        )
    }

    fn draft(key: &str) -> CategoryDraft {
        CategoryDraft::new(
            key,
            LocalizedString::of("en", "Name"),
            LocalizedString::of("en", "slug"),
        )
    }

    #[tokio::test]
    async fn id_form_references_need_no_lookup() {
        let (resolver, _) = resolver(SyncOptions::default());
        let parent_id = ResourceId::new();
        let input = draft("child").with_parent(Reference::by_id(parent_id));

        let resolution = resolver.resolve(input.clone()).await.unwrap();

        assert_eq!(resolution, Resolution::Resolved(input));
    }

    #[tokio::test]
    async fn warm_cache_hit_rewrites_references() {
        let (resolver, cache) = resolver(SyncOptions::default());
        let parent_id = ResourceId::new();
        let type_id = ResourceId::new();
        cache.insert(ResourceKind::Category, "parent", parent_id);
        cache.insert(ResourceKind::Type, "sizes", type_id);

        let input = draft("child")
            .with_parent(Reference::by_key("parent"))
            .with_custom(CustomFieldsDraft::of_type(Reference::by_key("sizes")));

        let resolution = resolver.resolve(input).await.unwrap();

        let Resolution::Resolved(resolved) = resolution else {
            panic!("expected resolved draft");
        };
        assert_eq!(resolved.parent, Some(Reference::by_id(parent_id)));
        assert_eq!(
            resolved.custom.unwrap().type_ref,
            Reference::by_id(type_id)
        );
    }

    #[tokio::test]
    async fn missing_parent_defers_under_default_policy() {
        let (resolver, cache) = resolver(SyncOptions::default());
        cache.insert_absent(ResourceKind::Category, "parent");

        let resolution = resolver
            .resolve(draft("child").with_parent(Reference::by_key("parent")))
            .await
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Deferred {
                missing: BTreeSet::from(["parent".to_string()])
            }
        );
    }

    #[tokio::test]
    async fn missing_type_fails_under_default_policy() {
        let (resolver, cache) = resolver(SyncOptions::default());
        cache.insert_absent(ResourceKind::Type, "sizes");

        let err = resolver
            .resolve(draft("child").with_custom(CustomFieldsDraft::of_type(Reference::by_key(
                "sizes",
            ))))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to resolve custom type reference on CategoryDraft with key:'child'. \
             Reason: Type with key 'sizes' doesn't exist."
        );
    }

    #[tokio::test]
    async fn blank_reference_key_is_terminal() {
        let (resolver, _) = resolver(SyncOptions::default());

        let err = resolver
            .resolve(draft("child").with_parent(Reference::by_key("  ")))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to resolve parent reference on CategoryDraft with key:'child'. \
             Reason: Reference 'key' field value is blank (null/empty)."
        );
    }

    #[tokio::test]
    async fn one_pass_collects_every_missing_deferrable_key() {
        // Both kinds deferrable: a single resolve names both gaps.
        let options = SyncOptions::builder()
            .missing_reference_fallback(ResourceKind::Type, MissingReferenceFallback::Defer)
            .build();
        let (resolver, cache) = resolver(options);
        cache.insert_absent(ResourceKind::Category, "parent");
        cache.insert_absent(ResourceKind::Type, "sizes");

        let resolution = resolver
            .resolve(
                draft("child")
                    .with_parent(Reference::by_key("parent"))
                    .with_custom(CustomFieldsDraft::of_type(Reference::by_key("sizes"))),
            )
            .await
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Deferred {
                missing: BTreeSet::from(["parent".to_string(), "sizes".to_string()])
            }
        );
    }

    #[tokio::test]
    async fn terminal_type_failure_preempts_parent_deferral() {
        let (resolver, cache) = resolver(SyncOptions::default());
        cache.insert_absent(ResourceKind::Type, "sizes");
        cache.insert_absent(ResourceKind::Category, "parent");

        let err = resolver
            .resolve(
                draft("child")
                    .with_parent(Reference::by_key("parent"))
                    .with_custom(CustomFieldsDraft::of_type(Reference::by_key("sizes"))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ReferenceResolution(_)));
        assert!(err.to_string().contains("custom type"));
    }
}
