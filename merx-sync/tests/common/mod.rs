//! Shared helpers for the sync integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use merx_client::{PlatformClient, PlatformClientConfig};
use merx_sync::{CategorySync, SyncOptions, UNRESOLVED_CONTAINER};
use merx_types::{CategoryDraft, LocalizedString, ResourceId};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ID_A: &str = "11111111-1111-4111-8111-111111111111";
pub const ID_B: &str = "22222222-2222-4222-8222-222222222222";
pub const ID_C: &str = "33333333-3333-4333-8333-333333333333";

// Waiting-room records live under the SHA-256 of the draft key.
pub const KIDS_HASH: &str = "2ec716e4dc4329cdd25b5714267892d55d4c035f82418b32226be31278cbef79";
pub const BOOTS_HASH: &str = "40cafc18e93464f86d5d304e726df74311237955bcf7d99909bcef3f0bcb90bb";
pub const SHOES_HASH: &str = "01ea5ddd3be5477ac3eae2366fa12064615c485a541682db3e62d283241055a6";
pub const CLOTHING_HASH: &str = "12d264de09a571d6851defcdcfd4ae37d3177dc28aed52c125007dcbc91c5316";

/// Client configuration pointing at the mock server.
pub fn mock_config(server: &MockServer) -> PlatformClientConfig {
    PlatformClientConfig {
        base_url: server.uri(),
        project_key: "test-project".to_string(),
        auth_token: "test-token".to_string(),
        ..Default::default()
    }
}

/// A sync engine backed by the mock server.
pub fn sync_against(server: &MockServer, options: SyncOptions) -> CategorySync {
    let client = PlatformClient::new(mock_config(server));
    CategorySync::new(Arc::new(client), options)
}

/// A draft whose name and slug both localize the key, so a category
/// built by [`category_json`] for the same key diffs as unchanged.
pub fn draft(key: &str) -> CategoryDraft {
    CategoryDraft::new(
        key,
        LocalizedString::of("en", key),
        LocalizedString::of("en", key),
    )
}

/// The wire shape of a category whose name and slug localize the key.
pub fn category_json(id: &str, version: u64, key: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "version": version,
        "key": key,
        "name": {"en": key},
        "slug": {"en": key},
    })
}

/// The wire shape of one stored waiting-room record.
pub fn waiting_object_json(
    hash: &str,
    draft: &CategoryDraft,
    missing: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "container": UNRESOLVED_CONTAINER,
        "key": hash,
        "version": 1,
        "value": {"draft": draft, "missingReferencedKeys": missing},
        "lastModifiedAt": "2026-08-01T00:00:00Z",
    })
}

/// Mounts an always-empty waiting room: both the keyed fetch and the
/// full scan see no records.
pub async fn mount_empty_waiting_room(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/test-project/custom-objects/{UNRESOLVED_CONTAINER}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .mount(server)
        .await;
}

/// Replies with each template in turn, repeating the last one.
pub struct Sequenced {
    responses: Vec<ResponseTemplate>,
    hits: AtomicUsize,
}

impl Sequenced {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            hits: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequenced {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let hit = self.hits.fetch_add(1, Ordering::SeqCst);
        self.responses[hit.min(self.responses.len() - 1)].clone()
    }
}

/// Answers a create request with a category echoing the submitted key,
/// so the engine caches the right identity for later references to it.
pub struct EchoCreate;

impl Respond for EchoCreate {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let draft: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let key = draft["key"].as_str().unwrap();
        let id = ResourceId::new().to_string();
        ResponseTemplate::new(201).set_body_json(category_json(&id, 1, key))
    }
}
