//! Reqwest implementation of the platform API.
//!
//! Paths are `{base_url}/{project_key}/…`; list endpoints return
//! `{"results": […], "next": "<cursor>"}` with `next` absent on the
//! last page. All faults are classified here before they escape.

use crate::api::{CustomObjectPage, PlatformApi};
use crate::error::{ApiFault, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use merx_types::{
    Category, CategoryDraft, CategoryUpdateAction, CustomObject, CustomObjectDraft, ResourceId,
    ResourceKind,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Configuration for the platform client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformClientConfig {
    /// Base URL of the platform API (e.g. `https://api.merx.dev`).
    pub base_url: String,
    /// Project key; prefixes every request path.
    pub project_key: String,
    /// Bearer token sent with every request.
    pub auth_token: String,
    /// Page size for list requests.
    pub page_size: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PlatformClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.merx.dev".to_string(),
            project_key: String::new(),
            auth_token: String::new(),
            page_size: 500,
            timeout_secs: 30,
        }
    }
}

/// Envelope for paginated list responses.
#[derive(Debug, Deserialize)]
struct ResultsPage<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyedId {
    id: ResourceId,
    key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: ResourceId,
}

/// Error body shape the platform returns; both fields are optional
/// because proxies can produce bare-text errors.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "currentVersion")]
    current_version: Option<u64>,
}

/// HTTP client for the platform API.
pub struct PlatformClient {
    config: PlatformClientConfig,
    client: Client,
}

impl PlatformClient {
    /// Creates a new platform client.
    pub fn new(config: PlatformClientConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url, self.config.project_key, path
        )
    }

    /// Turns an unsuccessful response into a classified fault.
    async fn fault_from_response(response: reqwest::Response) -> ApiFault {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();

        if status == StatusCode::CONFLICT {
            return ApiFault::Conflict {
                current_version: parsed.and_then(|b| b.current_version),
            };
        }

        let message = parsed.and_then(|b| b.message).unwrap_or(body);
        ApiFault::from_status(status, message)
    }

    /// Runs one paginated list request, accumulating every result page.
    async fn fetch_all_pages<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        base_query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let limit = self.config.page_size.to_string();
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url(path))
                .bearer_auth(&self.config.auth_token)
                .query(base_query)
                .query(&[("limit", limit.as_str())]);

            if let Some(token) = &cursor {
                request = request.query(&[("after", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ApiFault::from_request_error(&e))?;

            if !response.status().is_success() {
                return Err(Self::fault_from_response(response).await);
            }

            let page: ResultsPage<T> = response
                .json()
                .await
                .map_err(|e| ApiFault::Decode(format!("failed to parse list page: {e}")))?;

            all.extend(page.results);
            cursor = page.next;
            if cursor.is_none() {
                break;
            }
        }

        Ok(all)
    }
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn fetch_categories_by_keys(&self, keys: &[String]) -> ApiResult<Vec<Category>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = keys.len(), "Fetching categories by keys");

        let joined = keys.join(",");
        self.fetch_all_pages("categories", &[("keys", joined.as_str())])
            .await
    }

    async fn fetch_category_by_key(&self, key: &str) -> ApiResult<Option<Category>> {
        let found = self.fetch_categories_by_keys(&[key.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    async fn fetch_ids_by_keys(
        &self,
        kind: ResourceKind,
        keys: &[String],
    ) -> ApiResult<HashMap<String, ResourceId>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(kind = %kind, count = keys.len(), "Bulk key-to-id lookup");

        let joined = keys.join(",");
        let response = self
            .client
            .get(self.url(&format!("{}/ids", kind.path_segment())))
            .bearer_auth(&self.config.auth_token)
            .query(&[("keys", joined.as_str())])
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        let page: ResultsPage<KeyedId> = response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse id lookup: {e}")))?;

        Ok(page.results.into_iter().map(|e| (e.key, e.id)).collect())
    }

    async fn create_category(&self, draft: &CategoryDraft) -> ApiResult<Category> {
        debug!(key = %draft.key, "Creating category");

        let response = self
            .client
            .post(self.url("categories"))
            .bearer_auth(&self.config.auth_token)
            .json(draft)
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse created category: {e}")))
    }

    async fn update_category(
        &self,
        id: ResourceId,
        version: u64,
        actions: &[CategoryUpdateAction],
    ) -> ApiResult<Category> {
        debug!(%id, version, action_count = actions.len(), "Updating category");

        let body = serde_json::json!({
            "version": version,
            "actions": actions,
        });

        let response = self
            .client
            .post(self.url(&format!("categories/{id}")))
            .bearer_auth(&self.config.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse updated category: {e}")))
    }

    async fn ensure_resource(&self, kind: ResourceKind, key: &str) -> ApiResult<ResourceId> {
        debug!(kind = %kind, key, "Creating minimal resource");

        // Kind-appropriate default bodies; only the key is caller-chosen.
        let body = match kind {
            ResourceKind::Category => serde_json::json!({
                "key": key,
                "name": {"en": key},
                "slug": {"en": key},
            }),
            ResourceKind::Type => serde_json::json!({
                "key": key,
                "name": {"en": key},
            }),
            ResourceKind::Channel => serde_json::json!({"key": key}),
        };

        let response = self
            .client
            .post(self.url(kind.path_segment()))
            .bearer_auth(&self.config.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        let created: CreatedResource = response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse created resource: {e}")))?;

        Ok(created.id)
    }

    async fn upsert_custom_object(&self, draft: &CustomObjectDraft) -> ApiResult<CustomObject> {
        debug!(container = %draft.container, key = %draft.key, "Upserting custom object");

        let response = self
            .client
            .post(self.url("custom-objects"))
            .bearer_auth(&self.config.auth_token)
            .json(draft)
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse custom object: {e}")))
    }

    async fn fetch_custom_objects(
        &self,
        container: &str,
        keys: &[String],
    ) -> ApiResult<Vec<CustomObject>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let joined = keys.join(",");
        let path = format!("custom-objects/{}", urlencoding::encode(container));
        self.fetch_all_pages(&path, &[("keys", joined.as_str())])
            .await
    }

    async fn fetch_custom_objects_page(
        &self,
        container: &str,
        modified_before: Option<DateTime<Utc>>,
        limit: u32,
        cursor: Option<&str>,
    ) -> ApiResult<CustomObjectPage> {
        let limit = limit.to_string();
        let mut request = self
            .client
            .get(self.url(&format!(
                "custom-objects/{}",
                urlencoding::encode(container)
            )))
            .bearer_auth(&self.config.auth_token)
            .query(&[("limit", limit.as_str())]);

        if let Some(cutoff) = modified_before {
            request = request.query(&[("modifiedBefore", cutoff.to_rfc3339().as_str())]);
        }
        if let Some(token) = cursor {
            request = request.query(&[("after", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        let page: ResultsPage<CustomObject> = response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse custom object page: {e}")))?;

        Ok(CustomObjectPage {
            results: page.results,
            next: page.next,
        })
    }

    async fn delete_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> ApiResult<Option<CustomObject>> {
        debug!(container, key, "Deleting custom object");

        let response = self
            .client
            .delete(self.url(&format!(
                "custom-objects/{}/{}",
                urlencoding::encode(container),
                urlencoding::encode(key)
            )))
            .bearer_auth(&self.config.auth_token)
            .send()
            .await
            .map_err(|e| ApiFault::from_request_error(&e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::fault_from_response(response).await);
        }

        let object: CustomObject = response
            .json()
            .await
            .map_err(|e| ApiFault::Decode(format!("failed to parse deleted object: {e}")))?;

        Ok(Some(object))
    }
}
