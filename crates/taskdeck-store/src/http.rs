//! HTTP store backed by `reqwest`.
//!
//! Paths follow the collection layout: `GET /tasks`, `GET /tasks/{id}`,
//! `GET /tasks?projectId={id}`, `POST /tasks`, `PATCH /tasks/{id}`,
//! `DELETE /tasks/{id}`, and the same for `/projects`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde_json::Value;
use taskdeck_core::{StoreError, StoreResult};
use taskdeck_settings::StoreSettings;
use tracing::debug;

use crate::remote::{Collection, Filter, RemoteStore};

/// Remote store speaking the JSON HTTP API.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Create a store for `base_url` with default client settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("taskdeck/0.1")
                .build()
                .unwrap_or_default(),
            base_url: normalize_base(base_url.into()),
        }
    }

    /// Create a store from settings (base URL, user agent, optional timeout).
    pub fn from_settings(settings: &StoreSettings) -> StoreResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if let Some(ms) = settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: normalize_base(settings.base_url.clone()),
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.as_str())
    }

    /// `{base}/{collection}/{id}` with `id` escaped as one path segment.
    fn entity_url(&self, collection: Collection, id: &str) -> StoreResult<String> {
        let base = self.collection_url(collection);
        let mut url = Url::parse(&base)
            .map_err(|e| StoreError::Transport(format!("invalid store URL {base}: {e}")))?;
        let _ = url
            .path_segments_mut()
            .map_err(|()| StoreError::Transport(format!("store URL {base} cannot take a path")))?
            .push(id);
        Ok(url.into())
    }

    /// Send a request, mapping transport failures and non-2xx statuses.
    async fn send(&self, method: Method, url: &str, request: RequestBuilder) -> StoreResult<Response> {
        debug!(%method, url, "store request");
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("{method} {url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            debug!(%method, url, status = status.as_u16(), "store request failed");
            return Err(StoreError::request_failed(status.as_u16(), method.as_str(), url));
        }
        Ok(response)
    }

    async fn send_json(&self, method: Method, url: &str, request: RequestBuilder) -> StoreResult<Value> {
        let response = self.send(method, url, request).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(format!("{url}: {e}")))
    }
}

fn normalize_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list(&self, collection: Collection, filter: Option<&Filter>) -> StoreResult<Vec<Value>> {
        let url = self.collection_url(collection);
        let mut request = self.client.get(&url);
        if let Some(filter) = filter {
            request = request.query(filter.pairs());
        }
        match self.send_json(Method::GET, &url, request).await? {
            Value::Array(items) => Ok(items),
            other => Err(StoreError::Decode(format!(
                "{url}: expected an array, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Value> {
        let url = self
            .entity_url(collection, id)
            .map_err(|_| StoreError::not_found(collection.as_str(), id))?;
        let request = self.client.get(&url);
        match self.send_json(Method::GET, &url, request).await {
            Ok(value) => Ok(value),
            Err(StoreError::Decode(msg)) => Err(StoreError::Decode(msg)),
            Err(_) => Err(StoreError::not_found(collection.as_str(), id)),
        }
    }

    async fn create(&self, collection: Collection, entity: Value) -> StoreResult<Value> {
        let url = self.collection_url(collection);
        let request = self.client.post(&url).json(&entity);
        self.send_json(Method::POST, &url, request).await
    }

    async fn patch(&self, collection: Collection, id: &str, partial: Value) -> StoreResult<Value> {
        let url = self.entity_url(collection, id)?;
        let request = self.client.patch(&url).json(&partial);
        self.send_json(Method::PATCH, &url, request).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let url = self.entity_url(collection, id)?;
        let request = self.client.delete(&url);
        let _ = self.send(Method::DELETE, &url, request).await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
