use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::document::{Document, Selector};
use crate::error::{ApiErrorDetails, StoreError};
use crate::subscription::{ErrorCallback, SnapshotCallback, StoreSubscription};
use crate::CollectionStore;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Collection store backed by a PostgREST-style API (`/rest/v1/<table>`)
///
/// Live subscriptions re-read the full result set every `poll_interval`
/// and deliver it whenever it differs from the previous delivery.
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestInner>,
}

struct RestInner {
    base_url: String,
    api_key: String,
    http_client: Client,
    access_token: RwLock<Option<String>>,
    poll_interval: Duration,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self::build(base_url, api_key, http_client, DEFAULT_POLL_INTERVAL)
    }

    /// Like [`RestStore::new`] with a custom polling period for live
    /// subscriptions; the period must be non-zero
    pub fn new_with_poll_interval(
        base_url: &str,
        api_key: &str,
        http_client: Client,
        poll_interval: Duration,
    ) -> Result<Self, StoreError> {
        if poll_interval.is_zero() {
            return Err(StoreError::InvalidConfig(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(Self::build(base_url, api_key, http_client, poll_interval))
    }

    fn build(base_url: &str, api_key: &str, http_client: Client, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(RestInner {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
                http_client,
                access_token: RwLock::new(None),
                poll_interval,
            }),
        }
    }

    /// Set or clear the bearer token sent with every request
    pub async fn set_auth(&self, token: Option<String>) {
        info!("Setting store auth token (is_some: {})", token.is_some());
        *self.inner.access_token.write().await = token;
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }
}

impl RestInner {
    async fn headers(&self, representation: bool) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.api_key)?);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.api_key.clone());
        headers.insert(
            "Authorization",
            header_value(&format!("Bearer {}", bearer))?,
        );
        if representation {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static("return=representation"),
            );
        }
        Ok(headers)
    }

    fn url(&self, collection: &str, query: &[(String, String)]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, collection))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn by_id(id: &str) -> Vec<(String, String)> {
        vec![("id".to_string(), format!("eq.{}", id))]
    }

    async fn fetch(&self, selector: &Selector) -> Result<Vec<Document>, StoreError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(selector.query_pairs());
        // stable row order, so unchanged polls compare equal
        query.push(("order".to_string(), "id.asc".to_string()));
        let url = self.url(selector.collection(), &query)?;

        let response = self
            .http_client
            .get(url)
            .headers(self.headers(false).await?)
            .send()
            .await?;
        let rows = read_rows(response).await?;
        rows.into_iter().map(Document::from_value).collect()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value)
        .map_err(|_| StoreError::InvalidRecord(format!("Invalid header value: {}", value)))
}

async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<ApiErrorDetails>(&error_text) {
        Ok(details) => StoreError::ApiError { details, status },
        Err(_) => StoreError::UnparsedApiError {
            message: error_text,
            status,
        },
    }
}

/// Rows of a successful response; an empty body reads as no rows
async fn read_rows(response: Response) -> Result<Vec<Value>, StoreError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&body)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

#[async_trait]
impl CollectionStore for RestStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::InvalidRecord(
                "record must be a JSON object".to_string(),
            ));
        };
        // assigned server-side
        fields.remove("id");
        fields.remove("createdAt");

        let url = self.inner.url(collection, &[])?;
        let response = self
            .inner
            .http_client
            .post(url)
            .headers(self.inner.headers(true).await?)
            .json(&Value::Object(fields))
            .send()
            .await?;

        let rows = read_rows(response).await?;
        let created = rows.into_iter().next().ok_or_else(|| {
            StoreError::InvalidRecord("insert returned no representation".to_string())
        })?;
        let document = Document::from_value(created)?;
        debug!("Created {}/{}", collection, document.id);
        Ok(document.id)
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::InvalidRecord(
                "record must be a JSON object".to_string(),
            ));
        };
        fields.remove("createdAt");
        fields.insert("id".to_string(), Value::String(id.to_string()));

        let url = self.inner.url(collection, &[])?;
        let response = self
            .inner
            .http_client
            .post(url)
            .headers(self.inner.headers(false).await?)
            .json(&Value::Object(fields))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::already_exists(collection, id));
        }
        read_rows(response).await?;
        debug!("Created {}/{}", collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.inner.url(collection, &RestInner::by_id(id))?;
        let response = self
            .inner
            .http_client
            .delete(url)
            .headers(self.inner.headers(false).await?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        debug!("Deleted {}/{}", collection, id);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let selector = Selector::all(collection).eq("id", id);
        Ok(self.inner.fetch(&selector).await?.into_iter().next())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        if !fields.is_object() {
            return Err(StoreError::InvalidRecord(
                "update fields must be a JSON object".to_string(),
            ));
        }
        let url = self.inner.url(collection, &RestInner::by_id(id))?;
        let response = self
            .inner
            .http_client
            .patch(url)
            .headers(self.inner.headers(true).await?)
            .json(&fields)
            .send()
            .await?;

        if read_rows(response).await?.is_empty() {
            return Err(StoreError::not_found(collection, id));
        }
        debug!("Updated {}/{}", collection, id);
        Ok(())
    }

    async fn subscribe(
        &self,
        selector: Selector,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> Result<StoreSubscription, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let inner = self.inner.clone();
        let task_id = id.clone();

        info!(
            "Polling subscription {} on {} every {:?}",
            id,
            selector.collection(),
            inner.poll_interval
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.poll_interval);
            let mut last: Option<Vec<Document>> = None;
            loop {
                ticker.tick().await;
                match inner.fetch(&selector).await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            on_snapshot(snapshot.clone());
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        warn!("Subscription {} failed: {}", task_id, e);
                        on_error(e);
                        break;
                    }
                }
            }
        });

        Ok(StoreSubscription::new(id, move || task.abort()))
    }
}
