use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use super::wire::{CountResponse, CreateBody, PatchBody};
use super::RemoteError;
use crate::config::RemoteConfig;
use crate::models::Bucket;
use crate::store::{RecordStore, StoreError, StoredRecord};

/// HTTP client for the hosted table API.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteStore {
    /// Creates a client from config.
    ///
    /// Returns an error if the remote is not configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(RemoteError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(RemoteError::NotConfigured)?;
        Self::new(base_url, api_key, config.timeout())
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    fn table_url(&self, bucket: Bucket) -> String {
        format!(
            "{}/rest/{}",
            self.base_url,
            urlencoding::encode(bucket.as_str())
        )
    }

    fn record_url(&self, bucket: Bucket, id: Uuid) -> String {
        format!("{}/{}", self.table_url(bucket), id)
    }

    /// WebSocket URL for a table's change feed.
    pub fn realtime_url(&self, bucket: Bucket) -> String {
        format!(
            "{}/realtime/{}",
            super::websocket_base(&self.base_url),
            urlencoding::encode(bucket.as_str())
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        check_status(response).await
    }

    /// Checks that the server is reachable.
    pub async fn health(&self) -> Result<(), RemoteError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn select(&self, bucket: Bucket) -> Result<Vec<StoredRecord>, RemoteError> {
        let response = self.send(self.client.get(self.table_url(bucket))).await?;
        Ok(response.json().await?)
    }

    pub async fn fetch(&self, bucket: Bucket, id: Uuid) -> Result<StoredRecord, RemoteError> {
        let response = self
            .send(self.client.get(self.record_url(bucket, id)))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn insert(&self, bucket: Bucket, data: Value) -> Result<StoredRecord, RemoteError> {
        let response = self
            .send(
                self.client
                    .post(self.table_url(bucket))
                    .json(&CreateBody { data }),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Writes a record with its id and timestamps as given.
    pub async fn upsert(&self, record: &StoredRecord) -> Result<(), RemoteError> {
        self.send(
            self.client
                .put(self.record_url(record.bucket, record.id))
                .json(record),
        )
        .await?;
        Ok(())
    }

    pub async fn patch(
        &self,
        bucket: Bucket,
        id: Uuid,
        patch: Value,
    ) -> Result<StoredRecord, RemoteError> {
        let response = self
            .send(
                self.client
                    .patch(self.record_url(bucket, id))
                    .json(&PatchBody { patch }),
            )
            .await?;
        Ok(response.json().await?)
    }

    pub async fn remove(&self, bucket: Bucket, id: Uuid) -> Result<(), RemoteError> {
        self.send(self.client.delete(self.record_url(bucket, id)))
            .await?;
        Ok(())
    }

    pub async fn tally(&self, bucket: Bucket) -> Result<u64, RemoteError> {
        let response = self
            .send(
                self.client
                    .get(format!("{}/count", self.table_url(bucket))),
            )
            .await?;
        let body: CountResponse = response.json().await?;
        Ok(body.count)
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
        StatusCode::NOT_FOUND => Err(RemoteError::NotFound),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Status(status.as_u16(), body))
        }
    }
}

fn not_found(bucket: Bucket, id: Uuid) -> impl FnOnce(RemoteError) -> StoreError {
    move |e| match e {
        RemoteError::NotFound => StoreError::NotFound { bucket, id },
        other => StoreError::Remote(other),
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.select(bucket).await?)
    }

    async fn get(&self, bucket: Bucket, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        match self.fetch(bucket, id).await {
            Ok(record) => Ok(Some(record)),
            Err(RemoteError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, bucket: Bucket, data: Value) -> Result<StoredRecord, StoreError> {
        Ok(self.insert(bucket, data).await?)
    }

    async fn update(
        &self,
        bucket: Bucket,
        id: Uuid,
        patch: Value,
    ) -> Result<StoredRecord, StoreError> {
        self.patch(bucket, id, patch)
            .await
            .map_err(not_found(bucket, id))
    }

    async fn delete(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError> {
        self.remove(bucket, id).await.map_err(not_found(bucket, id))
    }

    async fn count(&self, bucket: Bucket) -> Result<u64, StoreError> {
        Ok(self.tally(bucket).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::spawn_server;
    use serde_json::json;

    #[test]
    fn test_urls() {
        let remote = RemoteStore::new("http://localhost:8080/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(
            remote.table_url(Bucket::Checkins),
            "http://localhost:8080/rest/checkins"
        );
        assert_eq!(
            remote.realtime_url(Bucket::Incidents),
            "ws://localhost:8080/realtime/incidents"
        );
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let config = RemoteConfig {
            base_url: Some("http://localhost".to_string()),
            ..RemoteConfig::default()
        };
        assert_eq!(
            RemoteStore::from_config(&config).unwrap_err(),
            RemoteError::NotConfigured
        );
    }

    #[tokio::test]
    async fn test_crud_against_server() {
        let server = spawn_server().await;
        let remote = server.remote();

        remote.health().await.unwrap();

        let created = remote
            .create(Bucket::Incidents, json!({"status": "pending"}))
            .await
            .unwrap();
        assert_eq!(remote.count(Bucket::Incidents).await.unwrap(), 1);

        let updated = remote
            .update(Bucket::Incidents, created.id, json!({"status": "resolved"}))
            .await
            .unwrap();
        assert_eq!(updated.data["status"], "resolved");

        let fetched = remote.get(Bucket::Incidents, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.data["status"], "resolved");

        remote.delete(Bucket::Incidents, created.id).await.unwrap();
        assert!(remote.get(Bucket::Incidents, created.id).await.unwrap().is_none());
        assert!(remote.list(Bucket::Incidents).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let server = spawn_server().await;
        let result = server
            .remote()
            .delete(Bucket::Students, Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_upsert_keeps_id_and_timestamps() {
        let server = spawn_server().await;
        let remote = server.remote();

        let record = StoredRecord::new(Bucket::Courses, json!({"name": "1°A"}));
        remote.upsert(&record).await.unwrap();

        let fetched = remote.fetch(Bucket::Courses, record.id).await.unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn test_wrong_key_is_unauthorized() {
        let server = spawn_server().await;
        let remote = RemoteStore::new(server.base_url(), "wrong", Duration::from_secs(5)).unwrap();
        let result = remote.select(Bucket::Students).await;
        assert_eq!(result.unwrap_err(), RemoteError::Unauthorized);
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let remote = RemoteStore::new("http://127.0.0.1:1", "k", Duration::from_secs(2)).unwrap();
        let result = remote.select(Bucket::Students).await;
        assert!(matches!(result, Err(RemoteError::Network(_))));
    }
}
