//! Record stores keyed by bucket.
//!
//! Three interchangeable backends implement [`RecordStore`]:
//! - [`LocalStore`](crate::db::LocalStore): the on-device SQLite cache
//! - [`RemoteStore`](crate::remote::RemoteStore): the hosted table API
//! - [`SyncedStore`]: local cache first, remote confirmed opportunistically,
//!   with an explicit last-write-wins reconciliation pass
//!
//! [`Repository`] layers typed records on top of any of them.

mod error;
mod repository;
mod synced;

pub use error::StoreError;
pub use repository::Repository;
pub use synced::{ReconcileSummary, SyncedStore};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Bucket;

/// An untyped record as it travels between stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: Uuid,
    pub bucket: Bucket,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

impl StoredRecord {
    /// Wraps a payload with a fresh id and timestamps.
    pub fn new(bucket: Bucket, data: Value) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            bucket,
            created_at: now,
            updated_at: now,
            data,
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists live records, newest first.
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredRecord>, StoreError>;

    async fn get(&self, bucket: Bucket, id: Uuid) -> Result<Option<StoredRecord>, StoreError>;

    /// Stores a payload under a generated id and timestamp.
    async fn create(&self, bucket: Bucket, data: Value) -> Result<StoredRecord, StoreError>;

    /// Merges `patch` into the record's payload.
    async fn update(
        &self,
        bucket: Bucket,
        id: Uuid,
        patch: Value,
    ) -> Result<StoredRecord, StoreError>;

    /// Removes a record. Unknown ids yield `NotFound` and change nothing.
    async fn delete(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError>;

    async fn count(&self, bucket: Bucket) -> Result<u64, StoreError>;
}

/// Applies a JSON merge patch (RFC 7386): objects merge recursively, `null`
/// removes a key, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(
                    target_fields.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// Current time at the precision the stores keep.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_replaces_and_removes() {
        let mut target = json!({"status": "pending", "note": "x", "nested": {"a": 1, "b": 2}});
        merge_patch(
            &mut target,
            &json!({"status": "resolved", "note": null, "nested": {"b": 3}}),
        );
        assert_eq!(
            target,
            json!({"status": "resolved", "nested": {"a": 1, "b": 3}})
        );
    }

    #[test]
    fn test_timestamp_format_roundtrip() {
        let now = Utc::now();
        let formatted = format_timestamp(&now);
        assert!(formatted.ends_with('Z'));
        let parsed = parse_timestamp(&formatted).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }
}
