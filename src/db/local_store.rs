use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::Bucket;
use crate::store::{
    format_timestamp, merge_patch, now, parse_timestamp, RecordStore, StoreError, StoredRecord,
};

/// On-device record cache backed by SQLite.
///
/// Deletes leave a tombstone and every write marks the row dirty until a
/// remote confirms it, so a later reconciliation can tell local changes from
/// records the remote already has.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

/// A cached row including sync bookkeeping.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub record: StoredRecord,
    pub deleted: bool,
    pub dirty: bool,
}

// Row type for database queries
#[derive(sqlx::FromRow)]
struct RecordRow {
    bucket: String,
    id: String,
    payload: String,
    created_at: String,
    updated_at: String,
    deleted_at: Option<String>,
    dirty: bool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or overwrites a record, keeping its id and timestamps.
    pub async fn upsert(&self, record: &StoredRecord, dirty: bool) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.data)?;

        sqlx::query(
            r#"
            INSERT INTO records (bucket, id, payload, created_at, updated_at, deleted_at, dirty)
            VALUES (?, ?, ?, ?, ?, NULL, ?)
            ON CONFLICT (bucket, id) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                deleted_at = NULL,
                dirty = excluded.dirty
            "#,
        )
        .bind(record.bucket.as_str())
        .bind(record.id.to_string())
        .bind(&payload)
        .bind(format_timestamp(&record.created_at))
        .bind(format_timestamp(&record.updated_at))
        .bind(dirty)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every row of a bucket, tombstones included.
    pub async fn entries(&self, bucket: Bucket) -> Result<Vec<LocalEntry>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT * FROM records WHERE bucket = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(bucket.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(hydrate_entry).collect()
    }

    pub async fn mark_clean(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE records SET dirty = 0 WHERE bucket = ? AND id = ?")
            .bind(bucket.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drops a row for good, tombstone or not.
    pub async fn purge(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE bucket = ? AND id = ?")
            .bind(bucket.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn dirty_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE dirty = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredRecord>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            r#"
            SELECT * FROM records
            WHERE bucket = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(bucket.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| hydrate_entry(row).map(|entry| entry.record))
            .collect()
    }

    async fn get(&self, bucket: Bucket, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT * FROM records WHERE bucket = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(bucket.as_str())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => hydrate_entry(row).map(|entry| Some(entry.record)),
            None => Ok(None),
        }
    }

    async fn create(&self, bucket: Bucket, data: Value) -> Result<StoredRecord, StoreError> {
        let record = StoredRecord::new(bucket, data);
        self.upsert(&record, true).await?;
        tracing::debug!("Created {} record {}", bucket, record.id);
        Ok(record)
    }

    async fn update(
        &self,
        bucket: Bucket,
        id: Uuid,
        patch: Value,
    ) -> Result<StoredRecord, StoreError> {
        let mut record = self
            .get(bucket, id)
            .await?
            .ok_or(StoreError::NotFound { bucket, id })?;

        merge_patch(&mut record.data, &patch);
        record.updated_at = now();
        self.upsert(&record, true).await?;
        Ok(record)
    }

    async fn delete(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError> {
        let deleted_at = format_timestamp(&now());
        let result = sqlx::query(
            r#"
            UPDATE records SET deleted_at = ?, updated_at = ?, dirty = 1
            WHERE bucket = ? AND id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&deleted_at)
        .bind(&deleted_at)
        .bind(bucket.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { bucket, id });
        }
        Ok(())
    }

    async fn count(&self, bucket: Bucket) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM records WHERE bucket = ? AND deleted_at IS NULL",
        )
        .bind(bucket.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

fn stored_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    parse_timestamp(value)
        .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp '{}'", value)))
}

fn hydrate_entry(row: RecordRow) -> Result<LocalEntry, StoreError> {
    let bucket = Bucket::from_str(&row.bucket).map_err(StoreError::Corrupt)?;
    let id = Uuid::parse_str(&row.id)
        .map_err(|e| StoreError::Corrupt(format!("bad id '{}': {}", row.id, e)))?;
    let data: Value = serde_json::from_str(&row.payload)?;

    Ok(LocalEntry {
        record: StoredRecord {
            id,
            bucket,
            created_at: stored_timestamp(&row.created_at)?,
            updated_at: stored_timestamp(&row.updated_at)?,
            data,
        },
        deleted: row.deleted_at.is_some(),
        dirty: row.dirty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        store: LocalStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            store: LocalStore::new(pool),
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_create_then_list_includes_record() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store
            .create(Bucket::Checkins, json!({"student_name": "Ana"}))
            .await
            .unwrap();

        let listed = store.list(Bucket::Checkins).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].data["student_name"], "Ana");
    }

    #[tokio::test]
    async fn test_list_newest_first_and_scoped_to_bucket() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let first = store.create(Bucket::Courses, json!({"name": "A"})).await.unwrap();
        let second = store.create(Bucket::Courses, json!({"name": "B"})).await.unwrap();
        let third = store.create(Bucket::Courses, json!({"name": "C"})).await.unwrap();
        store.create(Bucket::Teachers, json!({"name": "T"})).await.unwrap();

        let ids: Vec<Uuid> = store
            .list(Bucket::Courses)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(store.count(Bucket::Courses).await.unwrap(), 3);
        assert_eq!(store.count(Bucket::Teachers).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store
            .create(Bucket::Incidents, json!({"status": "pending", "category": "Otro"}))
            .await
            .unwrap();

        let updated = store
            .update(Bucket::Incidents, created.id, json!({"status": "resolved"}))
            .await
            .unwrap();
        assert_eq!(updated.data["status"], "resolved");
        assert_eq!(updated.data["category"], "Otro");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let ctx = setup_store().await;
        let result = ctx
            .store
            .update(Bucket::Incidents, Uuid::new_v4(), json!({"status": "resolved"}))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_collection_untouched() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.create(Bucket::Students, json!({"first_name": "Ana"})).await.unwrap();
        store.create(Bucket::Students, json!({"first_name": "Luis"})).await.unwrap();
        let before = store.list(Bucket::Students).await.unwrap();

        let result = store.delete(Bucket::Students, Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let after = store.list(Bucket::Students).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store.create(Bucket::Courses, json!({"name": "A"})).await.unwrap();
        store.delete(Bucket::Courses, created.id).await.unwrap();

        assert!(store.get(Bucket::Courses, created.id).await.unwrap().is_none());
        assert_eq!(store.count(Bucket::Courses).await.unwrap(), 0);

        let entries = store.entries(Bucket::Courses).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].deleted);
        assert!(entries[0].dirty);

        // A second delete finds nothing live
        assert!(store.delete(Bucket::Courses, created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_clean_and_purge() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store.create(Bucket::Courses, json!({"name": "A"})).await.unwrap();
        assert_eq!(store.dirty_count().await.unwrap(), 1);

        store.mark_clean(Bucket::Courses, created.id).await.unwrap();
        assert_eq!(store.dirty_count().await.unwrap(), 0);

        store.purge(Bucket::Courses, created.id).await.unwrap();
        assert!(store.entries(Bucket::Courses).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_timestamp_is_corrupt() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let created = store.create(Bucket::Courses, json!({"name": "A"})).await.unwrap();
        sqlx::query("UPDATE records SET updated_at = 'yesterday' WHERE id = ?")
            .bind(created.id.to_string())
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.list(Bucket::Courses).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(err.to_string().contains("yesterday"));
    }
}
