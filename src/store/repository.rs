use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

use super::{merge_patch, RecordStore, StoreError, StoredRecord};
use crate::models::record::check_patch;
use crate::models::{Record, Stored};

/// Typed access to one bucket of any [`RecordStore`].
pub struct Repository<'a, T> {
    store: &'a dyn RecordStore,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Record> Repository<'a, T> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Lists records newest first. Rows that no longer decode into `T` are
    /// skipped with a warning.
    pub async fn list(&self) -> Result<Vec<Stored<T>>, StoreError> {
        let rows = self.store.list(T::BUCKET).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match decode(row) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping undecodable {} record {}: {}", T::BUCKET, id, e),
            }
        }
        Ok(records)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Stored<T>>, StoreError> {
        match self.store.get(T::BUCKET, id).await? {
            Some(row) => Ok(Some(decode(row)?)),
            None => Ok(None),
        }
    }

    /// Finds a record by id prefix, the way ids are typed on the command line.
    pub async fn find(&self, identifier: &str) -> Result<Option<Stored<T>>, StoreError> {
        if let Ok(id) = Uuid::parse_str(identifier) {
            return self.get(id).await;
        }
        let prefix = identifier.to_lowercase();
        if prefix.is_empty() {
            return Ok(None);
        }
        let mut matches: Vec<Stored<T>> = self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.id.to_string().starts_with(&prefix))
            .collect();
        if matches.len() == 1 {
            Ok(matches.pop())
        } else {
            Ok(None)
        }
    }

    pub async fn create(&self, record: &T) -> Result<Stored<T>, StoreError> {
        record.validate()?;
        let data = serde_json::to_value(record)?;
        let row = self.store.create(T::BUCKET, data).await?;
        Ok(decode(row)?)
    }

    /// Applies a partial update after checking which fields may change and
    /// that the result is still a valid record.
    pub async fn update(&self, id: Uuid, patch: Value) -> Result<Stored<T>, StoreError> {
        check_patch::<T>(&patch)?;

        let current = self
            .store
            .get(T::BUCKET, id)
            .await?
            .ok_or(StoreError::NotFound {
                bucket: T::BUCKET,
                id,
            })?;

        let mut merged = current.data;
        merge_patch(&mut merged, &patch);
        let candidate: T = serde_json::from_value(merged)?;
        candidate.validate()?;

        let row = self.store.update(T::BUCKET, id, patch).await?;
        Ok(decode(row)?)
    }

    /// Replaces every field of a record.
    pub async fn replace(&self, id: Uuid, record: &T) -> Result<Stored<T>, StoreError> {
        let patch = serde_json::to_value(record)?;
        self.update(id, patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.store.delete(T::BUCKET, id).await
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(T::BUCKET).await
    }
}

fn decode<T: Record>(row: StoredRecord) -> Result<Stored<T>, serde_json::Error> {
    Ok(Stored {
        id: row.id,
        created_at: row.created_at,
        updated_at: row.updated_at,
        record: serde_json::from_value(row.data)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, LocalStore};
    use crate::models::{
        Bucket, CheckinRecord, Emotion, IncidentRecord, IncidentStatus, Severity, Student,
        ValidationError,
    };
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        store: LocalStore,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            store: LocalStore::new(pool),
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_missing_field() {
        let ctx = setup().await;
        let repo: Repository<Student> = Repository::new(&ctx.store);

        let result = repo.create(&Student::new("", "Rojas")).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::MissingField("first_name")))
        ));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_checkins_are_append_only() {
        let ctx = setup().await;
        let repo: Repository<CheckinRecord> = Repository::new(&ctx.store);

        let created = repo
            .create(&CheckinRecord::new("Ana", Emotion::Bien))
            .await
            .unwrap();

        let result = repo.update(created.id, json!({"note": "edited"})).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::Immutable(Bucket::Checkins)))
        ));
    }

    #[tokio::test]
    async fn test_incident_only_status_is_patchable() {
        let ctx = setup().await;
        let repo: Repository<IncidentRecord> = Repository::new(&ctx.store);

        let created = repo
            .create(&IncidentRecord::new("Ana", Severity::Mild, "Otro", "Pelea"))
            .await
            .unwrap();

        let updated = repo
            .update(created.id, json!({"status": "in-progress"}))
            .await
            .unwrap();
        assert_eq!(updated.record.status, IncidentStatus::InProgress);

        let result = repo.update(created.id, json!({"severity": "severe"})).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::FieldNotPatchable { .. }))
        ));

        let result = repo.update(created.id, json!({"status": "archived"})).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_replace_student() {
        let ctx = setup().await;
        let repo: Repository<Student> = Repository::new(&ctx.store);

        let created = repo.create(&Student::new("Ana", "Rojas")).await.unwrap();
        let mut edited = created.record.clone();
        edited.course = "4°A".to_string();

        let replaced = repo.replace(created.id, &edited).await.unwrap();
        assert_eq!(replaced.record.course, "4°A");
        assert_eq!(replaced.id, created.id);
    }

    #[tokio::test]
    async fn test_list_skips_undecodable_rows() {
        let ctx = setup().await;
        let repo: Repository<Student> = Repository::new(&ctx.store);

        repo.create(&Student::new("Ana", "Rojas")).await.unwrap();
        ctx.store
            .create(Bucket::Students, json!({"unexpected": true}))
            .await
            .unwrap();

        let students = repo.list().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].record.first_name, "Ana");
    }

    #[tokio::test]
    async fn test_find_by_id_prefix() {
        let ctx = setup().await;
        let repo: Repository<Student> = Repository::new(&ctx.store);

        let created = repo.create(&Student::new("Ana", "Rojas")).await.unwrap();
        let prefix = &created.id.to_string()[..8];

        let found = repo.find(prefix).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.find("zzzzzzzz").await.unwrap().is_none());
    }
}
