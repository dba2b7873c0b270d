use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoredRecord};
use crate::db::LocalStore;
use crate::models::Bucket;
use crate::remote::{RemoteError, RemoteStore};

/// Local cache first, remote second.
///
/// Reads come from the cache. Writes land in the cache, then are pushed to
/// the remote when one is configured. A failed push is logged and the row
/// stays dirty for the next [`SyncedStore::reconcile`].
#[derive(Debug, Clone)]
pub struct SyncedStore {
    local: LocalStore,
    remote: Option<RemoteStore>,
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileSummary {
    /// Remote records written into the cache
    pub pulled: usize,
    /// Local changes accepted by the remote
    pub pushed: usize,
    /// Cached records dropped because the remote no longer has them
    pub removed_locally: usize,
    /// Local deletions applied remotely
    pub removed_remotely: usize,
    /// Dirty rows the remote did not accept
    pub failed: usize,
}

impl ReconcileSummary {
    pub fn merge(&mut self, other: &ReconcileSummary) {
        self.pulled += other.pulled;
        self.pushed += other.pushed;
        self.removed_locally += other.removed_locally;
        self.removed_remotely += other.removed_remotely;
        self.failed += other.failed;
    }

    pub fn is_noop(&self) -> bool {
        *self == ReconcileSummary::default()
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pulled, {} pushed, {} removed locally, {} removed remotely",
            self.pulled, self.pushed, self.removed_locally, self.removed_remotely
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

impl SyncedStore {
    pub fn new(local: LocalStore, remote: Option<RemoteStore>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    async fn push(&self, record: &StoredRecord) {
        let Some(remote) = &self.remote else {
            return;
        };
        match remote.upsert(record).await {
            Ok(()) => {
                if let Err(e) = self.local.mark_clean(record.bucket, record.id).await {
                    tracing::warn!("Failed to mark {} {} clean: {}", record.bucket, record.id, e);
                }
            }
            Err(e) => tracing::warn!(
                "Remote write of {} {} failed, kept locally: {}",
                record.bucket,
                record.id,
                e
            ),
        }
    }

    async fn push_delete(&self, bucket: Bucket, id: Uuid) {
        let Some(remote) = &self.remote else {
            return;
        };
        match remote.remove(bucket, id).await {
            Ok(()) | Err(RemoteError::NotFound) => {
                if let Err(e) = self.local.purge(bucket, id).await {
                    tracing::warn!("Failed to purge tombstone {} {}: {}", bucket, id, e);
                }
            }
            Err(e) => tracing::warn!("Remote delete of {} {} failed: {}", bucket, id, e),
        }
    }

    /// Brings the cache and the remote into agreement for one bucket.
    ///
    /// The newer `updated_at` wins. Dirty local rows the remote lacks are
    /// pushed; clean rows the remote lacks were deleted elsewhere and are
    /// dropped.
    pub async fn reconcile(&self, bucket: Bucket) -> Result<ReconcileSummary, StoreError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(StoreError::Remote(RemoteError::NotConfigured))?;

        let remote_records: HashMap<Uuid, StoredRecord> = remote
            .select(bucket)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let local_entries = self.local.entries(bucket).await?;

        let mut summary = ReconcileSummary::default();
        let mut seen = Vec::with_capacity(local_entries.len());

        for entry in local_entries {
            let id = entry.record.id;
            seen.push(id);

            match remote_records.get(&id) {
                Some(theirs) if theirs.updated_at > entry.record.updated_at => {
                    self.local.upsert(theirs, false).await?;
                    summary.pulled += 1;
                }
                Some(_) if entry.deleted => match remote.remove(bucket, id).await {
                    Ok(()) | Err(RemoteError::NotFound) => {
                        self.local.purge(bucket, id).await?;
                        summary.removed_remotely += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Remote delete of {} {} failed: {}", bucket, id, e);
                        summary.failed += 1;
                    }
                },
                Some(_) if entry.dirty => self.push_entry(remote, &entry.record, &mut summary).await?,
                Some(_) => {}
                None if entry.deleted => {
                    self.local.purge(bucket, id).await?;
                    summary.removed_remotely += 1;
                }
                None if entry.dirty => self.push_entry(remote, &entry.record, &mut summary).await?,
                None => {
                    self.local.purge(bucket, id).await?;
                    summary.removed_locally += 1;
                }
            }
        }

        for (id, record) in remote_records {
            if !seen.contains(&id) {
                self.local.upsert(&record, false).await?;
                summary.pulled += 1;
            }
        }

        tracing::info!("Reconciled {}: {}", bucket, summary);
        Ok(summary)
    }

    async fn push_entry(
        &self,
        remote: &RemoteStore,
        record: &StoredRecord,
        summary: &mut ReconcileSummary,
    ) -> Result<(), StoreError> {
        match remote.upsert(record).await {
            Ok(()) => {
                self.local.mark_clean(record.bucket, record.id).await?;
                summary.pushed += 1;
            }
            Err(e) => {
                tracing::warn!("Remote write of {} {} failed: {}", record.bucket, record.id, e);
                summary.failed += 1;
            }
        }
        Ok(())
    }

    /// Reconciles every bucket, stopping at the first bucket that fails.
    pub async fn reconcile_all(&self) -> Result<ReconcileSummary, StoreError> {
        let mut total = ReconcileSummary::default();
        for bucket in Bucket::ALL {
            total.merge(&self.reconcile(bucket).await?);
        }
        Ok(total)
    }
}

#[async_trait]
impl RecordStore for SyncedStore {
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredRecord>, StoreError> {
        self.local.list(bucket).await
    }

    async fn get(&self, bucket: Bucket, id: Uuid) -> Result<Option<StoredRecord>, StoreError> {
        self.local.get(bucket, id).await
    }

    async fn create(&self, bucket: Bucket, data: Value) -> Result<StoredRecord, StoreError> {
        let record = self.local.create(bucket, data).await?;
        self.push(&record).await;
        Ok(record)
    }

    async fn update(
        &self,
        bucket: Bucket,
        id: Uuid,
        patch: Value,
    ) -> Result<StoredRecord, StoreError> {
        let record = self.local.update(bucket, id, patch).await?;
        self.push(&record).await;
        Ok(record)
    }

    async fn delete(&self, bucket: Bucket, id: Uuid) -> Result<(), StoreError> {
        self.local.delete(bucket, id).await?;
        self.push_delete(bucket, id).await;
        Ok(())
    }

    async fn count(&self, bucket: Bucket) -> Result<u64, StoreError> {
        self.local.count(bucket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::server::testing::{spawn_server, TestServer};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    struct TestContext {
        store: SyncedStore,
        _temp_dir: TempDir,
    }

    async fn setup(remote: Option<RemoteStore>) -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("cache.db")).await.unwrap();
        TestContext {
            store: SyncedStore::new(LocalStore::new(pool), remote),
            _temp_dir: temp_dir,
        }
    }

    fn unreachable_remote() -> RemoteStore {
        RemoteStore::new("http://127.0.0.1:1", "k", Duration::from_secs(1)).unwrap()
    }

    async fn connected() -> (TestContext, TestServer) {
        let server = spawn_server().await;
        let ctx = setup(Some(server.remote())).await;
        (ctx, server)
    }

    #[tokio::test]
    async fn test_write_then_list_with_remote_down() {
        let ctx = setup(Some(unreachable_remote())).await;

        let created = ctx
            .store
            .create(Bucket::Checkins, json!({"student_name": "Ana"}))
            .await
            .unwrap();

        let listed = ctx.store.list(Bucket::Checkins).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(ctx.store.local().dirty_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_confirmed_by_remote_is_clean() {
        let (ctx, server) = connected().await;

        let created = ctx
            .store
            .create(Bucket::Courses, json!({"name": "1°A"}))
            .await
            .unwrap();

        assert_eq!(ctx.store.local().dirty_count().await.unwrap(), 0);
        let remote_copy = server.remote().fetch(Bucket::Courses, created.id).await.unwrap();
        assert_eq!(remote_copy, created);
    }

    #[tokio::test]
    async fn test_delete_purges_tombstone_once_confirmed() {
        let (ctx, server) = connected().await;

        let created = ctx
            .store
            .create(Bucket::Courses, json!({"name": "1°A"}))
            .await
            .unwrap();
        ctx.store.delete(Bucket::Courses, created.id).await.unwrap();

        assert!(ctx.store.local().entries(Bucket::Courses).await.unwrap().is_empty());
        assert_eq!(server.remote().tally(Bucket::Courses).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let ctx = setup(None).await;
        ctx.store
            .create(Bucket::Courses, json!({"name": "1°A"}))
            .await
            .unwrap();

        let result = ctx.store.delete(Bucket::Courses, Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(ctx.store.count(Bucket::Courses).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_without_remote_fails() {
        let ctx = setup(None).await;
        let result = ctx.store.reconcile(Bucket::Students).await;
        assert!(matches!(
            result,
            Err(StoreError::Remote(RemoteError::NotConfigured))
        ));
    }

    #[tokio::test]
    async fn test_reconcile_pushes_offline_writes() {
        let server = spawn_server().await;
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("cache.db")).await.unwrap();

        // Written while offline
        let offline = SyncedStore::new(LocalStore::new(pool.clone()), Some(unreachable_remote()));
        let created = offline
            .create(Bucket::Students, json!({"first_name": "Ana"}))
            .await
            .unwrap();

        let online = SyncedStore::new(LocalStore::new(pool), Some(server.remote()));
        let summary = online.reconcile(Bucket::Students).await.unwrap();
        assert_eq!(summary.pushed, 1);
        assert_eq!(online.local().dirty_count().await.unwrap(), 0);

        let remote_copy = server.remote().fetch(Bucket::Students, created.id).await.unwrap();
        assert_eq!(remote_copy.data["first_name"], "Ana");

        // Nothing left to do
        assert!(online.reconcile(Bucket::Students).await.unwrap().is_noop());
    }

    #[tokio::test]
    async fn test_reconcile_pulls_newer_and_drops_deleted() {
        let (ctx, server) = connected().await;
        let remote = server.remote();

        let kept = ctx
            .store
            .create(Bucket::Incidents, json!({"status": "pending"}))
            .await
            .unwrap();
        let gone = ctx
            .store
            .create(Bucket::Incidents, json!({"status": "pending"}))
            .await
            .unwrap();

        // Another device edits one record, deletes the other and adds a third
        remote
            .patch(Bucket::Incidents, kept.id, json!({"status": "resolved"}))
            .await
            .unwrap();
        remote.remove(Bucket::Incidents, gone.id).await.unwrap();
        let added = remote
            .insert(Bucket::Incidents, json!({"status": "in-progress"}))
            .await
            .unwrap();

        let summary = ctx.store.reconcile(Bucket::Incidents).await.unwrap();
        assert_eq!(summary.pulled, 2);
        assert_eq!(summary.removed_locally, 1);

        let local = ctx.store.get(Bucket::Incidents, kept.id).await.unwrap().unwrap();
        assert_eq!(local.data["status"], "resolved");
        assert!(ctx.store.get(Bucket::Incidents, gone.id).await.unwrap().is_none());
        assert!(ctx.store.get(Bucket::Incidents, added.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_local_edit_wins_when_newer() {
        let server = spawn_server().await;
        let remote = server.remote();
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("cache.db")).await.unwrap();

        let online = SyncedStore::new(LocalStore::new(pool.clone()), Some(remote.clone()));
        let created = online
            .create(Bucket::Incidents, json!({"status": "pending"}))
            .await
            .unwrap();

        let offline = SyncedStore::new(LocalStore::new(pool), Some(unreachable_remote()));
        offline
            .update(Bucket::Incidents, created.id, json!({"status": "resolved"}))
            .await
            .unwrap();

        let summary = online.reconcile(Bucket::Incidents).await.unwrap();
        assert_eq!(summary.pushed, 1);
        let remote_copy = remote.fetch(Bucket::Incidents, created.id).await.unwrap();
        assert_eq!(remote_copy.data["status"], "resolved");
    }
}
