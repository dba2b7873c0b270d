//! Application context shared by every command.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{init_db, LocalStore};
use crate::remote::RemoteStore;
use crate::report::{ChatClient, ReportComposer};
use crate::store::SyncedStore;

/// Everything a command needs, created once at startup.
pub struct App {
    pub config: Config,
    pool: SqlitePool,
    pub store: SyncedStore,
    pub composer: ReportComposer,
}

impl App {
    /// Opens the local cache and wires the remote and AI backends that are
    /// configured. Missing backends are not an error: writes stay local and
    /// reports use the local template.
    pub async fn init(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = init_db(&config.database_path.value).await?;

        let remote = if config.remote.is_configured() {
            let remote = RemoteStore::from_config(&config.remote)?;
            tracing::debug!("Remote table API at {}", remote.base_url());
            Some(remote)
        } else {
            None
        };
        let store = SyncedStore::new(LocalStore::new(pool.clone()), remote);

        let mut composer = ReportComposer::new(config.school_name.value.clone());
        if config.ai.is_configured() {
            composer = composer.with_generator(Arc::new(ChatClient::from_config(&config.ai)?));
        }

        Ok(Self {
            config,
            pool,
            store,
            composer,
        })
    }

    /// Reconciles every bucket when auto-sync is on. Failures are logged,
    /// never returned.
    pub async fn auto_sync(&self) {
        if !self.config.remote.auto_sync || self.store.remote().is_none() {
            return;
        }
        match self.store.reconcile_all().await {
            Ok(summary) => tracing::info!("Auto-sync: {}", summary),
            Err(e) => tracing::warn!("Auto-sync failed: {}", e),
        }
    }

    pub async fn shutdown(self) {
        self.pool.close().await;
    }
}
