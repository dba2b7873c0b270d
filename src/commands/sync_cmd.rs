//! Sync CLI commands for reconciling the local cache with the remote.

use clap::{Args, Subcommand};

use skolai::app::App;
use skolai::config::mask_key;
use skolai::models::Bucket;
use skolai::remote::RemoteError;
use skolai::store::ReconcileSummary;

/// Sync with the remote table API
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Only reconcile this bucket
    #[arg(long, short)]
    bucket: Option<Bucket>,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and remote status
    Status,
}

impl SyncCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(app).await,
            Some(SyncSubcommand::Status) => self.status(app).await,
        }
    }

    async fn sync(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        if app.store.remote().is_none() {
            return Err(RemoteError::NotConfigured.into());
        }

        println!("Syncing with remote...");
        println!();

        let buckets: Vec<Bucket> = match self.bucket {
            Some(bucket) => vec![bucket],
            None => Bucket::ALL.to_vec(),
        };

        let mut total = ReconcileSummary::default();
        for bucket in buckets {
            let summary = app.store.reconcile(bucket).await?;
            let status = if summary.is_noop() {
                "✓ up to date".to_string()
            } else if summary.failed > 0 {
                format!("✗ {}", summary)
            } else {
                format!("✓ {}", summary)
            };
            println!("  {:<14} {}", bucket, status);
            total.merge(&summary);
        }

        println!();
        if total.is_noop() {
            println!("Already up to date.");
        } else if total.failed > 0 {
            println!(
                "Sync finished with {} change(s) still pending. Run `skolai sync` again later.",
                total.failed
            );
        } else {
            println!("Sync complete.");
        }
        Ok(())
    }

    async fn status(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let remote_config = &app.config.remote;

        println!("Sync Configuration");
        println!("==================");
        println!();

        let pending = app.store.local().dirty_count().await?;

        let (Some(base_url), Some(api_key)) = (&remote_config.base_url, &remote_config.api_key)
        else {
            println!("Status: Not configured");
            println!("Local changes: {}", pending);
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  remote:");
            println!("    base_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: false");
            println!();
            println!("Or set environment variables:");
            println!("  SKOLAI_REMOTE_URL");
            println!("  SKOLAI_REMOTE_API_KEY");
            return Ok(());
        };

        println!("Remote:        {}", base_url);
        println!("API Key:       {}", mask_key(api_key));
        println!(
            "Auto-sync:     {}",
            if remote_config.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Local changes: {}", pending);
        println!();

        print!("Remote status: ");
        match app.store.remote() {
            Some(remote) => match remote.health().await {
                Ok(()) => println!("✓ connected"),
                Err(RemoteError::Network(_)) => println!("✗ unreachable"),
                Err(e) => println!("✗ error: {}", e),
            },
            None => println!("✗ not initialized"),
        }

        Ok(())
    }
}
