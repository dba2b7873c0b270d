use chrono::Local;
use clap::Args;

use super::OutputFormat;
use skolai::app::App;
use skolai::dashboard::{refresh_on_changes, DashboardCounts, Poller};
use skolai::models::Bucket;

#[derive(Args)]
pub struct DashboardCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Keep refreshing until interrupted
    #[arg(long, short)]
    pub watch: bool,
}

fn print_counts(counts: &DashboardCounts, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(counts)?),
        OutputFormat::Text => print!("{}", counts),
    }
    Ok(())
}

impl DashboardCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        if !self.watch {
            let counts = DashboardCounts::fetch(&app.store).await?;
            print_counts(&counts, self.format)?;
            return Ok(());
        }

        let store = app.store.clone();
        let handle = Poller::new(app.config.dashboard.poll_interval()).spawn(move || {
            let store = store.clone();
            async move { DashboardCounts::fetch(&store).await }
        });

        let feeds = match app.store.remote() {
            Some(remote) => match refresh_on_changes(remote, &Bucket::ALL, handle.trigger()).await {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!("Live updates unavailable, polling only: {}", e);
                    None
                }
            },
            None => None,
        };

        let mut rx = handle.subscribe();
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    if let Some(snapshot) = snapshot {
                        if matches!(self.format, OutputFormat::Text) {
                            println!(
                                "\n== {} ==",
                                snapshot.fetched_at.with_timezone(&Local).format("%H:%M:%S")
                            );
                        }
                        print_counts(&snapshot.value, self.format)?;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        handle.stop();
        if let Some(task) = feeds {
            task.abort();
        }
        Ok(())
    }
}
