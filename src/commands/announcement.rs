use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use super::{confirm, find, short_id, truncate, OutputFormat};
use skolai::app::App;
use skolai::models::Announcement;
use skolai::store::Repository;

#[derive(Args)]
pub struct AnnouncementCommand {
    #[command(subcommand)]
    pub command: AnnouncementSubcommand,
}

#[derive(Subcommand)]
pub enum AnnouncementSubcommand {
    /// Publish an announcement
    Create {
        /// Title
        title: String,

        /// Body text
        body: String,
    },

    /// List announcements, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show at most this many
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Show an announcement
    Show {
        /// Announcement ID or ID prefix
        identifier: String,
    },

    /// Edit an announcement
    Update {
        /// Announcement ID or ID prefix
        identifier: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        body: Option<String>,
    },

    /// Delete an announcement
    Delete {
        /// Announcement ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl AnnouncementCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<Announcement>::new(&app.store);

        match &self.command {
            AnnouncementSubcommand::Create { title, body } => {
                let created = repo
                    .create(&Announcement::new(title.trim(), body.trim()))
                    .await?;
                println!("Published announcement {}:", short_id(&created));
                println!("{}", created.record);
                Ok(())
            }

            AnnouncementSubcommand::List { format, limit } => {
                let mut announcements = repo.list().await?;
                announcements.sort_by(|a, b| b.record.published_at.cmp(&a.record.published_at));
                if let Some(limit) = limit {
                    announcements.truncate(*limit);
                }

                if announcements.is_empty() {
                    println!("No announcements found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&announcements)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<8}  {:<10}  TITLE", "ID", "DATE");
                        println!("{}", "-".repeat(70));
                        for announcement in &announcements {
                            println!(
                                "{:<8}  {:<10}  {}",
                                short_id(announcement),
                                announcement.record.published_at.format("%Y-%m-%d"),
                                truncate(&announcement.record.title, 48)
                            );
                        }
                        println!("\nTotal: {} announcement(s)", announcements.len());
                    }
                }
                Ok(())
            }

            AnnouncementSubcommand::Show { identifier } => {
                let announcement = find(&repo, identifier, "Announcement").await?;
                println!("{}", announcement.record);
                Ok(())
            }

            AnnouncementSubcommand::Update {
                identifier,
                title,
                body,
            } => {
                let mut patch = Map::new();
                for (field, value) in [("title", title), ("body", body)] {
                    if let Some(value) = value {
                        patch.insert(field.to_string(), Value::String(value.trim().to_string()));
                    }
                }
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let announcement = find(&repo, identifier, "Announcement").await?;
                let updated = repo.update(announcement.id, Value::Object(patch)).await?;
                println!("Updated announcement:");
                println!("{}", updated.record);
                Ok(())
            }

            AnnouncementSubcommand::Delete { identifier, force } => {
                let announcement = find(&repo, identifier, "Announcement").await?;
                let title = &announcement.record.title;

                if !force && !confirm(&format!("Delete announcement '{}'?", title))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                repo.delete(announcement.id).await?;
                println!("Deleted announcement: {}", title);
                Ok(())
            }
        }
    }
}
