use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use super::{confirm, find, short_id, truncate, OutputFormat};
use skolai::app::App;
use skolai::models::Teacher;
use skolai::store::Repository;

#[derive(Args)]
pub struct TeacherCommand {
    #[command(subcommand)]
    pub command: TeacherSubcommand,
}

#[derive(Subcommand)]
pub enum TeacherSubcommand {
    /// Register a teacher
    Create {
        /// Full name
        name: String,

        #[arg(long)]
        email: Option<String>,

        /// Subject taught
        #[arg(long)]
        subject: Option<String>,
    },

    /// List teachers
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only teachers of this subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Update a teacher
    Update {
        /// Teacher ID or ID prefix
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        subject: Option<String>,
    },

    /// Delete a teacher
    Delete {
        /// Teacher ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl TeacherCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<Teacher>::new(&app.store);

        match &self.command {
            TeacherSubcommand::Create {
                name,
                email,
                subject,
            } => {
                let mut teacher = Teacher::new(name.trim());
                teacher.email = email.clone().unwrap_or_default();
                teacher.subject = subject.clone().unwrap_or_default();

                let created = repo.create(&teacher).await?;
                println!("Created teacher {}: {}", short_id(&created), created.record);
                Ok(())
            }

            TeacherSubcommand::List { format, subject } => {
                let mut teachers = repo.list().await?;
                if let Some(subject) = subject {
                    let wanted = subject.to_lowercase();
                    teachers.retain(|t| t.record.subject.to_lowercase().contains(&wanted));
                }

                if teachers.is_empty() {
                    println!("No teachers found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&teachers)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<8}  {:<30}  {:<20}  EMAIL", "ID", "NAME", "SUBJECT");
                        println!("{}", "-".repeat(80));
                        for teacher in &teachers {
                            println!(
                                "{:<8}  {:<30}  {:<20}  {}",
                                short_id(teacher),
                                truncate(&teacher.record.name, 30),
                                truncate(&teacher.record.subject, 20),
                                teacher.record.email
                            );
                        }
                        println!("\nTotal: {} teacher(s)", teachers.len());
                    }
                }
                Ok(())
            }

            TeacherSubcommand::Update {
                identifier,
                name,
                email,
                subject,
            } => {
                let mut patch = Map::new();
                for (field, value) in [("name", name), ("email", email), ("subject", subject)] {
                    if let Some(value) = value {
                        patch.insert(field.to_string(), Value::String(value.trim().to_string()));
                    }
                }
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let teacher = find(&repo, identifier, "Teacher").await?;
                let updated = repo.update(teacher.id, Value::Object(patch)).await?;
                println!("Updated teacher: {}", updated.record);
                Ok(())
            }

            TeacherSubcommand::Delete { identifier, force } => {
                let teacher = find(&repo, identifier, "Teacher").await?;

                if !force && !confirm(&format!("Delete teacher '{}'?", teacher.record.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                repo.delete(teacher.id).await?;
                println!("Deleted teacher: {}", teacher.record.name);
                Ok(())
            }
        }
    }
}
