use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};

use super::{confirm, find, short_id, truncate, OutputFormat};
use skolai::app::App;
use skolai::models::{Course, Student};
use skolai::store::Repository;

#[derive(Args)]
pub struct CourseCommand {
    #[command(subcommand)]
    pub command: CourseSubcommand,
}

#[derive(Subcommand)]
pub enum CourseSubcommand {
    /// Create a course
    Create {
        /// Course name (e.g., "7°A")
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List courses with their enrolment
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a course
    Update {
        /// Course ID or ID prefix
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a course
    Delete {
        /// Course ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl CourseCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<Course>::new(&app.store);

        match &self.command {
            CourseSubcommand::Create { name, description } => {
                let mut course = Course::new(name.trim());
                course.description = description.clone().unwrap_or_default();

                let created = repo.create(&course).await?;
                println!("Created course {}: {}", short_id(&created), created.record);
                Ok(())
            }

            CourseSubcommand::List { format } => {
                let courses = repo.list().await?;
                if courses.is_empty() {
                    println!("No courses found");
                    return Ok(());
                }

                // Students reference courses by label
                let students = Repository::<Student>::new(&app.store).list().await?;
                let enrolled = |name: &str| {
                    let name = name.trim().to_lowercase();
                    students
                        .iter()
                        .filter(|s| s.record.course.trim().to_lowercase() == name)
                        .count()
                };

                match format {
                    OutputFormat::Json => {
                        let rows: Vec<Value> = courses
                            .iter()
                            .map(|c| {
                                json!({
                                    "id": c.id,
                                    "name": c.record.name,
                                    "description": c.record.description,
                                    "students": enrolled(&c.record.name),
                                })
                            })
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&rows)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<8}  {:<16}  {:>8}  DESCRIPTION", "ID", "NAME", "STUDENTS");
                        println!("{}", "-".repeat(70));
                        for course in &courses {
                            println!(
                                "{:<8}  {:<16}  {:>8}  {}",
                                short_id(course),
                                truncate(&course.record.name, 16),
                                enrolled(&course.record.name),
                                truncate(&course.record.description, 30)
                            );
                        }
                        println!("\nTotal: {} course(s)", courses.len());
                    }
                }
                Ok(())
            }

            CourseSubcommand::Update {
                identifier,
                name,
                description,
            } => {
                let mut patch = Map::new();
                for (field, value) in [("name", name), ("description", description)] {
                    if let Some(value) = value {
                        patch.insert(field.to_string(), Value::String(value.trim().to_string()));
                    }
                }
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let course = find(&repo, identifier, "Course").await?;
                let updated = repo.update(course.id, Value::Object(patch)).await?;
                println!("Updated course: {}", updated.record);
                Ok(())
            }

            CourseSubcommand::Delete { identifier, force } => {
                let course = find(&repo, identifier, "Course").await?;

                if !force && !confirm(&format!("Delete course '{}'?", course.record.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                repo.delete(course.id).await?;
                println!("Deleted course: {}", course.record.name);
                Ok(())
            }
        }
    }
}
