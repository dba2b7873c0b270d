use clap::{Args, Subcommand};
use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::{confirm, find, short_id, truncate, OutputFormat};
use skolai::app::App;
use skolai::models::Student;
use skolai::store::Repository;

#[derive(Args)]
pub struct StudentCommand {
    #[command(subcommand)]
    pub command: StudentSubcommand,
}

#[derive(Subcommand)]
pub enum StudentSubcommand {
    /// Register a student
    Create {
        /// First name
        first_name: String,

        /// Last name
        last_name: String,

        /// National id (RUT)
        #[arg(long)]
        rut: Option<String>,

        /// Course label (e.g., "7°A")
        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },

    /// List students
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only students in this course
        #[arg(long)]
        course: Option<String>,
    },

    /// Show a student's details
    Show {
        /// Student ID or ID prefix
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a student
    Update {
        /// Student ID or ID prefix
        identifier: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        rut: Option<String>,

        #[arg(long)]
        course: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },

    /// Delete a student
    Delete {
        /// Student ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl StudentCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<Student>::new(&app.store);

        match &self.command {
            StudentSubcommand::Create {
                first_name,
                last_name,
                rut,
                course,
                email,
                phone,
                birth_date,
            } => {
                let mut student = Student::new(first_name.trim(), last_name.trim());
                if let Some(course) = course {
                    student = student.with_course(course.trim());
                }
                student.rut = rut.clone().unwrap_or_default();
                student.email = email.clone().unwrap_or_default();
                student.phone = phone.clone().unwrap_or_default();
                student.birth_date = *birth_date;

                let created = repo.create(&student).await?;
                println!("Created student {}:", short_id(&created));
                println!("{}", created.record);
                Ok(())
            }

            StudentSubcommand::List { format, course } => {
                let mut students = repo.list().await?;
                if let Some(course) = course {
                    let wanted = course.trim().to_lowercase();
                    students.retain(|s| s.record.course.trim().to_lowercase() == wanted);
                }
                students.sort_by(|a, b| {
                    (a.record.last_name.to_lowercase(), a.record.first_name.to_lowercase())
                        .cmp(&(b.record.last_name.to_lowercase(), b.record.first_name.to_lowercase()))
                });

                if students.is_empty() {
                    println!("No students found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&students)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<8}  {:<32}  {:<10}  RUT", "ID", "NAME", "COURSE");
                        println!("{}", "-".repeat(70));
                        for student in &students {
                            println!(
                                "{:<8}  {:<32}  {:<10}  {}",
                                short_id(student),
                                truncate(&student.record.full_name(), 32),
                                truncate(&student.record.course, 10),
                                student.record.rut
                            );
                        }
                        println!("\nTotal: {} student(s)", students.len());
                    }
                }
                Ok(())
            }

            StudentSubcommand::Show { identifier, format } => {
                let student = find(&repo, identifier, "Student").await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&student)?),
                    OutputFormat::Text => {
                        println!("{}", student.record);
                        println!("ID: {}", student.id);
                    }
                }
                Ok(())
            }

            StudentSubcommand::Update {
                identifier,
                first_name,
                last_name,
                rut,
                course,
                email,
                phone,
                birth_date,
            } => {
                let mut patch = Map::new();
                let text_fields = [
                    ("first_name", first_name),
                    ("last_name", last_name),
                    ("rut", rut),
                    ("course", course),
                    ("email", email),
                    ("phone", phone),
                ];
                for (field, value) in text_fields {
                    if let Some(value) = value {
                        patch.insert(field.to_string(), Value::String(value.trim().to_string()));
                    }
                }
                if let Some(date) = birth_date {
                    patch.insert("birth_date".to_string(), Value::String(date.to_string()));
                }

                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let student = find(&repo, identifier, "Student").await?;
                let updated = repo.update(student.id, Value::Object(patch)).await?;
                println!("Updated student:");
                println!("{}", updated.record);
                Ok(())
            }

            StudentSubcommand::Delete { identifier, force } => {
                let student = find(&repo, identifier, "Student").await?;
                let name = student.record.full_name();

                if !force && !confirm(&format!("Delete student '{}'?", name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                repo.delete(student.id).await?;
                println!("Deleted student: {}", name);
                Ok(())
            }
        }
    }
}
