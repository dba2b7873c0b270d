use chrono::Local;
use clap::{Args, Subcommand};
use serde_json::json;

use super::{confirm, find, short_id, truncate, OutputFormat};
use skolai::aggregate::{count_by_label, within};
use skolai::app::App;
use skolai::models::{IncidentRecord, IncidentStatus, IncidentSummary, Severity, Stored, CATEGORIES};
use skolai::report::ReportPeriod;
use skolai::store::Repository;

#[derive(Args)]
pub struct IncidentCommand {
    #[command(subcommand)]
    pub command: IncidentSubcommand,
}

#[derive(Subcommand)]
pub enum IncidentSubcommand {
    /// Report an incident
    Create {
        /// Student involved
        #[arg(long, short)]
        student: String,

        /// Severity (mild, moderate, severe)
        #[arg(long)]
        severity: Severity,

        /// Category (see `incident categories`)
        #[arg(long, short)]
        category: String,

        /// What happened
        #[arg(long, short)]
        description: String,

        /// Action taken so far
        #[arg(long)]
        action: Option<String>,
    },

    /// List incidents, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only incidents with this status
        #[arg(long)]
        status: Option<IncidentStatus>,

        /// Only incidents with this severity
        #[arg(long)]
        severity: Option<Severity>,

        /// Only this student's incidents
        #[arg(long)]
        student: Option<String>,
    },

    /// Show an incident
    Show {
        /// Incident ID or ID prefix
        identifier: String,
    },

    /// Change an incident's status
    Status {
        /// Incident ID or ID prefix
        identifier: String,

        /// New status (pending, in-progress, resolved)
        status: IncidentStatus,
    },

    /// Mark an incident resolved
    Resolve {
        /// Incident ID or ID prefix
        identifier: String,
    },

    /// Summary counts
    Stats {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only incidents in this month (YYYY-MM)
        #[arg(long, short)]
        period: Option<ReportPeriod>,
    },

    /// List the usual incident categories
    Categories,

    /// Delete an incident
    Delete {
        /// Incident ID or ID prefix
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

async fn set_status(
    repo: &Repository<'_, IncidentRecord>,
    identifier: &str,
    status: IncidentStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    let incident = find(repo, identifier, "Incident").await?;
    let updated = repo
        .update(incident.id, json!({ "status": status }))
        .await?;
    println!(
        "Incident {} ({}): {} -> {}",
        short_id(&updated),
        updated.record.student_name,
        incident.record.status,
        updated.record.status
    );
    Ok(())
}

impl IncidentCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<IncidentRecord>::new(&app.store);

        match &self.command {
            IncidentSubcommand::Create {
                student,
                severity,
                category,
                description,
                action,
            } => {
                let mut incident =
                    IncidentRecord::new(student.trim(), *severity, category.trim(), description.trim());
                if let Some(action) = action {
                    incident = incident.with_action_taken(action.trim());
                }

                let created = repo.create(&incident).await?;
                println!("Reported incident {}:", short_id(&created));
                println!("{}", created.record);
                Ok(())
            }

            IncidentSubcommand::List {
                format,
                status,
                severity,
                student,
            } => {
                let mut incidents = repo.list().await?;
                if let Some(status) = status {
                    incidents.retain(|i| i.record.status == *status);
                }
                if let Some(severity) = severity {
                    incidents.retain(|i| i.record.severity == *severity);
                }
                if let Some(student) = student {
                    let wanted = student.trim().to_lowercase();
                    incidents.retain(|i| i.record.student_name.trim().to_lowercase() == wanted);
                }
                incidents.sort_by(|a, b| b.record.reported_at.cmp(&a.record.reported_at));

                if incidents.is_empty() {
                    println!("No incidents found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&incidents)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<8}  {:<10}  {:<20}  {:<9}  {:<11}  CATEGORY",
                            "ID", "DATE", "STUDENT", "SEVERITY", "STATUS"
                        );
                        println!("{}", "-".repeat(90));
                        for incident in &incidents {
                            let record = &incident.record;
                            println!(
                                "{:<8}  {:<10}  {:<20}  {:<9}  {:<11}  {}",
                                short_id(incident),
                                record.reported_at.with_timezone(&Local).format("%Y-%m-%d"),
                                truncate(&record.student_name, 20),
                                record.severity.to_string(),
                                record.status.to_string(),
                                truncate(&record.category, 24)
                            );
                        }
                        let summary = IncidentSummary::from_records(incidents.iter().map(|i| &i.record));
                        println!(
                            "\nTotal: {} incident(s), {} pending, {} serious",
                            summary.total, summary.pending, summary.serious
                        );
                    }
                }
                Ok(())
            }

            IncidentSubcommand::Show { identifier } => {
                let incident = find(&repo, identifier, "Incident").await?;
                println!("{}", incident.record);
                println!("ID: {}", incident.id);
                Ok(())
            }

            IncidentSubcommand::Status { identifier, status } => {
                set_status(&repo, identifier, *status).await
            }

            IncidentSubcommand::Resolve { identifier } => {
                set_status(&repo, identifier, IncidentStatus::Resolved).await
            }

            IncidentSubcommand::Stats { format, period } => {
                let incidents: Vec<Stored<IncidentRecord>> = repo.list().await?;
                let records: Vec<IncidentRecord> = match period {
                    Some(period) => within(&incidents, period.start(), period.end())
                        .into_iter()
                        .map(|i| i.record.clone())
                        .collect(),
                    None => incidents.into_iter().map(|i| i.record).collect(),
                };

                let summary = IncidentSummary::from_records(&records);
                let by_category = count_by_label(&records, |i| i.category.trim().to_string());

                match format {
                    OutputFormat::Json => {
                        let stats = json!({
                            "summary": summary,
                            "by_category": by_category,
                        });
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    }
                    OutputFormat::Text => {
                        println!("Total incidents:   {}", summary.total);
                        println!("Pending:           {}", summary.pending);
                        println!("Serious:           {}", summary.serious);
                        if !by_category.is_empty() {
                            let mut categories: Vec<_> = by_category.into_iter().collect();
                            categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                            println!("\nBy category:");
                            for (category, count) in categories {
                                println!("  {:<32} {}", category, count);
                            }
                        }
                    }
                }
                Ok(())
            }

            IncidentSubcommand::Categories => {
                for category in CATEGORIES {
                    println!("{}", category);
                }
                Ok(())
            }

            IncidentSubcommand::Delete { identifier, force } => {
                let incident = find(&repo, identifier, "Incident").await?;

                if !force
                    && !confirm(&format!(
                        "Delete incident for '{}'?",
                        incident.record.student_name
                    ))?
                {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                repo.delete(incident.id).await?;
                println!("Deleted incident {}", short_id(&incident));
                Ok(())
            }
        }
    }
}
