use chrono::Local;
use clap::{Args, Subcommand};

use super::{truncate, OutputFormat};
use skolai::aggregate::within;
use skolai::app::App;
use skolai::models::{greeting, CheckinRecord, Emotion, Stored};
use skolai::report::ReportPeriod;
use skolai::store::Repository;

#[derive(Args)]
pub struct CheckinCommand {
    #[command(subcommand)]
    pub command: CheckinSubcommand,
}

#[derive(Subcommand)]
pub enum CheckinSubcommand {
    /// Record how a student feels right now
    New {
        /// Student name
        #[arg(long, short)]
        student: String,

        /// Emotion label or emoji (enojado, triste, normal, bien, muy feliz)
        #[arg(long, short)]
        emotion: Emotion,

        /// What the student wants to share
        #[arg(long, short)]
        note: Option<String>,
    },

    /// Show check-in history, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only this student's check-ins
        #[arg(long, short)]
        student: Option<String>,

        /// Only check-ins in this month (YYYY-MM)
        #[arg(long, short)]
        period: Option<ReportPeriod>,

        /// Only check-ins that need follow-up
        #[arg(long)]
        alerts: bool,

        /// Show at most this many
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// List the emotions offered by the kiosk
    Emotions,
}

impl CheckinCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = Repository::<CheckinRecord>::new(&app.store);

        match &self.command {
            CheckinSubcommand::New {
                student,
                emotion,
                note,
            } => {
                let mut checkin = CheckinRecord::new(student.trim(), emotion.clone());
                if let Some(note) = note {
                    checkin = checkin.with_note(note.trim());
                }

                let created = repo.create(&checkin).await?;
                let checkin = &created.record;
                println!("{}", greeting(Local::now()));
                println!(
                    "Hola {}, te sientes {} {}",
                    checkin.student_name,
                    checkin.emotion.label().to_lowercase(),
                    checkin.emotion.emoji()
                );
                println!();
                println!("{}", checkin.acknowledgment());
                if checkin.needs_attention() {
                    tracing::info!("Check-in {} flagged for follow-up", created.id);
                }
                Ok(())
            }

            CheckinSubcommand::List {
                format,
                student,
                period,
                alerts,
                limit,
            } => {
                let mut checkins: Vec<Stored<CheckinRecord>> = repo.list().await?;
                if let Some(period) = period {
                    let in_period: Vec<Stored<CheckinRecord>> =
                        within(&checkins, period.start(), period.end())
                            .into_iter()
                            .cloned()
                            .collect();
                    checkins = in_period;
                }
                if let Some(student) = student {
                    let wanted = student.trim().to_lowercase();
                    checkins.retain(|c| c.record.student_name.trim().to_lowercase() == wanted);
                }
                if *alerts {
                    checkins.retain(|c| c.record.needs_attention());
                }
                checkins.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
                if let Some(limit) = limit {
                    checkins.truncate(*limit);
                }

                if checkins.is_empty() {
                    println!("No check-ins found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&checkins)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<16}  {:<24}  {:<14}  NOTE", "DATE", "STUDENT", "EMOTION");
                        println!("{}", "-".repeat(80));
                        for checkin in &checkins {
                            let record = &checkin.record;
                            let flag = if record.needs_attention() { " ⚠️" } else { "" };
                            println!(
                                "{:<16}  {:<24}  {} {:<12}  {}{}",
                                record
                                    .timestamp
                                    .with_timezone(&Local)
                                    .format("%Y-%m-%d %H:%M"),
                                truncate(&record.student_name, 24),
                                record.emotion.emoji(),
                                truncate(record.emotion.label(), 12),
                                truncate(&record.note, 30),
                                flag
                            );
                        }
                        println!("\nTotal: {} check-in(s)", checkins.len());
                    }
                }
                Ok(())
            }

            CheckinSubcommand::Emotions => {
                for emotion in Emotion::KIOSK {
                    println!("{}  {}", emotion.emoji(), emotion.label());
                }
                Ok(())
            }
        }
    }
}
