use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::OutputFormat;
use skolai::app::App;
use skolai::export::{render, write_report, ExportFormat, PageLayout};
use skolai::models::{CheckinRecord, IncidentRecord};
use skolai::report::{classify, Report, ReportPeriod, ReportStats};
use skolai::store::Repository;

#[derive(Args)]
pub struct ReportCommand {
    #[command(subcommand)]
    pub command: ReportSubcommand,
}

#[derive(Subcommand)]
pub enum ReportSubcommand {
    /// Compose the monthly report and write it to a file
    Generate {
        /// Month to report on (YYYY-MM, defaults to the current month)
        #[arg(long, short)]
        period: Option<ReportPeriod>,

        /// File format (text, html)
        #[arg(long, short, default_value = "text")]
        format: ExportFormat,

        /// Directory to write the report into
        #[arg(long, short, default_value = ".")]
        out: PathBuf,

        /// Characters per line on HTML pages
        #[arg(long)]
        width: Option<usize>,

        /// Lines per HTML page
        #[arg(long)]
        lines: Option<usize>,

        /// Print the report instead of writing a file
        #[arg(long)]
        print: bool,
    },

    /// Show the month's statistics without composing a narrative
    Stats {
        /// Month to summarize (YYYY-MM, defaults to the current month)
        #[arg(long, short)]
        period: Option<ReportPeriod>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

async fn load_records(
    app: &App,
) -> Result<(Vec<CheckinRecord>, Vec<IncidentRecord>), Box<dyn std::error::Error>> {
    let checkins = Repository::<CheckinRecord>::new(&app.store)
        .list()
        .await?
        .into_iter()
        .map(|c| c.record)
        .collect();
    let incidents = Repository::<IncidentRecord>::new(&app.store)
        .list()
        .await?
        .into_iter()
        .map(|i| i.record)
        .collect();
    Ok((checkins, incidents))
}

fn print_summary(report: &Report) {
    let stats = &report.stats;
    eprintln!(
        "{} {}: {} check-in(s), {} student(s), trend {}",
        report.period().month_name(),
        report.period().year,
        stats.record_count,
        stats.distinct_subject_count,
        report.band
    );
    eprintln!("Narrative: {}", report.source);
}

impl ReportCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ReportSubcommand::Generate {
                period,
                format,
                out,
                width,
                lines,
                print,
            } => {
                let period = period.unwrap_or_else(ReportPeriod::current);
                let (checkins, incidents) = load_records(app).await?;

                if !app.composer.has_generator() {
                    tracing::info!("No AI key configured, composing the narrative locally");
                }
                let report = app.composer.generate(period, &checkins, &incidents).await;
                if let Some(notice) = report.source.notice() {
                    eprintln!("{}", notice);
                }

                let defaults = PageLayout::default();
                let layout = PageLayout {
                    width: width.unwrap_or(defaults.width),
                    height: lines.unwrap_or(defaults.height),
                };

                if *print {
                    println!("{}", render(&report, *format, layout));
                    return Ok(());
                }

                let path = write_report(&report, out, *format, layout)?;
                print_summary(&report);
                println!("{}", path.display());
                Ok(())
            }

            ReportSubcommand::Stats { period, format } => {
                let period = period.unwrap_or_else(ReportPeriod::current);
                let (checkins, incidents) = load_records(app).await?;
                let stats = ReportStats::collect(period, &checkins, &incidents);
                let band = classify(&stats);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    }
                    OutputFormat::Text => {
                        println!("Period:        {} {}", period.month_name(), period.year);
                        println!("Check-ins:     {}", stats.record_count);
                        println!("Students:      {}", stats.distinct_subject_count);
                        println!("Average:       {:.1}/5", stats.average_score);
                        println!("Positive:      {:.1}%", stats.positive_ratio);
                        println!("Attention:     {:.1}%", stats.attention_ratio);
                        println!("Alerts:        {}", stats.alert_count);
                        println!("Participation: {:.0}%", stats.participation);
                        println!("Trend:         {}", band.label());

                        if !stats.emotion_distribution.is_empty() {
                            println!("\nEmotions:");
                            for entry in &stats.emotion_distribution {
                                println!("  {:<14} {}", entry.label, entry.count);
                            }
                        }
                        if !stats.follow_up.is_empty() {
                            println!("\nFollow-up:");
                            for student in &stats.follow_up {
                                println!("  {:<24} {} alert(s)", student.student, student.alerts);
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
