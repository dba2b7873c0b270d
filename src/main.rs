use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{
    AnnouncementCommand, CheckinCommand, ConfigCommand, CourseCommand, DashboardCommand,
    ImportCommand, IncidentCommand, ReportCommand, StudentCommand, SyncCommand, TeacherCommand,
};
use skolai::app::App;
use skolai::config::Config;

#[derive(Parser)]
#[command(name = "skolai")]
#[command(version)]
#[command(about = "School administration with emotional check-ins and wellbeing reports", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage students
    Student(StudentCommand),

    /// Manage teachers
    Teacher(TeacherCommand),

    /// Manage courses
    Course(CourseCommand),

    /// Manage announcements
    Announcement(AnnouncementCommand),

    /// Emotional check-in kiosk and history
    Checkin(CheckinCommand),

    /// Track school-climate incidents
    Incident(IncidentCommand),

    /// Generate the monthly wellbeing report
    Report(ReportCommand),

    /// Show record counts
    Dashboard(DashboardCommand),

    /// Synchronize the local cache with the remote table API
    Sync(SyncCommand),

    /// Import data exported from the browser dashboard
    Import(ImportCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

impl Commands {
    /// Commands that may write records.
    fn writes(&self) -> bool {
        matches!(
            self,
            Commands::Student(_)
                | Commands::Teacher(_)
                | Commands::Course(_)
                | Commands::Announcement(_)
                | Commands::Checkin(_)
                | Commands::Incident(_)
                | Commands::Import(_)
        )
    }
}

fn init_tracing() {
    let filter = std::env::var("SKOLAI_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("skolai=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    // Config commands work without opening the database
    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let app = App::init(config).await?;
    let result = match &command {
        Commands::Student(cmd) => cmd.run(&app).await,
        Commands::Teacher(cmd) => cmd.run(&app).await,
        Commands::Course(cmd) => cmd.run(&app).await,
        Commands::Announcement(cmd) => cmd.run(&app).await,
        Commands::Checkin(cmd) => cmd.run(&app).await,
        Commands::Incident(cmd) => cmd.run(&app).await,
        Commands::Report(cmd) => cmd.run(&app).await,
        Commands::Dashboard(cmd) => cmd.run(&app).await,
        Commands::Sync(cmd) => cmd.run(&app).await,
        Commands::Import(cmd) => cmd.run(&app).await,
        Commands::Config(_) => Ok(()),
    };

    if result.is_ok() && command.writes() {
        app.auto_sync().await;
    }
    app.shutdown().await;
    result
}
