mod announcement;
mod checkin;
mod config_cmd;
mod course;
mod dashboard;
mod import;
mod incident;
mod report;
mod student;
mod sync_cmd;
mod teacher;

pub use announcement::AnnouncementCommand;
pub use checkin::CheckinCommand;
pub use config_cmd::ConfigCommand;
pub use course::CourseCommand;
pub use dashboard::DashboardCommand;
pub use import::ImportCommand;
pub use incident::IncidentCommand;
pub use report::ReportCommand;
pub use student::StudentCommand;
pub use sync_cmd::SyncCommand;
pub use teacher::TeacherCommand;

use clap::ValueEnum;
use std::error::Error;
use std::io::{self, Write};

use skolai::models::{Record, Stored};
use skolai::store::Repository;

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Looks a record up by id or id prefix.
pub(crate) async fn find<T: Record>(
    repo: &Repository<'_, T>,
    identifier: &str,
    kind: &str,
) -> Result<Stored<T>, Box<dyn Error>> {
    match repo.find(identifier).await? {
        Some(record) => Ok(record),
        None => Err(format!("{} not found: {}", kind, identifier).into()),
    }
}

/// Asks for a y/N confirmation on stdin.
pub(crate) fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Cuts `text` to `width` characters, marking the cut with "...".
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Short id shown in tables; any unique prefix works as an identifier.
pub(crate) fn short_id<T>(record: &Stored<T>) -> String {
    record.id.to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Muñoz", 10), "Muñoz");
        assert_eq!(truncate("Educación Física Avanzada", 10), "Educaci...");
    }
}
