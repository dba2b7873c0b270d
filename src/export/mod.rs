//! Report export to plain text and paginated HTML.

mod html;
pub mod markup;
mod paginate;
mod text;

pub use html::{escape, paginate_report, render_html};
pub use paginate::{Line, LineKind, Page, PageLayout};
pub use text::render_text;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::report::{Report, ReportPeriod};

#[derive(Debug)]
pub enum ExportError {
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(path, e) => write!(f, "Failed to write {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(_, e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Text => write!(f, "text"),
            ExportFormat::Html => write!(f, "html"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "html" | "pdf" => Ok(ExportFormat::Html),
            _ => Err(format!(
                "Invalid export format '{}'. Valid options: text, html",
                s
            )),
        }
    }
}

/// File name without extension, e.g. `Informe_Marzo_2025`.
pub fn file_stem(period: ReportPeriod) -> String {
    format!("Informe_{}_{}", period.month_name(), period.year)
}

/// Renders the report in `format`.
pub fn render(report: &Report, format: ExportFormat, layout: PageLayout) -> String {
    match format {
        ExportFormat::Text => render_text(report),
        ExportFormat::Html => render_html(report, layout),
    }
}

/// Writes the report into `dir`, creating it if needed, and returns the
/// path of the new file.
pub fn write_report(
    report: &Report,
    dir: &Path,
    format: ExportFormat,
    layout: PageLayout,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io(dir.to_path_buf(), e))?;

    let path = dir.join(format!(
        "{}.{}",
        file_stem(report.period()),
        format.extension()
    ));
    std::fs::write(&path, render(report, format, layout))
        .map_err(|e| ExportError::Io(path.clone(), e))?;

    tracing::info!("Exported {} report to {}", format, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::stats::tests::{march, scenario_checkins};
    use crate::report::ReportComposer;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(march()), "Informe_Marzo_2025");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        let err = "docx".parse::<ExportFormat>().unwrap_err();
        assert!(err.contains("Valid options"));
    }

    #[tokio::test]
    async fn test_write_report_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("informes");
        let report = ReportComposer::new("Liceo")
            .generate(march(), &scenario_checkins(), &[])
            .await;

        let text_path =
            write_report(&report, &out, ExportFormat::Text, PageLayout::default()).unwrap();
        assert_eq!(text_path, out.join("Informe_Marzo_2025.txt"));
        let content = std::fs::read_to_string(&text_path).unwrap();
        assert!(content.starts_with("INFORME MENSUAL - SKOLAI"));

        let html_path =
            write_report(&report, &out, ExportFormat::Html, PageLayout::default()).unwrap();
        assert_eq!(html_path, out.join("Informe_Marzo_2025.html"));
        let content = std::fs::read_to_string(&html_path).unwrap();
        assert!(content.contains("<section class=\"page\""));
    }

    #[tokio::test]
    async fn test_write_into_file_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let report = ReportComposer::new("Liceo")
            .generate(march(), &[], &[])
            .await;

        let result = write_report(&report, &blocker, ExportFormat::Text, PageLayout::default());
        assert!(matches!(result, Err(ExportError::Io(_, _))));
    }
}
