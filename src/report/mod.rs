//! Monthly wellbeing report.
//!
//! [`ReportStats`] condenses a month of check-ins and incidents,
//! [`classify`] places it in a [`Band`], and [`ReportComposer`] asks a
//! [`TextGenerator`] for the narrative, using the local template whenever the
//! generator cannot deliver one.

mod classify;
mod composer;
mod fallback;
mod generator;
mod prompt;
pub(crate) mod stats;

pub use classify::{classify, recommendations, Band};
pub use composer::{ComposedNarrative, ReportComposer};
pub use generator::{ChatClient, GenerationError, TextGenerator};
pub use prompt::{build_messages, ChatMessage, Role};
pub use stats::{FollowUp, IncidentStats, LabelCount, ReportStats};

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
}

impl ReportPeriod {
    /// Returns `None` unless `month` is 1 through 12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing today's local date.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Last day of the month.
    pub fn end(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.pred_opt())
            .unwrap_or_default()
    }

    pub fn days(&self) -> u32 {
        self.end().day()
    }

    /// Spanish month name.
    pub fn month_name(&self) -> &'static str {
        MONTHS[(self.month.clamp(1, 12) - 1) as usize]
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid period '{}'. Expected YYYY-MM (e.g., 2025-03)", s);
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        ReportPeriod::new(year, month).ok_or_else(invalid)
    }
}

/// Why the local template was used instead of a generated narrative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum FallbackReason {
    /// Nothing to analyse in the period
    NoData,
    /// No generative backend configured
    NotConfigured,
    /// The backend rejected the API key
    Unauthorized,
    /// The backend's quota or rate limit was hit
    RateLimited,
    /// Any other failure
    Unavailable(String),
}

impl FallbackReason {
    /// Notice shown next to the report when the operator has to act.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            FallbackReason::Unauthorized => Some(
                "⚠️ La IA rechazó la API Key. Verifica la configuración (ai.api_key).",
            ),
            FallbackReason::RateLimited => Some(
                "⚠️ Se alcanzó el límite de uso de la IA. Intenta nuevamente más tarde.",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoData => write!(f, "no check-ins in period"),
            FallbackReason::NotConfigured => write!(f, "AI not configured"),
            FallbackReason::Unauthorized => write!(f, "AI rejected the API key"),
            FallbackReason::RateLimited => write!(f, "AI rate limit reached"),
            FallbackReason::Unavailable(e) => write!(f, "AI unavailable: {}", e),
        }
    }
}

impl From<&GenerationError> for FallbackReason {
    fn from(e: &GenerationError) -> Self {
        match e {
            GenerationError::NotConfigured => FallbackReason::NotConfigured,
            GenerationError::Unauthorized => FallbackReason::Unauthorized,
            GenerationError::RateLimited => FallbackReason::RateLimited,
            other => FallbackReason::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NarrativeSource {
    Generated { model: String },
    Fallback { reason: FallbackReason },
}

impl NarrativeSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, NarrativeSource::Fallback { .. })
    }

    pub fn notice(&self) -> Option<&'static str> {
        match self {
            NarrativeSource::Fallback { reason } => reason.notice(),
            NarrativeSource::Generated { .. } => None,
        }
    }
}

impl fmt::Display for NarrativeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeSource::Generated { model } => write!(f, "generated by {}", model),
            NarrativeSource::Fallback { reason } => write!(f, "local template ({})", reason),
        }
    }
}

/// A composed monthly report. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub school_name: String,
    pub generated_at: DateTime<Utc>,
    pub stats: ReportStats,
    pub band: Band,
    pub recommendations: Vec<String>,
    pub narrative: String,
    pub source: NarrativeSource,
}

impl Report {
    pub fn period(&self) -> ReportPeriod {
        self.stats.period
    }
}
