use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{require, Record, ValidationError};
use super::Bucket;

/// Suggested incident categories; any non-empty text is accepted.
pub const CATEGORIES: [&str; 9] = [
    "Bullying",
    "Conflicto entre pares",
    "Agresión física",
    "Agresión verbal",
    "Uso indebido de tecnología",
    "Falta de respeto al docente",
    "Bajo rendimiento emocional",
    "Problema familiar",
    "Otro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "leve")]
    Mild,
    #[serde(alias = "grave")]
    Moderate,
    #[serde(alias = "muy-grave")]
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Mild => write!(f, "mild"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mild" | "leve" => Ok(Severity::Mild),
            "moderate" | "grave" => Ok(Severity::Moderate),
            "severe" | "muy-grave" => Ok(Severity::Severe),
            _ => Err(format!(
                "Invalid severity '{}'. Valid options: mild, moderate, severe",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentStatus {
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "en-proceso")]
    InProgress,
    #[serde(alias = "resuelto")]
    Resolved,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentStatus::Pending => write!(f, "pending"),
            IncidentStatus::InProgress => write!(f, "in-progress"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "pendiente" => Ok(IncidentStatus::Pending),
            "in-progress" | "en-proceso" => Ok(IncidentStatus::InProgress),
            "resolved" | "resuelto" => Ok(IncidentStatus::Resolved),
            _ => Err(format!(
                "Invalid status '{}'. Valid options: pending, in-progress, resolved",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentRecord {
    pub student_name: String,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub action_taken: String,
    pub status: IncidentStatus,
    pub reported_at: DateTime<Utc>,
}

impl IncidentRecord {
    pub fn new(
        student_name: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            student_name: student_name.into(),
            severity,
            category: category.into(),
            description: description.into(),
            action_taken: String::new(),
            status: IncidentStatus::Pending,
            reported_at: Utc::now(),
        }
    }

    pub fn with_action_taken(mut self, action: impl Into<String>) -> Self {
        self.action_taken = action.into();
        self
    }

    pub fn with_status(mut self, status: IncidentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_serious(&self) -> bool {
        matches!(self.severity, Severity::Moderate | Severity::Severe)
    }
}

impl Record for IncidentRecord {
    const BUCKET: Bucket = Bucket::Incidents;
    const PATCHABLE: Option<&'static [&'static str]> = Some(&["status"]);

    fn validate(&self) -> Result<(), ValidationError> {
        require("student_name", &self.student_name)?;
        require("category", &self.category)?;
        require("description", &self.description)?;
        Ok(())
    }
}

impl fmt::Display for IncidentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.student_name, self.category)?;
        writeln!(f, "Severity: {}", self.severity)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Reported: {}", self.reported_at.format("%Y-%m-%d %H:%M"))?;
        writeln!(f, "\n{}", self.description)?;
        if !self.action_taken.is_empty() {
            writeln!(f, "\nAction taken: {}", self.action_taken)?;
        }
        Ok(())
    }
}

/// Totals shown above the incident list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentSummary {
    pub total: usize,
    pub pending: usize,
    pub serious: usize,
}

impl IncidentSummary {
    pub fn from_records<'a>(incidents: impl IntoIterator<Item = &'a IncidentRecord>) -> Self {
        let mut summary = Self::default();
        for incident in incidents {
            summary.total += 1;
            if incident.status == IncidentStatus::Pending {
                summary.pending += 1;
            }
            if incident.is_serious() {
                summary.serious += 1;
            }
        }
        summary
    }
}
