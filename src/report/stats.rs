use serde::Serialize;
use std::collections::HashMap;

use super::ReportPeriod;
use crate::aggregate::{count_by_label, distinct_subjects, ratio, within};
use crate::models::{CheckinRecord, Emotion, IncidentRecord, IncidentSummary, Valence};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// A student with at least one check-in that needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    pub student: String,
    pub alerts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentStats {
    pub summary: IncidentSummary,
    pub by_severity: Vec<LabelCount>,
    pub by_category: Vec<LabelCount>,
}

/// Everything the report says about one month, computed from raw records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    pub period: ReportPeriod,
    pub record_count: usize,
    pub distinct_subject_count: usize,
    /// Check-ins per emotion, most frequent first
    pub emotion_distribution: Vec<LabelCount>,
    /// Percentage of Bien and Muy Feliz check-ins
    pub positive_ratio: f64,
    /// Percentage of check-ins with a negative emotion
    pub attention_ratio: f64,
    /// Mean wellbeing score on the 1-5 scale, 0 without check-ins
    pub average_score: f64,
    pub alert_count: usize,
    pub follow_up: Vec<FollowUp>,
    pub incidents: IncidentStats,
    /// Check-ins per day of the period as a percentage, capped at 100
    pub participation: f64,
}

impl ReportStats {
    /// Computes the statistics for `period`. Records dated outside it are
    /// ignored.
    pub fn collect(
        period: ReportPeriod,
        checkins: &[CheckinRecord],
        incidents: &[IncidentRecord],
    ) -> Self {
        let checkins: Vec<CheckinRecord> = within(checkins, period.start(), period.end())
            .into_iter()
            .cloned()
            .collect();
        let incidents: Vec<IncidentRecord> = within(incidents, period.start(), period.end())
            .into_iter()
            .cloned()
            .collect();

        let record_count = checkins.len();
        let average_score = if checkins.is_empty() {
            0.0
        } else {
            checkins
                .iter()
                .map(|c| f64::from(c.emotion.score()))
                .sum::<f64>()
                / record_count as f64
        };

        let alerts: Vec<&CheckinRecord> = checkins.iter().filter(|c| is_alert(c)).collect();
        let participation =
            (record_count as f64 * 100.0 / f64::from(period.days().max(1))).min(100.0);

        Self {
            period,
            record_count,
            distinct_subject_count: distinct_subjects(&checkins, |c| c.student_name.as_str()).len(),
            emotion_distribution: sorted_counts(count_by_label(&checkins, |c| {
                c.emotion.label().to_string()
            })),
            positive_ratio: ratio(&checkins, |c| c.emotion.valence() == Valence::Positive),
            attention_ratio: ratio(&checkins, |c| c.emotion.valence() == Valence::Negative),
            average_score,
            alert_count: alerts.len(),
            follow_up: follow_up(&alerts),
            incidents: IncidentStats {
                summary: IncidentSummary::from_records(&incidents),
                by_severity: sorted_counts(count_by_label(&incidents, |i| i.severity.to_string())),
                by_category: sorted_counts(count_by_label(&incidents, |i| i.category.trim().to_string())),
            },
            participation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Share of check-ins that raised an alert, as a percentage.
    pub fn alert_ratio(&self) -> f64 {
        if self.record_count == 0 {
            return 0.0;
        }
        self.alert_count as f64 * 100.0 / self.record_count as f64
    }
}

/// The report also counts worried students, beyond what the kiosk flags.
fn is_alert(checkin: &CheckinRecord) -> bool {
    checkin.needs_attention() || checkin.emotion == Emotion::Preocupado
}

fn sorted_counts(counts: HashMap<String, usize>) -> Vec<LabelCount> {
    let mut sorted: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    sorted
}

/// Students grouped by their trimmed name, most alerts first.
fn follow_up(alerts: &[&CheckinRecord]) -> Vec<FollowUp> {
    let mut per_student: HashMap<String, FollowUp> = HashMap::new();
    for checkin in alerts {
        let name = checkin.student_name.trim();
        per_student
            .entry(name.to_lowercase())
            .or_insert_with(|| FollowUp {
                student: name.to_string(),
                alerts: 0,
            })
            .alerts += 1;
    }

    let mut students: Vec<FollowUp> = per_student.into_values().collect();
    students.sort_by(|a, b| b.alerts.cmp(&a.alerts).then_with(|| a.student.cmp(&b.student)));
    students
}
