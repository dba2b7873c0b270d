//! Summary statistics over record collections.
//!
//! Everything here is a pure function of its input. Fields are selected with
//! closures, so the same helpers serve check-ins, incidents or raw JSON.

use chrono::{DateTime, NaiveDate};
use std::collections::{HashMap, HashSet};

use crate::models::{Announcement, CheckinRecord, IncidentRecord, Stored};

/// Counts records per label. The counts always add up to `records.len()`.
pub fn count_by_label<T, F, L>(records: &[T], label_of: F) -> HashMap<String, usize>
where
    F: Fn(&T) -> L,
    L: Into<String>,
{
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(label_of(record).into()).or_insert(0) += 1;
    }
    counts
}

/// Percentage of records matching `predicate`, in `[0, 100]`.
///
/// An empty collection yields exactly `0.0`.
pub fn ratio<T, P>(records: &[T], predicate: P) -> f64
where
    P: Fn(&T) -> bool,
{
    if records.is_empty() {
        return 0.0;
    }
    let matching = records.iter().filter(|r| predicate(r)).count();
    matching as f64 * 100.0 / records.len() as f64
}

/// Distinct subjects, compared trimmed and case-insensitively. Blank
/// subjects are ignored.
pub fn distinct_subjects<T, F>(records: &[T], subject_of: F) -> HashSet<String>
where
    F: Fn(&T) -> &str,
{
    records
        .iter()
        .map(|r| subject_of(r).trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Records dated within `start..=end`, in their original order.
///
/// Records without a usable date are left out.
pub fn filter_by_date_range<'a, T, F>(
    records: &'a [T],
    start: NaiveDate,
    end: NaiveDate,
    date_of: F,
) -> Vec<&'a T>
where
    F: Fn(&T) -> Option<NaiveDate>,
{
    records
        .iter()
        .filter(|r| matches!(date_of(r), Some(date) if date >= start && date <= end))
        .collect()
}

/// Parses the date part of an RFC 3339 timestamp or a plain `YYYY-MM-DD`.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Records that carry the calendar date they describe.
pub trait Dated {
    fn date(&self) -> Option<NaiveDate>;
}

impl Dated for CheckinRecord {
    fn date(&self) -> Option<NaiveDate> {
        Some(self.timestamp.date_naive())
    }
}

impl Dated for IncidentRecord {
    fn date(&self) -> Option<NaiveDate> {
        Some(self.reported_at.date_naive())
    }
}

impl Dated for Announcement {
    fn date(&self) -> Option<NaiveDate> {
        Some(self.published_at.date_naive())
    }
}

impl<T: Dated> Dated for Stored<T> {
    fn date(&self) -> Option<NaiveDate> {
        self.record.date()
    }
}

impl Dated for serde_json::Value {
    /// Looks for the first date-like field the different record shapes use.
    fn date(&self) -> Option<NaiveDate> {
        ["timestamp", "reported_at", "published_at", "created_at", "fecha"]
            .iter()
            .find_map(|field| self.get(field)?.as_str().and_then(parse_record_date))
    }
}

/// [`filter_by_date_range`] for [`Dated`] records.
pub fn within<T: Dated>(records: &[T], start: NaiveDate, end: NaiveDate) -> Vec<&T> {
    filter_by_date_range(records, start, end, T::date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Emotion;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn checkins(labels: &[&str]) -> Vec<CheckinRecord> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let emotion: Emotion = serde_json::from_value(json!(label)).unwrap();
                CheckinRecord::new(format!("Estudiante {}", i % 3), emotion)
            })
            .collect()
    }

    #[test]
    fn test_ratio_empty_is_zero() {
        let empty: Vec<CheckinRecord> = Vec::new();
        assert_eq!(ratio(&empty, |_| true), 0.0);
        assert_eq!(ratio(&empty, |_| false), 0.0);
    }

    #[test]
    fn test_ratio_bounds() {
        let records = checkins(&["Bien", "Triste", "Bien", "Normal"]);
        assert_eq!(ratio(&records, |_| true), 100.0);
        assert_eq!(ratio(&records, |_| false), 0.0);
        assert_eq!(ratio(&records, |c| c.emotion == Emotion::Bien), 50.0);
    }

    #[test]
    fn test_count_by_label_sums_to_len() {
        let collections = [
            vec![],
            vec!["Bien"],
            vec!["Bien", "Bien", "Muy Feliz", "Ansioso", "Cansado"],
            vec!["😢", "Triste", "triste", "Enojado", "😡", "Normal", "raro", ""],
        ];
        for labels in collections {
            let records = checkins(&labels);
            let counts = count_by_label(&records, |c| c.emotion.label().to_string());
            assert_eq!(counts.values().sum::<usize>(), records.len());
        }
    }

    #[test]
    fn test_count_by_label_merges_aliases() {
        let records = checkins(&["😢", "Triste", "triste"]);
        let counts = count_by_label(&records, |c| c.emotion.label().to_string());
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["Triste"], 3);
    }

    #[test]
    fn test_distinct_subjects_normalizes() {
        let records = vec![
            CheckinRecord::new("Ana Rojas", Emotion::Bien),
            CheckinRecord::new("  ana rojas ", Emotion::Triste),
            CheckinRecord::new("Luis", Emotion::Normal),
            CheckinRecord::new("   ", Emotion::Normal),
        ];
        let subjects = distinct_subjects(&records, |c| c.student_name.as_str());
        assert_eq!(subjects.len(), 2);
        assert!(subjects.contains("ana rojas"));
    }

    #[test]
    fn test_filter_by_date_range_inclusive_and_skips_unparsable() {
        let rows = vec![
            json!({"timestamp": "2025-03-01T08:00:00Z"}),
            json!({"timestamp": "2025-03-31"}),
            json!({"timestamp": "2025-04-01T00:00:00Z"}),
            json!({"timestamp": "no es fecha"}),
            json!({"note": "sin fecha"}),
        ];
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

        let selected = within(&rows, start, end);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0], &rows[0]);
        assert_eq!(selected[1], &rows[1]);
    }

    #[test]
    fn test_within_typed_records() {
        let march = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap();
        let records = vec![
            CheckinRecord::new("Ana", Emotion::Bien).with_timestamp(march),
            CheckinRecord::new("Luis", Emotion::Bien).with_timestamp(april),
        ];
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

        let selected = within(&records, start, end);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].student_name, "Ana");
    }

    #[test]
    fn test_parse_record_date() {
        assert_eq!(
            parse_record_date("2025-03-15T23:30:00-03:00"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(
            parse_record_date("2025-03-15"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(parse_record_date("15/03/2025"), None);
        assert_eq!(parse_record_date(""), None);
    }
}
