use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{require, Record, ValidationError};
use super::{Bucket, Emotion};

/// Schema version stamped on check-ins written by this release.
pub const CHECKIN_SCHEMA_VERSION: u32 = 2;

/// Phrases in a free-text note that flag a check-in for follow-up.
const ALERT_PHRASES: [&str; 6] = ["mal", "triste", "solo", "ayuda", "miedo", "no quiero"];

fn legacy_schema() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckinRecord {
    #[serde(default = "legacy_schema")]
    pub schema_version: u32,
    pub student_name: String,
    pub timestamp: DateTime<Utc>,
    pub emotion: Emotion,
    #[serde(default)]
    pub note: String,
}

impl CheckinRecord {
    pub fn new(student_name: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            schema_version: CHECKIN_SCHEMA_VERSION,
            student_name: student_name.into(),
            timestamp: Utc::now(),
            emotion,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True when staff should follow up on this check-in.
    pub fn needs_attention(&self) -> bool {
        if self.emotion.is_alarming() {
            return true;
        }
        let note = self.note.to_lowercase();
        ALERT_PHRASES.iter().any(|phrase| note.contains(phrase))
    }

    /// Message shown to the student once the check-in is stored.
    pub fn acknowledgment(&self) -> &'static str {
        if self.needs_attention() {
            "⚠️ Hemos detectado que podrías necesitar apoyo. Un adulto se comunicará contigo pronto."
        } else {
            "✅ ¡Gracias por compartir cómo te sientes! Tu bienestar es importante para nosotros 💙"
        }
    }
}

impl Record for CheckinRecord {
    const BUCKET: Bucket = Bucket::Checkins;
    const PATCHABLE: Option<&'static [&'static str]> = Some(&[]);

    fn validate(&self) -> Result<(), ValidationError> {
        require("student_name", &self.student_name)?;
        if let Emotion::Other(label) = &self.emotion {
            require("emotion", label)?;
        }
        Ok(())
    }
}

impl fmt::Display for CheckinRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.timestamp.format("%d-%m %H:%M"),
            self.emotion.emoji(),
            self.student_name,
            self.emotion
        )?;
        if !self.note.is_empty() {
            write!(f, " \"{}\"", self.note)?;
        }
        Ok(())
    }
}

/// Kiosk greeting for the given hour of the day.
pub fn greeting(at: DateTime<impl chrono::TimeZone>) -> &'static str {
    match at.hour() {
        0..=11 => "¡Buenos Días!",
        12..=17 => "¡Buenas Tardes!",
        _ => "¡Buenas Noches!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_checkin_stamps_schema() {
        let checkin = CheckinRecord::new("Ana", Emotion::Bien);
        assert_eq!(checkin.schema_version, CHECKIN_SCHEMA_VERSION);
        assert!(checkin.note.is_empty());
    }

    #[test]
    fn test_legacy_payload_defaults_to_schema_one() {
        let json = r#"{"student_name":"Ana","timestamp":"2025-03-01T10:00:00Z","emotion":"Bien"}"#;
        let checkin: CheckinRecord = serde_json::from_str(json).unwrap();
        assert_eq!(checkin.schema_version, 1);
        assert_eq!(checkin.emotion, Emotion::Bien);
    }

    #[test]
    fn test_needs_attention_by_emotion() {
        assert!(CheckinRecord::new("Ana", Emotion::Triste).needs_attention());
        assert!(CheckinRecord::new("Ana", Emotion::Enojado).needs_attention());
        assert!(!CheckinRecord::new("Ana", Emotion::Bien).needs_attention());
    }

    #[test]
    fn test_needs_attention_by_note() {
        let checkin = CheckinRecord::new("Ana", Emotion::Normal).with_note("Tengo MIEDO de la prueba");
        assert!(checkin.needs_attention());
        assert!(checkin.acknowledgment().contains("apoyo"));

        let calm = CheckinRecord::new("Ana", Emotion::Normal).with_note("Todo tranquilo");
        assert!(!calm.needs_attention());
        assert!(calm.acknowledgment().contains("Gracias"));
    }

    #[test]
    fn test_validate_requires_name() {
        let checkin = CheckinRecord::new("  ", Emotion::Bien);
        assert_eq!(
            checkin.validate(),
            Err(ValidationError::MissingField("student_name"))
        );
    }

    #[test]
    fn test_greeting_by_hour() {
        assert_eq!(greeting(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()), "¡Buenos Días!");
        assert_eq!(greeting(Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()), "¡Buenas Tardes!");
        assert_eq!(greeting(Utc.with_ymd_and_hms(2025, 5, 1, 21, 0, 0).unwrap()), "¡Buenas Noches!");
    }
}
