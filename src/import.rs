//! Import of data exported from the browser dashboard's local storage.
//!
//! The dump is a JSON object keyed by the storage keys (`skolai_checkins`,
//! `skolai_estudiantes`, ...). Each value is an array of rows with Spanish
//! field names, or that array serialized as a string, the way local storage
//! holds it. Rows that cannot be mapped are skipped and counted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::{
    Announcement, Bucket, CheckinRecord, Course, Emotion, IncidentRecord, IncidentStatus, Record,
    Severity, Student, Teacher,
};
use crate::store::{RecordStore, Repository, StoreError};

/// Check-ins from the browser dashboard predate schema versioning.
const LEGACY_CHECKIN_SCHEMA: u32 = 1;

#[derive(Debug)]
pub enum ImportError {
    Read(PathBuf, std::io::Error),
    Parse(String),
    Store(StoreError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Read(path, e) => write!(f, "Failed to read {}: {}", path.display(), e),
            ImportError::Parse(e) => write!(f, "Invalid legacy export: {}", e),
            ImportError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Read(_, e) => Some(e),
            ImportError::Store(e) => Some(e),
            ImportError::Parse(_) => None,
        }
    }
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        ImportError::Store(e)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketImport {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub buckets: BTreeMap<Bucket, BucketImport>,
}

impl ImportSummary {
    pub fn imported(&self) -> usize {
        self.buckets.values().map(|b| b.imported).sum()
    }

    pub fn skipped(&self) -> usize {
        self.buckets.values().map(|b| b.skipped).sum()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bucket, counts) in &self.buckets {
            write!(f, "{:<14} {:>5} imported", bucket.as_str(), counts.imported)?;
            if counts.skipped > 0 {
                write!(f, ", {} skipped", counts.skipped)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn text(row: &Map<String, Value>, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parses an ISO instant or a bare date (midnight UTC).
fn instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn student(row: &Map<String, Value>) -> Option<Student> {
    let birth = text(row, "fechaNacimiento");
    let birth_date = if birth.is_empty() {
        None
    } else {
        Some(instant(&birth)?.date_naive())
    };
    Some(Student {
        rut: text(row, "rut"),
        first_name: text(row, "nombre"),
        last_name: text(row, "apellido"),
        course: text(row, "curso"),
        email: text(row, "email"),
        phone: text(row, "telefono"),
        birth_date,
    })
}

fn teacher(row: &Map<String, Value>) -> Option<Teacher> {
    Some(Teacher {
        name: text(row, "nombre"),
        email: text(row, "email"),
        subject: text(row, "asignatura"),
    })
}

fn course(row: &Map<String, Value>) -> Option<Course> {
    Some(Course {
        name: text(row, "nombre"),
        description: text(row, "descripcion"),
    })
}

fn announcement(row: &Map<String, Value>) -> Option<Announcement> {
    Some(Announcement {
        title: text(row, "titulo"),
        body: text(row, "contenido"),
        published_at: instant(&text(row, "fecha"))?,
    })
}

fn checkin(row: &Map<String, Value>) -> Option<CheckinRecord> {
    let mut label = text(row, "emocion");
    if label.is_empty() {
        label = text(row, "emocionEmoji");
    }
    let record = CheckinRecord {
        schema_version: LEGACY_CHECKIN_SCHEMA,
        student_name: text(row, "estudianteNombre"),
        timestamp: instant(&text(row, "fecha"))?,
        emotion: Emotion::parse_label(&label),
        note: text(row, "respuesta"),
    };
    Some(record)
}

fn incident(row: &Map<String, Value>) -> Option<IncidentRecord> {
    let severity: Severity = text(row, "tipo").parse().ok()?;
    let status = match text(row, "estado").as_str() {
        "" => IncidentStatus::Pending,
        other => other.parse().ok()?,
    };
    Some(IncidentRecord {
        student_name: text(row, "estudianteNombre"),
        severity,
        category: text(row, "categoria"),
        description: text(row, "descripcion"),
        action_taken: text(row, "accionTomada"),
        status,
        reported_at: instant(&text(row, "fecha"))?,
    })
}

/// Rows stored under `key`, accepting both an array and its string form.
fn rows(dump: &Map<String, Value>, key: &str) -> Result<Vec<Value>, ImportError> {
    match dump.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => Ok(rows.clone()),
        Some(Value::String(raw)) => match serde_json::from_str(raw) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(_) => Err(ImportError::Parse(format!("'{}' is not an array", key))),
            Err(e) => Err(ImportError::Parse(format!("'{}': {}", key, e))),
        },
        Some(_) => Err(ImportError::Parse(format!("'{}' is not an array", key))),
    }
}

async fn import_bucket<T: Record>(
    store: &dyn RecordStore,
    dump: &Map<String, Value>,
    map: fn(&Map<String, Value>) -> Option<T>,
) -> Result<BucketImport, ImportError> {
    let repo = Repository::<T>::new(store);
    let mut counts = BucketImport::default();

    for (index, row) in rows(dump, T::BUCKET.legacy_key())?.iter().enumerate() {
        let Some(record) = row.as_object().and_then(map) else {
            tracing::warn!("Skipping unmappable {} row #{}", T::BUCKET, index);
            counts.skipped += 1;
            continue;
        };
        match repo.create(&record).await {
            Ok(_) => counts.imported += 1,
            Err(StoreError::Validation(e)) => {
                tracing::warn!("Skipping invalid {} row #{}: {}", T::BUCKET, index, e);
                counts.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(counts)
}

/// Imports every bucket found in `dump`.
pub async fn import_legacy(
    store: &dyn RecordStore,
    dump: &Value,
) -> Result<ImportSummary, ImportError> {
    let dump = dump
        .as_object()
        .ok_or_else(|| ImportError::Parse("expected an object keyed by storage key".to_string()))?;

    let mut summary = ImportSummary::default();
    let buckets = &mut summary.buckets;
    buckets.insert(Bucket::Students, import_bucket(store, dump, student).await?);
    buckets.insert(Bucket::Teachers, import_bucket(store, dump, teacher).await?);
    buckets.insert(Bucket::Courses, import_bucket(store, dump, course).await?);
    buckets.insert(
        Bucket::Announcements,
        import_bucket(store, dump, announcement).await?,
    );
    buckets.insert(Bucket::Checkins, import_bucket(store, dump, checkin).await?);
    buckets.insert(Bucket::Incidents, import_bucket(store, dump, incident).await?);

    tracing::info!(
        "Imported {} legacy records, skipped {}",
        summary.imported(),
        summary.skipped()
    );
    Ok(summary)
}

/// Reads a dump file and imports it.
pub async fn import_file(store: &dyn RecordStore, path: &Path) -> Result<ImportSummary, ImportError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ImportError::Read(path.to_path_buf(), e))?;
    let dump: Value =
        serde_json::from_str(&content).map_err(|e| ImportError::Parse(e.to_string()))?;
    import_legacy(store, &dump).await
}
