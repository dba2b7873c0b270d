mod announcement;
mod bucket;
mod checkin;
mod course;
mod emotion;
mod incident;
pub mod record;
mod student;
mod teacher;

pub use announcement::Announcement;
pub use bucket::Bucket;
pub use checkin::{greeting, CheckinRecord, CHECKIN_SCHEMA_VERSION};
pub use course::Course;
pub use emotion::{Emotion, Valence};
pub use incident::{IncidentRecord, IncidentStatus, IncidentSummary, Severity, CATEGORIES};
pub use record::{Record, Stored, ValidationError};
pub use student::Student;
pub use teacher::Teacher;
