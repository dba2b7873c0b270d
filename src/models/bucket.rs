use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named collection of records of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Students,
    Teachers,
    Courses,
    Announcements,
    Checkins,
    Incidents,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Students,
        Bucket::Teachers,
        Bucket::Courses,
        Bucket::Announcements,
        Bucket::Checkins,
        Bucket::Incidents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Students => "students",
            Bucket::Teachers => "teachers",
            Bucket::Courses => "courses",
            Bucket::Announcements => "announcements",
            Bucket::Checkins => "checkins",
            Bucket::Incidents => "incidents",
        }
    }

    /// Key the browser dashboard used for this bucket in local storage.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            Bucket::Students => "skolai_estudiantes",
            Bucket::Teachers => "skolai_profesores",
            Bucket::Courses => "skolai_cursos",
            Bucket::Announcements => "skolai_comunicados",
            Bucket::Checkins => "skolai_checkins",
            Bucket::Incidents => "skolai_incidentes",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "students" => Ok(Bucket::Students),
            "teachers" => Ok(Bucket::Teachers),
            "courses" => Ok(Bucket::Courses),
            "announcements" => Ok(Bucket::Announcements),
            "checkins" => Ok(Bucket::Checkins),
            "incidents" => Ok(Bucket::Incidents),
            _ => Err(format!(
                "Invalid bucket '{}'. Valid options: students, teachers, courses, announcements, checkins, incidents",
                s
            )),
        }
    }
}
