use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{require, Record, ValidationError};
use super::Bucket;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            published_at: Utc::now(),
        }
    }
}

impl Record for Announcement {
    const BUCKET: Bucket = Bucket::Announcements;

    fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("body", &self.body)?;
        Ok(())
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.published_at.format("%Y-%m-%d"))?;
        writeln!(f, "\n{}", self.body)
    }
}
