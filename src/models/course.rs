use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{require, Record, ValidationError};
use super::Bucket;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Course {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

impl Record for Course {
    const BUCKET: Bucket = Bucket::Courses;

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}
