use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{require, Record, ValidationError};
use super::Bucket;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
}

impl Teacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: String::new(),
            subject: String::new(),
        }
    }
}

impl Record for Teacher {
    const BUCKET: Bucket = Bucket::Teachers;

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.subject.is_empty() {
            write!(f, " ({})", self.subject)?;
        }
        if !self.email.is_empty() {
            write!(f, " <{}>", self.email)?;
        }
        Ok(())
    }
}
