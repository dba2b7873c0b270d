use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{require, Record, ValidationError};
use super::Bucket;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    /// National id (RUT)
    #[serde(default)]
    pub rut: String,
    pub first_name: String,
    pub last_name: String,
    /// Free-text course label, not a reference to a course record
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
}

impl Student {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            rut: String::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            course: String::new(),
            email: String::new(),
            phone: String::new(),
            birth_date: None,
        }
    }

    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = course.into();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Record for Student {
    const BUCKET: Bucket = Bucket::Students;

    fn validate(&self) -> Result<(), ValidationError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        Ok(())
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.full_name();
        writeln!(f, "{}", name)?;
        writeln!(f, "{}", "=".repeat(name.chars().count()))?;
        if !self.rut.is_empty() {
            writeln!(f, "RUT: {}", self.rut)?;
        }
        if !self.course.is_empty() {
            writeln!(f, "Course: {}", self.course)?;
        }
        if !self.email.is_empty() {
            writeln!(f, "Email: {}", self.email)?;
        }
        if !self.phone.is_empty() {
            writeln!(f, "Phone: {}", self.phone)?;
        }
        if let Some(birth_date) = self.birth_date {
            writeln!(f, "Born: {}", birth_date)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let student = Student::new("Ana", "Rojas").with_course("3°B");
        assert_eq!(student.full_name(), "Ana Rojas");
        assert_eq!(student.course, "3°B");
    }

    #[test]
    fn test_validate_requires_last_name() {
        let student = Student::new("Ana", "");
        assert_eq!(
            student.validate(),
            Err(ValidationError::MissingField("last_name"))
        );
    }
}
