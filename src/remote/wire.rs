//! JSON bodies exchanged with the table API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::models::Bucket;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBody {
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchBody {
    pub patch: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "insert"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// Pushed to realtime subscribers after every write to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Bucket,
    pub kind: ChangeKind,
    pub id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Bucket, kind: ChangeKind, id: Uuid) -> Self {
        Self {
            table,
            kind,
            id,
            at: Utc::now(),
        }
    }
}
