//! Change-log entries and field-level change values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of change recorded for a record in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The record was not in the store before this run
    Added,
    /// One or more monitored fields differ from the stored record
    Updated,
}

impl ChangeKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "added" => Some(Self::Added),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A single monitored field value
///
/// Serialized untagged so a change reads as `{"old": 51.77, "new": 45.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Number(v) => write!(f, "{:?}", v),
            Self::Text(v) => write!(f, "{}", v),
        }
    }
}

/// The before/after pair for one changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Field name -> change, ordered by field name
pub type FieldChanges = BTreeMap<String, FieldChange>;

/// One append-only audit-log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Source URL of the affected record
    pub record_url: String,
    /// Record name at detection time
    pub record_name: String,
    pub change_kind: ChangeKind,
    /// Present only for `Updated` entries
    pub field_changes: Option<FieldChanges>,
    pub detected_at: DateTime<Utc>,
    pub run_id: String,
}
