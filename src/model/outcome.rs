use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::record::SourceRecord;
use crate::error::CreationError;
use crate::mapping::DestinationStatus;

/// What happened to one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Created {
        key: String,
        url: String,
        target_status: DestinationStatus,
        status_applied: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        transition_error: Option<String>,
        /// Set when the issue exists in Jira but its mapping could not be
        /// saved, so a later run will not recognise it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mapping_error: Option<String>,
    },
    AlreadyMigrated {
        key: String,
        url: String,
    },
    Error {
        messages: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        field_errors: BTreeMap<String, String>,
    },
}

impl Outcome {
    pub fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            messages: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    /// Destination issue key, when one exists.
    pub fn key(&self) -> Option<&str> {
        match self {
            Outcome::Created { key, .. } | Outcome::AlreadyMigrated { key, .. } => Some(key),
            Outcome::Error { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Outcome::Created { url, .. } | Outcome::AlreadyMigrated { url, .. } => Some(url),
            Outcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

impl From<CreationError> for Outcome {
    fn from(err: CreationError) -> Self {
        Outcome::Error {
            messages: err.messages(),
            field_errors: err.field_errors(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created {
                url,
                target_status,
                status_applied,
                mapping_error,
                ..
            } => {
                write!(f, "{url}")?;
                if *status_applied {
                    write!(f, " (Status set to {target_status})")?;
                }
                if let Some(err) = mapping_error {
                    write!(f, " [mapping not saved: {err}]")?;
                }
                Ok(())
            }
            Outcome::AlreadyMigrated { url, .. } => write!(f, "already migrated: {url}"),
            Outcome::Error {
                messages,
                field_errors,
            } => {
                write!(f, "error: {}", messages.join("; "))?;
                if !field_errors.is_empty() {
                    let fields: Vec<String> = field_errors
                        .iter()
                        .map(|(field, msg)| format!("{field}: {msg}"))
                        .collect();
                    write!(f, " | {}", fields.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// A source record together with how its migration went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    #[serde(flatten)]
    pub record: SourceRecord,
    pub outcome: Outcome,
    pub migrated_at: String,
}

impl MigrationResult {
    pub fn new(record: SourceRecord, outcome: Outcome) -> Self {
        Self {
            record,
            outcome,
            migrated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
