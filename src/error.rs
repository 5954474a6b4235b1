use std::collections::BTreeMap;

use thiserror::Error;

/// Reading a page of records from the source system failed.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("ServiceNow request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ServiceNow returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse ServiceNow response: {0}")]
    Parse(String),
}

/// The destination refused, or never answered, a create request.
#[derive(Debug, Error)]
pub enum CreationError {
    #[error("Jira rejected the issue ({status}): {}", describe(.messages, .field_errors))]
    Rejected {
        status: u16,
        messages: Vec<String>,
        field_errors: BTreeMap<String, String>,
    },
    #[error("Jira create request failed: {0}")]
    Request(String),
    #[error("Jira create request timed out")]
    TimedOut,
}

impl CreationError {
    pub fn messages(&self) -> Vec<String> {
        match self {
            CreationError::Rejected { messages, .. } if !messages.is_empty() => messages.clone(),
            CreationError::Rejected { .. } => vec!["Unknown error".into()],
            other => vec![other.to_string()],
        }
    }

    pub fn field_errors(&self) -> BTreeMap<String, String> {
        match self {
            CreationError::Rejected { field_errors, .. } => field_errors.clone(),
            _ => BTreeMap::new(),
        }
    }
}

fn describe(messages: &[String], field_errors: &BTreeMap<String, String>) -> String {
    let mut parts: Vec<String> = messages.to_vec();
    parts.extend(field_errors.iter().map(|(field, msg)| format!("{field}: {msg}")));
    if parts.is_empty() {
        "Unknown error".into()
    } else {
        parts.join("; ")
    }
}

/// Why a freshly created issue was left in its initial workflow state.
/// Never surfaced as a failure; only kept as a note on the result.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("no transition leads to '{0}'")]
    NoMatchingTransition(String),
    #[error("transition {0} was rejected")]
    Rejected(String),
    #[error("transition request failed: {0}")]
    Request(String),
    #[error("transition request timed out")]
    TimedOut,
}
