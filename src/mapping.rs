use serde::{Deserialize, Serialize};
use std::fmt;

/// Jira priority names a ServiceNow priority can translate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationPriority {
    Critical,
    High,
    Medium,
    Low,
    Lowest,
}

impl DestinationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationPriority::Critical => "Critical",
            DestinationPriority::High => "High",
            DestinationPriority::Medium => "Medium",
            DestinationPriority::Low => "Low",
            DestinationPriority::Lowest => "Lowest",
        }
    }
}

impl fmt::Display for DestinationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jira workflow states a ServiceNow state can translate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationStatus {
    Open,
    Pending,
    #[serde(rename = "Work in progress")]
    WorkInProgress,
    Done,
}

impl DestinationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationStatus::Open => "Open",
            DestinationStatus::Pending => "Pending",
            DestinationStatus::WorkInProgress => "Work in progress",
            DestinationStatus::Done => "Done",
        }
    }
}

impl fmt::Display for DestinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a ServiceNow priority (numeric code or level name) to Jira.
///
/// Matching is case-sensitive after trimming. Anything unrecognised,
/// including an empty value, lands on `Medium`.
pub fn map_priority(raw: &str) -> DestinationPriority {
    match raw.trim() {
        "1" | "Critical" => DestinationPriority::Critical,
        "2" | "High" => DestinationPriority::High,
        "3" | "Moderate" => DestinationPriority::Medium,
        "4" | "Low" => DestinationPriority::Low,
        "5" | "Planning" => DestinationPriority::Lowest,
        _ => DestinationPriority::Medium,
    }
}

/// Translate a ServiceNow state name to the Jira status to transition into.
/// Case-insensitive; unknown states fall back to `Open`.
pub fn map_status(raw: &str) -> DestinationStatus {
    match raw.to_lowercase().as_str() {
        "new" => DestinationStatus::Open,
        "assess" | "root cause analysis" => DestinationStatus::Pending,
        "fix in progress" => DestinationStatus::WorkInProgress,
        "resolved" | "closed" => DestinationStatus::Done,
        _ => DestinationStatus::Open,
    }
}
