pub mod jira;
pub mod servicenow;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::{CreationError, SourceFetchError};
use crate::mapping::DestinationPriority;
use crate::model::record::RawRecord;
use crate::util::adf::text_to_adf;

/// Read-only access to the ticketing system records are migrated from.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>, SourceFetchError>;
}

/// The issue tracker records are migrated into.
#[async_trait]
pub trait DestinationWriter: Send + Sync {
    /// Human-facing link to an issue.
    fn browse_url(&self, key: &str) -> String;
    /// `Ok(false)` when the tracker answers but the issue is gone.
    async fn get_issue(&self, key: &str) -> Result<bool>;
    async fn create_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue, CreationError>;
    async fn list_transitions(&self, key: &str) -> Result<Vec<Transition>>;
    /// `Ok(false)` when the tracker refuses the transition.
    async fn execute_transition(&self, key: &str, transition_id: &str) -> Result<bool>;
}

/// Fields sent when creating an issue.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuePayload {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub priority: DestinationPriority,
}

impl IssuePayload {
    /// Jira REST v3 `POST /issue` body.
    pub fn to_jira_json(&self) -> Value {
        json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": self.summary,
                "description": text_to_adf(&self.description),
                "issuetype": { "name": self.issue_type },
                "priority": { "name": self.priority.as_str() },
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub key: String,
}

/// A workflow move available on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    /// Name of the state the transition leads to.
    pub target_state: String,
}


pub fn create_source(config: &AppConfig) -> Result<servicenow::ServiceNowReader> {
    let cfg = config.servicenow()?;
    servicenow::ServiceNowReader::new(
        cfg.base_url()?,
        cfg.username.clone(),
        cfg.password.clone(),
        config.sync.call_timeout(),
    )
}

pub fn create_destination(config: &AppConfig) -> Result<jira::JiraWriter> {
    let cfg = config.jira()?;
    Ok(jira::JiraWriter::with_base_url(
        cfg.base_url()?,
        cfg.email.clone(),
        cfg.api_token.clone(),
    ))
}
