use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::{CreatedIssue, DestinationWriter, IssuePayload, Transition};
use crate::error::CreationError;

pub struct JiraWriter {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraWriter {
    pub fn with_base_url(base_url: String, email: String, api_token: String) -> Self {
        let creds = format!("{email}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    fn issue_url(&self, key: &str) -> String {
        format!("{}/rest/api/3/issue/{}", self.base_url, urlencoding::encode(key))
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    key: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    to: Option<TransitionTarget>,
}

#[derive(Deserialize)]
struct TransitionTarget {
    name: String,
}

#[async_trait]
impl DestinationWriter for JiraWriter {
    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.base_url)
    }

    async fn get_issue(&self, key: &str) -> Result<bool> {
        let resp = self
            .client
            .get(self.issue_url(key))
            .query(&[("fields", "summary")])
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira issue lookup failed")?;
        Ok(resp.status().is_success())
    }

    async fn create_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue, CreationError> {
        let resp = self
            .client
            .post(format!("{}/rest/api/3/issue", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&payload.to_jira_json())
            .send()
            .await
            .map_err(|e| CreationError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CreationError::Request(e.to_string()))?;

        if !status.is_success() {
            let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            return Err(CreationError::Rejected {
                status: status.as_u16(),
                messages: parsed.error_messages,
                field_errors: parsed.errors,
            });
        }

        let created: CreateResponse = serde_json::from_str(&body)
            .map_err(|e| CreationError::Request(format!("Failed to parse Jira response: {e}")))?;
        Ok(CreatedIssue { key: created.key })
    }

    async fn list_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let resp = self
            .client
            .get(format!("{}/transitions", self.issue_url(key)))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira transitions request failed")?
            .error_for_status()
            .context("Jira refused to list transitions")?;

        let data: TransitionsResponse = resp
            .json()
            .await
            .context("Failed to parse Jira transitions")?;

        Ok(data
            .transitions
            .into_iter()
            .filter_map(|t| {
                t.to.map(|to| Transition {
                    id: t.id,
                    target_state: to.name,
                })
            })
            .collect())
    }

    async fn execute_transition(&self, key: &str, transition_id: &str) -> Result<bool> {
        let resp = self
            .client
            .post(format!("{}/transitions", self.issue_url(key)))
            .header("Authorization", &self.auth_header)
            .json(&json!({ "transition": { "id": transition_id } }))
            .send()
            .await
            .context("Jira transition request failed")?;
        Ok(resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DestinationPriority;
    use mockito::{Matcher, Server};

    const AUTH: &str = "Basic b3BzQGFjbWUudGVzdDp0b2s=";

    fn writer(url: String) -> JiraWriter {
        JiraWriter::with_base_url(url, "ops@acme.test".into(), "tok".into())
    }

    fn payload() -> IssuePayload {
        IssuePayload {
            project_key: "SER".into(),
            issue_type: "Task".into(),
            summary: "Printer on fire".into(),
            description: "Third floor".into(),
            priority: DestinationPriority::Critical,
        }
    }

    #[test]
    fn browse_url_ignores_trailing_slash() {
        let w = JiraWriter::with_base_url("https://acme.atlassian.net/".into(), "e".into(), "t".into());
        assert_eq!(w.browse_url("SER-1"), "https://acme.atlassian.net/browse/SER-1");
    }

    #[test]
    fn payload_matches_rest_shape() {
        let body = payload().to_jira_json();
        assert_eq!(body["fields"]["project"]["key"], "SER");
        assert_eq!(body["fields"]["issuetype"]["name"], "Task");
        assert_eq!(body["fields"]["priority"]["name"], "Critical");
        assert_eq!(body["fields"]["description"]["type"], "doc");
    }

    #[tokio::test]
    async fn create_returns_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/3/issue")
            .match_header("authorization", AUTH)
            .match_body(Matcher::PartialJson(json!({
                "fields": { "summary": "Printer on fire", "priority": { "name": "Critical" } }
            })))
            .with_status(201)
            .with_body(r#"{"id": "10001", "key": "SER-42", "self": "x"}"#)
            .create_async()
            .await;

        let created = writer(server.url()).create_issue(&payload()).await.unwrap();
        assert_eq!(created.key, "SER-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_rejection_carries_messages_and_fields() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/api/3/issue")
            .with_status(400)
            .with_body(
                r#"{"errorMessages": ["Issue type is invalid"], "errors": {"priority": "Priority name 'Critical' is not valid"}}"#,
            )
            .create_async()
            .await;

        let err = writer(server.url()).create_issue(&payload()).await.unwrap_err();
        match err {
            CreationError::Rejected {
                status,
                messages,
                field_errors,
            } => {
                assert_eq!(status, 400);
                assert_eq!(messages, vec!["Issue type is invalid".to_string()]);
                assert!(field_errors["priority"].contains("not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn create_rejection_with_html_body_still_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/api/3/issue")
            .with_status(503)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = writer(server.url()).create_issue(&payload()).await.unwrap_err();
        assert_eq!(err.messages(), vec!["Unknown error".to_string()]);
    }

    #[tokio::test]
    async fn get_issue_reports_existence() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/SER-1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"key": "SER-1"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/issue/SER-2")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"errorMessages": ["Issue does not exist"]}"#)
            .create_async()
            .await;

        let w = writer(server.url());
        assert!(w.get_issue("SER-1").await.unwrap());
        assert!(!w.get_issue("SER-2").await.unwrap());
    }

    #[tokio::test]
    async fn lists_transitions_with_targets() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/SER-3/transitions")
            .with_status(200)
            .with_body(
                r#"{"transitions": [
                    {"id": "11", "name": "Start", "to": {"name": "Work in progress"}},
                    {"id": "31", "name": "Finish", "to": {"name": "Done"}},
                    {"id": "99", "name": "Orphan"}
                ]}"#,
            )
            .create_async()
            .await;

        let transitions = writer(server.url()).list_transitions("SER-3").await.unwrap();
        assert_eq!(
            transitions,
            vec![
                Transition { id: "11".into(), target_state: "Work in progress".into() },
                Transition { id: "31".into(), target_state: "Done".into() },
            ]
        );
    }

    #[tokio::test]
    async fn list_transitions_error_status_is_err() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/SER-3/transitions")
            .with_status(403)
            .create_async()
            .await;

        assert!(writer(server.url()).list_transitions("SER-3").await.is_err());
    }

    #[tokio::test]
    async fn execute_transition_posts_id() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("POST", "/rest/api/3/issue/SER-4/transitions")
            .match_body(Matcher::Json(json!({ "transition": { "id": "31" } })))
            .with_status(204)
            .create_async()
            .await;

        assert!(writer(server.url()).execute_transition("SER-4", "31").await.unwrap());
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn execute_transition_refused_is_false() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/api/3/issue/SER-5/transitions")
            .with_status(400)
            .create_async()
            .await;

        assert!(!writer(server.url()).execute_transition("SER-5", "1").await.unwrap());
    }
}
