use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

use super::SourceReader;
use crate::error::SourceFetchError;
use crate::model::record::RawRecord;

/// ServiceNow Table API client.
pub struct ServiceNowReader {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl ServiceNowReader {
    pub fn new(
        base_url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self> {
        let creds = format!("{username}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build ServiceNow HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }
}

#[derive(Deserialize)]
struct TableResponse {
    result: Vec<RawRecord>,
}

#[async_trait]
impl SourceReader for ServiceNowReader {
    async fn fetch_page(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<RawRecord>, SourceFetchError> {
        let url = format!(
            "{}/api/now/table/{}",
            self.base_url,
            urlencoding::encode(collection)
        );
        tracing::debug!(%url, limit, "fetching ServiceNow records");

        let resp = self
            .client
            .get(&url)
            .query(&[("sysparm_limit", limit.to_string())])
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceFetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let body = resp.text().await?;
        let table: TableResponse =
            serde_json::from_str(&body).map_err(|e| SourceFetchError::Parse(e.to_string()))?;
        Ok(table.result)
    }
}
