use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::AppConfig;
use crate::identity::storage::JsonFileStorage;
use crate::identity::{IdentityKey, IdentityStore};
use crate::model::outcome::{MigrationResult, Outcome};
use crate::model::record::SourceRecord;
use crate::providers;
use crate::sync::engine::{EngineSettings, SyncEngine};
use crate::sync::MigrationService;

pub fn open_identity_store(config: &AppConfig) -> IdentityStore {
    let storage = JsonFileStorage::in_dir(&config.sync.data_dir());
    tracing::debug!("Identity table: {}", storage.path().display());
    IdentityStore::new(Arc::new(storage))
}

pub fn build_service(config: &AppConfig) -> Result<MigrationService> {
    let source = providers::create_source(config)?;
    let writer = providers::create_destination(config)?;
    let jira = config.jira()?;

    let settings = EngineSettings {
        project_key: jira.project_key.clone(),
        issue_type: jira.issue_type.clone(),
        call_timeout: config.sync.call_timeout(),
    };
    let engine = SyncEngine::new(Arc::new(writer), open_identity_store(config), settings);

    Ok(MigrationService::new(
        Arc::new(source),
        engine,
        config.tables(),
        config.servicenow()?.page_limit,
    ))
}

fn ensure_known_table(service: &MigrationService, table: &str) -> Result<()> {
    if !service.list_collections().iter().any(|t| t == table) {
        bail!(
            "Unknown table '{table}'. Configured tables: {}",
            service.list_collections().join(", ")
        );
    }
    Ok(())
}

pub fn handle_tables(config: &AppConfig) {
    for table in config.tables() {
        println!("{table}");
    }
}

pub async fn handle_fetch(config: &AppConfig, table: &str, json: bool) -> Result<()> {
    let service = build_service(config)?;
    ensure_known_table(&service, table)?;
    let records = service
        .fetch_records(table)
        .await
        .with_context(|| format!("Error fetching records from {table}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("Loaded {} record(s)", records.len());
        for record in &records {
            println!("{}", render_record(record));
        }
    }
    Ok(())
}

pub async fn handle_migrate(config: &AppConfig, table: &str, json: bool) -> Result<()> {
    let service = build_service(config)?;
    ensure_known_table(&service, table)?;
    let records = service
        .fetch_records(table)
        .await
        .with_context(|| format!("Error fetching records from {table}"))?;

    if records.is_empty() {
        println!("No records in {table}");
        return Ok(());
    }

    let results = service.migrate(&records).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!("{}", render_result(result));
        }
        println!();
        print!("{}", render_summary(&results));
    }
    Ok(())
}

pub async fn handle_mappings(config: &AppConfig) -> Result<()> {
    let entries = open_identity_store(config).entries().await?;
    if entries.is_empty() {
        println!("No records migrated yet");
    }
    for (source, issue) in entries {
        println!("{source}\t{issue}");
    }
    Ok(())
}

pub async fn handle_forget(config: &AppConfig, collection: &str, number: &str) -> Result<()> {
    let key = IdentityKey::new(collection, number);
    match open_identity_store(config).forget(&key.to_string()).await? {
        Some(issue) => println!("Forgot {key} (was {issue})"),
        None => println!("No mapping for {key}"),
    }
    Ok(())
}

fn render_record(record: &SourceRecord) -> String {
    let number = if record.natural_key.is_empty() {
        "(no number)"
    } else {
        record.natural_key.as_str()
    };
    format!(
        "{number}  [{}] [P{}]  {}",
        display_or_dash(&record.status),
        display_or_dash(&record.priority),
        record.summary
    )
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub fn render_result(result: &MigrationResult) -> String {
    let number = display_or_dash(&result.record.natural_key);
    let marker = match &result.outcome {
        Outcome::Created { .. } => "+",
        Outcome::AlreadyMigrated { .. } => "=",
        Outcome::Error { .. } => "!",
    };
    format!("{marker} {number}  {}", result.outcome)
}

/// Counts per outcome, then every already-migrated ticket with its link.
pub fn render_summary(results: &[MigrationResult]) -> String {
    let created = results
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Created { .. }))
        .count();
    let already: Vec<&MigrationResult> = results
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::AlreadyMigrated { .. }))
        .collect();
    let failed = results.iter().filter(|r| r.outcome.is_error()).count();

    let mut out = format!(
        "Migration complete: {created} created, {} already migrated, {failed} failed\n",
        already.len()
    );
    if !already.is_empty() {
        out.push_str("\nAlready migrated ticket(s):\n");
        for result in already {
            out.push_str(&format!(
                "  {}: {}\n",
                result.record.natural_key,
                result.outcome.url().unwrap_or_default()
            ));
        }
    }
    out
}
