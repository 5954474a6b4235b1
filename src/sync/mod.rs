pub mod engine;

use std::sync::Arc;

use crate::error::SourceFetchError;
use crate::model::outcome::MigrationResult;
use crate::model::record::SourceRecord;
use crate::providers::SourceReader;
use engine::SyncEngine;

/// The operations offered to the command line: which tables exist, what
/// is in them, and migrating a batch.
pub struct MigrationService {
    source: Arc<dyn SourceReader>,
    engine: SyncEngine,
    tables: Vec<String>,
    page_limit: usize,
}

impl MigrationService {
    pub fn new(
        source: Arc<dyn SourceReader>,
        engine: SyncEngine,
        tables: Vec<String>,
        page_limit: usize,
    ) -> Self {
        Self {
            source,
            engine,
            tables,
            page_limit,
        }
    }

    pub fn list_collections(&self) -> &[String] {
        &self.tables
    }

    pub async fn fetch_records(
        &self,
        collection: &str,
    ) -> Result<Vec<SourceRecord>, SourceFetchError> {
        let rows = self.source.fetch_page(collection, self.page_limit).await?;
        tracing::info!("Loaded {} record(s) from {}", rows.len(), collection);
        Ok(rows
            .into_iter()
            .map(|raw| SourceRecord::from_raw(collection, raw))
            .collect())
    }

    pub async fn migrate(&self, records: &[SourceRecord]) -> Vec<MigrationResult> {
        self.engine.migrate_all(records).await
    }

    #[cfg(test)]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }
}
