use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The whole natural-key to issue-key table.
pub type MappingTable = BTreeMap<String, String>;

/// Name of the single persisted entry holding the mapping table.
pub const MAPPING_ENTRY: &str = "number-mapping";

/// Somewhere the mapping table can be read from and rewritten wholesale.
#[async_trait]
pub trait MappingStorage: Send + Sync {
    async fn load(&self) -> Result<MappingTable>;
    async fn store(&self, table: &MappingTable) -> Result<()>;
}

/// Keeps the table as pretty-printed JSON in one file.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<dir>/number-mapping.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{MAPPING_ENTRY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MappingStorage for JsonFileStorage {
    async fn load(&self) -> Result<MappingTable> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check {}", self.path.display()))?;
        if !exists {
            return Ok(MappingTable::new());
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(MappingTable::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn store(&self, table: &MappingTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process table.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    table: std::sync::Mutex<MappingTable>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl MappingStorage for MemoryStorage {
    async fn load(&self) -> Result<MappingTable> {
        Ok(self.table.lock().map_err(|_| anyhow::anyhow!("mapping table poisoned"))?.clone())
    }

    async fn store(&self, table: &MappingTable) -> Result<()> {
        *self.table.lock().map_err(|_| anyhow::anyhow!("mapping table poisoned"))? = table.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::in_dir(dir.path());
        assert!(storage.load().await.unwrap().is_empty());
        assert!(storage.path().ends_with("number-mapping.json"));
    }

    #[tokio::test]
    async fn file_round_trips_table() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::in_dir(&dir.path().join("nested"));

        let mut table = MappingTable::new();
        table.insert("incident:INC1".into(), "SER-1".into());
        storage.store(&table).await.unwrap();

        let reopened = JsonFileStorage::in_dir(&dir.path().join("nested"));
        assert_eq!(reopened.load().await.unwrap(), table);
        assert!(!dir.path().join("nested/number-mapping.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::in_dir(dir.path());
        std::fs::write(storage.path(), "{not json").unwrap();
        let err = storage.load().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[tokio::test]
    async fn unreadable_location_is_an_error_not_an_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();

        let storage = JsonFileStorage::in_dir(&blocker);
        let err = storage.load().await.unwrap_err();
        assert!(err.to_string().contains("Failed to check"));
    }
}
