pub mod storage;

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::model::record::SourceRecord;
use storage::{MappingStorage, MappingTable};

/// Deduplication key: the ticket number, namespaced by the table it came
/// from so that numbers from different tables never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub collection: String,
    pub natural_key: String,
}

impl IdentityKey {
    pub fn new(collection: impl Into<String>, natural_key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            natural_key: natural_key.into(),
        }
    }

    pub fn for_record(record: &SourceRecord) -> Self {
        Self::new(&record.collection, &record.natural_key)
    }

    pub fn is_empty(&self) -> bool {
        self.natural_key.trim().is_empty()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.natural_key)
    }
}

/// Maps source records to the Jira issues already created for them.
///
/// The backing storage only knows how to load and rewrite the whole table,
/// so every operation holds one lock across its load/modify/store cycle.
/// Without it two saves for different keys could each write back a table
/// missing the other's entry.
#[derive(Clone)]
pub struct IdentityStore {
    storage: Arc<dyn MappingStorage>,
    lock: Arc<Mutex<()>>,
}

impl IdentityStore {
    pub fn new(storage: Arc<dyn MappingStorage>) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn lookup(&self, key: &IdentityKey) -> Result<Option<String>> {
        if key.is_empty() {
            return Ok(None);
        }
        let _guard = self.lock.lock().await;
        let table = self.storage.load().await?;
        Ok(table.get(&key.to_string()).cloned())
    }

    pub async fn save(&self, key: &IdentityKey, destination_key: &str) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        self.update(|table| {
            table.insert(key.to_string(), destination_key.to_string());
            true
        })
        .await
    }

    pub async fn remove(&self, key: &IdentityKey) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        self.forget(&key.to_string()).await.map(|_| ())
    }

    /// Drop a mapping by its stored form (`collection:number`). Returns the
    /// issue key it pointed at.
    pub async fn forget(&self, stored_key: &str) -> Result<Option<String>> {
        let mut removed = None;
        self.update(|table| {
            removed = table.remove(stored_key);
            removed.is_some()
        })
        .await?;
        Ok(removed)
    }

    pub async fn entries(&self) -> Result<MappingTable> {
        let _guard = self.lock.lock().await;
        self.storage.load().await
    }

    /// Run `f` against the current table and write it back if `f` reports a change.
    async fn update(&self, f: impl FnOnce(&mut MappingTable) -> bool) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut table = self.storage.load().await?;
        if f(&mut table) {
            self.storage.store(&table).await?;
        }
        Ok(())
    }
}
