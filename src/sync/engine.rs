use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{error::Elapsed, timeout};

use crate::error::{CreationError, TransitionError};
use crate::identity::{IdentityKey, IdentityStore};
use crate::mapping::{map_priority, map_status, DestinationStatus};
use crate::model::outcome::{MigrationResult, Outcome};
use crate::model::record::SourceRecord;
use crate::providers::{DestinationWriter, IssuePayload};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub project_key: String,
    pub issue_type: String,
    /// Upper bound for every single destination call.
    pub call_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            project_key: "SER".into(),
            issue_type: "Task".into(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Creates one destination issue per source record, at most once per
/// natural key, and mirrors the record's state onto the new issue.
pub struct SyncEngine {
    writer: Arc<dyn DestinationWriter>,
    identity: IdentityStore,
    settings: EngineSettings,
}

impl SyncEngine {
    pub fn new(
        writer: Arc<dyn DestinationWriter>,
        identity: IdentityStore,
        settings: EngineSettings,
    ) -> Self {
        Self {
            writer,
            identity,
            settings,
        }
    }

    #[cfg(test)]
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Migrate a single record.
    ///
    /// Creation failures come back as `Ok(Outcome::Error)`. `Err` is
    /// reserved for the identity store failing before anything was created.
    pub async fn migrate(&self, record: &SourceRecord) -> Result<Outcome> {
        let identity = IdentityKey::for_record(record);

        if let Some(existing) = self.identity.lookup(&identity).await? {
            if self.issue_exists(&existing).await {
                tracing::info!(%identity, key = %existing, "already migrated");
                return Ok(Outcome::AlreadyMigrated {
                    url: self.writer.browse_url(&existing),
                    key: existing,
                });
            }
            tracing::info!(%identity, key = %existing, "mapped issue is gone, dropping stale mapping");
            self.identity.remove(&identity).await?;
        }

        let payload = IssuePayload {
            project_key: self.settings.project_key.clone(),
            issue_type: self.settings.issue_type.clone(),
            summary: record.summary.clone(),
            description: record.description.clone(),
            priority: map_priority(&record.priority),
        };

        let created = match self.bounded(self.writer.create_issue(&payload)).await {
            Ok(Ok(created)) => created,
            Ok(Err(err)) => {
                tracing::warn!(%identity, error = %err, "issue creation failed");
                return Ok(err.into());
            }
            Err(_) => {
                tracing::warn!(%identity, "issue creation timed out");
                return Ok(CreationError::TimedOut.into());
            }
        };

        // The issue exists from here on; a failed save must not hide its key.
        let mapping_error = match self.identity.save(&identity, &created.key).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(%identity, key = %created.key, "failed to save mapping: {e:#}");
                Some(format!("{e:#}"))
            }
        };

        let target_status = map_status(&record.status);
        let transition_error = self.apply_status(&created.key, target_status).await.err();
        if let Some(err) = &transition_error {
            tracing::warn!(key = %created.key, %target_status, error = %err, "status not applied");
        }

        tracing::info!(%identity, key = %created.key, "created issue");
        Ok(Outcome::Created {
            url: self.writer.browse_url(&created.key),
            key: created.key,
            target_status,
            status_applied: transition_error.is_none(),
            transition_error: transition_error.map(|e| e.to_string()),
            mapping_error,
        })
    }

    /// Migrate records one after another, in order. A failing record never
    /// stops the ones after it.
    pub async fn migrate_all(&self, records: &[SourceRecord]) -> Vec<MigrationResult> {
        let mut results = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            tracing::debug!("[{}/{}] migrating {}", i + 1, records.len(), record.natural_key);
            let outcome = match self.migrate(record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(natural_key = %record.natural_key, "migration aborted: {e:#}");
                    Outcome::error(format!("{e:#}"))
                }
            };
            tracing::debug!(natural_key = %record.natural_key, key = ?outcome.key(), "done");
            results.push(MigrationResult::new(record.clone(), outcome));
        }
        results
    }

    /// A failed or timed-out check counts as "gone", same as a 404.
    async fn issue_exists(&self, key: &str) -> bool {
        match self.bounded(self.writer.get_issue(key)).await {
            Ok(Ok(exists)) => exists,
            Ok(Err(e)) => {
                tracing::warn!(%key, "issue lookup failed: {e:#}");
                false
            }
            Err(_) => {
                tracing::warn!(%key, "issue lookup timed out");
                false
            }
        }
    }

    async fn apply_status(&self, key: &str, target: DestinationStatus) -> Result<(), TransitionError> {
        let transitions = self
            .bounded(self.writer.list_transitions(key))
            .await
            .map_err(|_| TransitionError::TimedOut)?
            .map_err(|e| TransitionError::Request(format!("{e:#}")))?;

        let transition = transitions
            .iter()
            .find(|t| t.target_state.eq_ignore_ascii_case(target.as_str()))
            .ok_or_else(|| TransitionError::NoMatchingTransition(target.to_string()))?;

        let applied = self
            .bounded(self.writer.execute_transition(key, &transition.id))
            .await
            .map_err(|_| TransitionError::TimedOut)?
            .map_err(|e| TransitionError::Request(format!("{e:#}")))?;

        if applied {
            Ok(())
        } else {
            Err(TransitionError::Rejected(transition.id.clone()))
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Result<T, Elapsed> {
        timeout(self.settings.call_timeout, fut).await
    }
}
