//! Knowledge Base: the durable per-domain memory of what worked.
//!
//! The knowledge base is the single writer of [`DomainRecord`]s. Every
//! mutating call is a read-modify-write of one record under a global async
//! lock, followed by a durable write through the [`RecordStore`].

mod record;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use storeprobe_core::AppConfig;

use crate::error::StoreError;
use crate::site::normalize_domain;
use crate::types::PageRole;

pub use record::{Attempt, AttemptOutcome, DomainRecord};
pub use store::{JsonFileStore, MemoryStore, RecordStore};
pub(crate) use store::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgePolicy {
    /// Consecutive failures of one role that invalidate its confirmed pattern.
    pub failure_threshold: u32,
    /// Bound on `recent_attempts`.
    pub history_limit: usize,
}

impl Default for KnowledgePolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            history_limit: 10,
        }
    }
}

impl From<&AppConfig> for KnowledgePolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            history_limit: config.history_limit,
        }
    }
}

pub struct KnowledgeBase {
    store: Arc<dyn RecordStore>,
    policy: KnowledgePolicy,
    write_lock: tokio::sync::Mutex<()>,
}

impl KnowledgeBase {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, policy: KnowledgePolicy) -> Self {
        Self {
            store,
            policy,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Opens a JSON-file-backed knowledge base at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>, policy: KnowledgePolicy) -> Result<Self, StoreError> {
        let store = JsonFileStore::open(path)?;
        Ok(Self::new(Arc::new(store), policy))
    }

    #[must_use]
    pub fn in_memory(policy: KnowledgePolicy) -> Self {
        Self::new(Arc::new(MemoryStore::new()), policy)
    }

    #[must_use]
    pub fn policy(&self) -> &KnowledgePolicy {
        &self.policy
    }

    /// Returns the record for `domain`, creating and storing an empty one on
    /// first sight. Never fails: persistence problems are logged and a fresh
    /// record is returned.
    pub async fn lookup(&self, domain: &str) -> DomainRecord {
        let key = normalize_domain(domain);
        let _guard = self.write_lock.lock().await;

        match self.store.get(&key) {
            Ok(Some(record)) => record,
            Ok(None) => {
                let record = DomainRecord::new(&key, Utc::now());
                if let Err(err) = self.store.set(record.clone()) {
                    tracing::warn!(domain = %key, error = %err, "could not persist new domain record");
                }
                record
            }
            Err(err) => {
                tracing::warn!(domain = %key, error = %err, "knowledge lookup failed, using empty record");
                DomainRecord::new(&key, Utc::now())
            }
        }
    }

    /// Read-only lookup that does not create a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn get(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        let key = normalize_domain(domain);
        let _guard = self.write_lock.lock().await;
        self.store.get(&key)
    }

    /// Records a validated page for `role`.
    ///
    /// Sets the confirmed pattern, bumps `success_count`, clears
    /// `needs_reanalysis` and the role's failure streak. `platform_id` replaces
    /// the stored platform when given.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the updated record cannot be persisted.
    pub async fn reinforce(
        &self,
        domain: &str,
        role: PageRole,
        confirmed_url: &str,
        platform_id: Option<&str>,
    ) -> Result<DomainRecord, StoreError> {
        let limit = self.policy.history_limit;
        let record = self
            .update(domain, |record| {
                let now = Utc::now();
                record.set_confirmed_pattern(role, Some(confirmed_url.to_string()));
                if let Some(platform) = platform_id {
                    record.platform_id = Some(platform.to_string());
                }
                record.success_count += 1;
                *record.streak_mut(role) = 0;
                record.needs_reanalysis = false;
                record.push_attempt(
                    Attempt {
                        at: now,
                        role: Some(role),
                        outcome: AttemptOutcome::Success,
                        url: Some(confirmed_url.to_string()),
                        attempted_paths: Vec::new(),
                    },
                    limit,
                );
                record.last_updated = now;
            })
            .await?;

        tracing::info!(
            domain = %record.domain,
            %role,
            url = confirmed_url,
            platform = record.platform_id.as_deref().unwrap_or("-"),
            "knowledge reinforced"
        );
        Ok(record)
    }

    /// Records an exhausted candidate list for `role`.
    ///
    /// When the role's consecutive failures reach the policy threshold and the
    /// role had a confirmed pattern, the pattern is dropped and the record is
    /// flagged for re-analysis.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the updated record cannot be persisted.
    pub async fn penalize(
        &self,
        domain: &str,
        role: PageRole,
        attempted_paths: &[String],
    ) -> Result<DomainRecord, StoreError> {
        let KnowledgePolicy {
            failure_threshold,
            history_limit,
        } = self.policy;
        let mut invalidated = None;

        let record = self
            .update(domain, |record| {
                let now = Utc::now();
                record.failure_count += 1;
                let streak = record.streak_mut(role);
                *streak = streak.saturating_add(1);
                let streak = *streak;

                if streak >= failure_threshold.max(1) {
                    if let Some(pattern) = record.confirmed_pattern(role).map(str::to_string) {
                        record.set_confirmed_pattern(role, None);
                        record.needs_reanalysis = true;
                        invalidated = Some(pattern);
                    }
                }

                record.push_attempt(
                    Attempt {
                        at: now,
                        role: Some(role),
                        outcome: AttemptOutcome::Failure,
                        url: None,
                        attempted_paths: attempted_paths.to_vec(),
                    },
                    history_limit,
                );
                record.last_updated = now;
            })
            .await?;

        match invalidated {
            Some(pattern) => tracing::warn!(
                domain = %record.domain,
                %role,
                pattern,
                failures = record.failure_count,
                "confirmed pattern stopped working, flagged for re-analysis"
            ),
            None => tracing::warn!(
                domain = %record.domain,
                %role,
                attempted = attempted_paths.len(),
                failures = record.failure_count,
                "knowledge penalized"
            ),
        }
        Ok(record)
    }

    /// Hard reset after a failed end-to-end run: forgets the platform,
    /// confirmed patterns, streaks and the re-analysis flag. Lifetime counters
    /// and history are kept, with a `reset` entry appended.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the reset record cannot be persisted.
    pub async fn cleanup(&self, domain: &str) -> Result<DomainRecord, StoreError> {
        let limit = self.policy.history_limit;
        let record = self
            .update(domain, |record| {
                let now = Utc::now();
                let mut fresh = DomainRecord::new(&record.domain, now);
                fresh.success_count = record.success_count;
                fresh.failure_count = record.failure_count;
                fresh.recent_attempts = std::mem::take(&mut record.recent_attempts);
                fresh.push_attempt(
                    Attempt {
                        at: now,
                        role: None,
                        outcome: AttemptOutcome::Reset,
                        url: None,
                        attempted_paths: Vec::new(),
                    },
                    limit,
                );
                *record = fresh;
            })
            .await?;

        tracing::warn!(domain = %record.domain, "knowledge record reset");
        Ok(record)
    }

    /// All known records, ordered by domain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<DomainRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.list()
    }

    async fn update<F>(&self, domain: &str, mutate: F) -> Result<DomainRecord, StoreError>
    where
        F: FnOnce(&mut DomainRecord),
    {
        let key = normalize_domain(domain);
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .store
            .get(&key)?
            .unwrap_or_else(|| DomainRecord::new(&key, Utc::now()));
        mutate(&mut record);
        self.store.set(record.clone())?;
        Ok(record)
    }
}

#[cfg(test)]
#[path = "knowledge_test.rs"]
mod tests;
