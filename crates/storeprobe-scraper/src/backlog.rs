//! Manual-review backlog for domains whose platform was identified
//! confidently but whose standard listing paths all failed.
//!
//! Append-only and de-duplicated by domain. The engine writes it and never
//! reads it back for decisions.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storeprobe_core::ConfidenceLevel;

use crate::classifier::DetectionResult;
use crate::error::StoreError;
use crate::knowledge::write_atomic;
use crate::site::normalize_domain;

/// What the classifier concluded at the time the domain was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub platform_id: Option<String>,
    pub score: u32,
    pub confidence: ConfidenceLevel,
    pub matched_signals: Vec<String>,
}

impl From<&DetectionResult> for DetectionSnapshot {
    fn from(detection: &DetectionResult) -> Self {
        Self {
            platform_id: detection.platform_id.clone(),
            score: detection.score,
            confidence: detection.confidence,
            matched_signals: detection
                .matched_signals
                .iter()
                .map(|s| s.description.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub domain: String,
    pub reason: String,
    pub detection: DetectionSnapshot,
    #[serde(default)]
    pub attempted_paths: Vec<String>,
    pub added_at: DateTime<Utc>,
}

impl BacklogEntry {
    #[must_use]
    pub fn new(
        domain: &str,
        reason: impl Into<String>,
        detection: DetectionSnapshot,
        attempted_paths: Vec<String>,
    ) -> Self {
        Self {
            domain: normalize_domain(domain),
            reason: reason.into(),
            detection,
            attempted_paths,
            added_at: Utc::now(),
        }
    }
}

pub trait Backlog: Send + Sync {
    /// Appends `entry` unless its domain is already present.
    /// Returns whether the entry was added.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backlog cannot be persisted.
    fn add(&self, entry: BacklogEntry) -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the backlog cannot be read.
    fn entries(&self) -> Result<Vec<BacklogEntry>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryBacklog {
    entries: Mutex<Vec<BacklogEntry>>,
}

impl MemoryBacklog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backlog for MemoryBacklog {
    fn add(&self, entry: BacklogEntry) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|e| e.domain == entry.domain) {
            return Ok(false);
        }
        entries.push(entry);
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<BacklogEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// JSON array on disk, rewritten whole on each addition.
#[derive(Debug)]
pub struct JsonFileBacklog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBacklog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<BacklogEntry>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Serialize {
            context: self.path.display().to_string(),
            source: e,
        })
    }
}

impl Backlog for JsonFileBacklog {
    fn add(&self, entry: BacklogEntry) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read()?;
        if entries.iter().any(|e| e.domain == entry.domain) {
            tracing::debug!(domain = %entry.domain, "domain already in backlog");
            return Ok(false);
        }

        tracing::warn!(domain = %entry.domain, reason = %entry.reason, "added to manual backlog");
        entries.push(entry);
        let json = serde_json::to_string_pretty(&entries).map_err(|e| StoreError::Serialize {
            context: "backlog".to_string(),
            source: e,
        })?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<BacklogEntry>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
    }
}
