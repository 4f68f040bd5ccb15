//! Swappable backing stores for the knowledge table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::DomainRecord;
use crate::error::StoreError;

/// Key-value access to domain records. Implementations persist every `set`.
pub trait RecordStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    fn get(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError>;

    /// Inserts or replaces the record keyed by `record.domain`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change cannot be made durable.
    fn set(&self, record: DomainRecord) -> Result<(), StoreError>;

    /// All records, ordered by domain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    fn list(&self) -> Result<Vec<DomainRecord>, StoreError>;
}

/// On-disk shape of the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KnowledgeTable {
    pub(crate) last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) domains: BTreeMap<String, DomainRecord>,
}

impl KnowledgeTable {
    fn insert(&mut self, record: DomainRecord) {
        self.last_updated = Some(
            self.last_updated
                .map_or(record.last_updated, |t| t.max(record.last_updated)),
        );
        self.domains.insert(record.domain.clone(), record);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<KnowledgeTable>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.domains.get(domain).cloned())
    }

    fn set(&self, record: DomainRecord) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.insert(record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DomainRecord>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.domains.values().cloned().collect())
    }
}

/// Whole-table JSON file, loaded once at open and rewritten atomically
/// (temp file + rename) on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: Mutex<KnowledgeTable>,
}

impl JsonFileStore {
    /// Opens `path`, treating a missing or empty file as an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = read_table(&path)?;
        tracing::debug!(path = %path.display(), domains = table.domains.len(), "opened knowledge table");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.domains.get(domain).cloned())
    }

    fn set(&self, record: DomainRecord) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = table.clone();
        next.insert(record);
        write_table(&self.path, &next)?;
        *table = next;
        Ok(())
    }

    fn list(&self) -> Result<Vec<DomainRecord>, StoreError> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(table.domains.values().cloned().collect())
    }
}

pub(crate) fn read_table(path: &Path) -> Result<KnowledgeTable, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KnowledgeTable::default()),
        Err(e) => {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    if content.trim().is_empty() {
        return Ok(KnowledgeTable::default());
    }
    serde_json::from_str(&content).map_err(|e| StoreError::Serialize {
        context: path.display().to_string(),
        source: e,
    })
}

pub(crate) fn write_table(path: &Path, table: &KnowledgeTable) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(table).map_err(|e| StoreError::Serialize {
        context: "knowledge table".to_string(),
        source: e,
    })?;
    write_atomic(path, json.as_bytes())
}

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |p: &Path, e: std::io::Error| StoreError::Io {
        path: p.display().to_string(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))
}
