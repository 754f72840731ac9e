//! Ledger state and its write-through persistence.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use scribe_core::{Item, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Harvest status of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Success,
    Failed,
}

/// One record per discovered item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: ItemId,
    pub title: String,
    pub url: String,
    pub status: EntryStatus,
    pub discovered_at: DateTime<Utc>,
    /// Position in the listing when first discovered
    #[serde(default)]
    pub discovery_index: usize,
    #[serde(default)]
    pub download_path: Option<PathBuf>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub method_used: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// One strategy invocation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub success: bool,
    /// `None` when the strategy declined for lack of content
    #[serde(default)]
    pub error: Option<String>,
}

/// Totals of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Counts reported at the end of a run and by `scribe status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Discovered and never attempted to completion
    pub pending: usize,
}

impl std::fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={} successful={} failed={} pending={}",
            self.total, self.successful, self.failed, self.pending
        )
    }
}

/// Serialized form. Every field defaults so files from older or newer
/// versions still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    #[serde(default)]
    items: BTreeMap<ItemId, LedgerEntry>,
    #[serde(default)]
    attempts: BTreeMap<ItemId, Vec<AttemptRecord>>,
    #[serde(default)]
    successful: BTreeSet<ItemId>,
    #[serde(default)]
    failed: BTreeSet<ItemId>,
    #[serde(default)]
    run_history: Vec<RunRecord>,
    #[serde(default)]
    session_created: Option<DateTime<Utc>>,
    #[serde(default)]
    last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    total_found: usize,
}

/// Durable mapping from item id to discovery, attempt, and result state.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    state: LedgerState,
    saves: usize,
}

impl Ledger {
    /// Load the ledger stored at `path`.
    ///
    /// A missing or unreadable file yields an empty ledger bound to the same
    /// path; loading never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<LedgerState>(&contents) {
                Ok(state) => {
                    tracing::debug!(
                        "Loaded ledger from {} ({} items)",
                        path.display(),
                        state.items.len()
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!("Ledger {} is corrupt, starting fresh: {}", path.display(), e);
                    LedgerState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(e) => {
                tracing::warn!("Cannot read ledger {}, starting fresh: {}", path.display(), e);
                LedgerState::default()
            }
        };

        Self {
            path,
            state,
            saves: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a discovered item. Returns `true` if it was new.
    pub fn register(&mut self, item: &Item) -> Result<bool> {
        if self.state.items.contains_key(&item.id) {
            return Ok(false);
        }

        let entry = LedgerEntry {
            id: item.id.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            status: EntryStatus::Pending,
            discovered_at: Utc::now(),
            discovery_index: self.state.items.len(),
            download_path: None,
            file_size: None,
            method_used: None,
            last_error: None,
        };
        self.state.items.insert(item.id.clone(), entry);
        self.save()?;
        Ok(true)
    }

    /// Append an attempt record. Entry status is left unchanged.
    pub fn record_attempt(
        &mut self,
        id: &ItemId,
        method: &str,
        success: bool,
        error: Option<String>,
    ) -> Result<()> {
        if !self.state.items.contains_key(id) {
            return Err(LedgerError::UnknownItem(id.clone()));
        }
        self.state
            .attempts
            .entry(id.clone())
            .or_default()
            .push(AttemptRecord {
                timestamp: Utc::now(),
                method: method.to_string(),
                success,
                error,
            });
        self.save()
    }

    pub fn mark_success(
        &mut self,
        id: &ItemId,
        path: &Path,
        method: &str,
        size: u64,
    ) -> Result<()> {
        let entry = self
            .state
            .items
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownItem(id.clone()))?;

        entry.status = EntryStatus::Success;
        entry.download_path = Some(path.to_path_buf());
        entry.method_used = Some(method.to_string());
        entry.file_size = Some(size);
        entry.last_error = None;

        self.state.failed.remove(id);
        self.state.successful.insert(id.clone());
        self.save()
    }

    /// Mark an item failed for this run. A successful item stays successful.
    pub fn mark_failure(&mut self, id: &ItemId, error: Option<String>) -> Result<()> {
        let entry = self
            .state
            .items
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownItem(id.clone()))?;

        if entry.status == EntryStatus::Success {
            tracing::debug!("Ignoring failure for already harvested {}", id);
            return Ok(());
        }

        entry.status = EntryStatus::Failed;
        if error.is_some() {
            entry.last_error = error;
        }
        self.state.failed.insert(id.clone());
        self.save()
    }

    /// Entries not yet harvested (pending or failed), in discovery order.
    pub fn pending(&self) -> Vec<&LedgerEntry> {
        let mut entries: Vec<_> = self
            .state
            .items
            .values()
            .filter(|e| e.status != EntryStatus::Success)
            .collect();
        entries.sort_by_key(|e| e.discovery_index);
        entries
    }

    pub fn is_downloaded(&self, id: &ItemId) -> bool {
        self.state.successful.contains(id)
    }

    pub fn entry(&self, id: &ItemId) -> Option<&LedgerEntry> {
        self.state.items.get(id)
    }

    pub fn attempts(&self, id: &ItemId) -> &[AttemptRecord] {
        self.state.attempts.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn run_history(&self) -> &[RunRecord] {
        &self.state.run_history
    }

    pub fn stats(&self) -> LedgerStats {
        let pending = self
            .state
            .items
            .values()
            .filter(|e| e.status == EntryStatus::Pending)
            .count();
        LedgerStats {
            total: self.state.items.len(),
            successful: self.state.successful.len(),
            failed: self.state.failed.len(),
            pending,
        }
    }

    pub fn record_run(&mut self, processed: usize, successful: usize, failed: usize) -> Result<()> {
        self.state.run_history.push(RunRecord {
            timestamp: Utc::now(),
            processed,
            successful,
            failed,
        });
        self.save()
    }

    pub fn mark_session_created(&mut self) -> Result<()> {
        self.state.session_created = Some(Utc::now());
        self.save()
    }

    pub fn session_created(&self) -> Option<DateTime<Utc>> {
        self.state.session_created
    }

    pub fn set_total_found(&mut self, total: usize) -> Result<()> {
        self.state.total_found = total;
        self.save()
    }

    pub fn total_found(&self) -> usize {
        self.state.total_found
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.state.last_run
    }

    /// Number of writes performed by this instance.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Write the whole ledger atomically: a sibling temp file is written,
    /// then renamed over the target.
    fn save(&mut self) -> Result<()> {
        self.state.last_run = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&self.state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        self.saves += 1;
        Ok(())
    }
}
