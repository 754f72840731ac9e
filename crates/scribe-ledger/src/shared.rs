//! Ledger handle shared between concurrent workers.
//!
//! One coarse lock covers every read-modify-write-persist cycle; workers
//! marking different items never interleave inside a save.

use crate::error::Result;
use crate::ledger::{Ledger, LedgerStats};
use scribe_core::ItemId;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Exclusive access for multi-step updates.
    pub async fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().await
    }

    pub async fn is_downloaded(&self, id: &ItemId) -> bool {
        self.inner.lock().await.is_downloaded(id)
    }

    pub async fn record_attempt(
        &self,
        id: &ItemId,
        method: &str,
        success: bool,
        error: Option<String>,
    ) -> Result<()> {
        self.inner
            .lock()
            .await
            .record_attempt(id, method, success, error)
    }

    pub async fn mark_success(&self, id: &ItemId, path: &Path, method: &str, size: u64) -> Result<()> {
        self.inner.lock().await.mark_success(id, path, method, size)
    }

    pub async fn mark_failure(&self, id: &ItemId, error: Option<String>) -> Result<()> {
        self.inner.lock().await.mark_failure(id, error)
    }

    pub async fn record_run(&self, processed: usize, successful: usize, failed: usize) -> Result<()> {
        self.inner
            .lock()
            .await
            .record_run(processed, successful, failed)
    }

    pub async fn stats(&self) -> LedgerStats {
        self.inner.lock().await.stats()
    }
}
