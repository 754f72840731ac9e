//! Concurrent harvest of pending items.
//!
//! Each task owns its own browser session; the ledger is the only shared
//! state. Items are scheduled in discovery order, at most `workers` at a
//! time. There is no retry within a run: a failed item stays failed until
//! the next run picks it up again.

use crate::error::{HarvestError, Result};
use crate::orchestrator::{load_snapshot, Harvester, RunSummary, NAVIGATION_METHOD};
use futures::stream::{FuturesUnordered, StreamExt};
use scribe_browser::{BrowserActions, SessionSnapshot};
use scribe_core::Item;
use scribe_extract::ExtractionChain;
use scribe_ledger::SharedLedger;
use std::time::Duration;

/// Result of one item in a parallel run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemResult {
    Harvested,
    Skipped,
    Failed,
}

struct Worker<'a> {
    harvester: &'a Harvester,
    ledger: &'a SharedLedger,
    chain: &'a ExtractionChain,
    snapshot: Option<&'a SessionSnapshot>,
}

impl Worker<'_> {
    async fn process(&self, tag: usize, item: Item) -> Result<ItemResult> {
        if self.ledger.is_downloaded(&item.id).await {
            tracing::debug!("[worker {}] Already downloaded: {}", tag, item.short_title());
            return Ok(ItemResult::Skipped);
        }
        tracing::info!("[worker {}] Processing: {}", tag, item.short_title());

        let page = match self.harvester.factory.launch().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("[worker {}] Could not start browser: {}", tag, e);
                self.ledger.mark_failure(&item.id, Some(e.to_string())).await?;
                return Ok(ItemResult::Failed);
            }
        };

        let result = self.harvest(tag, page.as_ref(), &item).await;
        if let Err(e) = page.close().await {
            tracing::warn!("[worker {}] Failed to close browser: {}", tag, e);
        }
        result
    }

    async fn harvest(&self, tag: usize, page: &dyn BrowserActions, item: &Item) -> Result<ItemResult> {
        if let Some(snapshot) = self.snapshot {
            if let Err(e) = page.restore_session(snapshot).await {
                tracing::warn!("[worker {}] Failed to restore session: {}", tag, e);
            }
        }

        if let Err(e) = page.navigate(&item.url).await {
            tracing::error!("[worker {}] Navigation failed for {}: {}", tag, item.id, e);
            self.ledger
                .record_attempt(&item.id, NAVIGATION_METHOD, false, Some(e.to_string()))
                .await?;
            self.ledger.mark_failure(&item.id, Some(e.to_string())).await?;
            return Ok(ItemResult::Failed);
        }
        let settle = self.harvester.config.download.parallel_settle_ms;
        tokio::time::sleep(Duration::from_millis(settle)).await;

        match self.chain.run(page, item, self.ledger).await? {
            Some(harvest) => {
                tracing::info!(
                    "[worker {}] Harvested {} via {} ({} bytes)",
                    tag,
                    item.id,
                    harvest.method,
                    harvest.size
                );
                Ok(ItemResult::Harvested)
            }
            None => {
                tracing::warn!("[worker {}] No transcript content found: {}", tag, item.short_title());
                self.ledger
                    .mark_failure(&item.id, Some("no transcript content found".to_string()))
                    .await?;
                Ok(ItemResult::Failed)
            }
        }
    }
}

#[derive(Default)]
struct Tally {
    processed: usize,
    successful: usize,
    failed: usize,
    /// First error that ends the run
    error: Option<HarvestError>,
}

impl Tally {
    fn add(&mut self, result: Result<ItemResult>) {
        match result {
            Ok(ItemResult::Harvested) => {
                self.processed += 1;
                self.successful += 1;
            }
            Ok(ItemResult::Failed) => {
                self.processed += 1;
                self.failed += 1;
            }
            Ok(ItemResult::Skipped) => {}
            Err(e) => {
                tracing::error!("Parallel run stopping: {}", e);
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
    }
}

impl Harvester {
    /// Harvest every pending ledger item with up to `workers` concurrent
    /// browser sessions.
    ///
    /// Works from the ledger alone: run a sequential pass first to log in
    /// and discover items.
    pub async fn run_parallel(&self, workers: usize) -> Result<RunSummary> {
        let workers = workers.max(1);
        tokio::fs::create_dir_all(&self.config.paths.output_dir).await?;

        let ledger = self.open_ledger();
        let items: Vec<Item> = ledger
            .lock()
            .await
            .pending()
            .into_iter()
            .map(|entry| Item::new(entry.id.clone(), entry.title.clone(), entry.url.clone()))
            .collect();
        tracing::info!("Parallel run: {} pending items, {} workers", items.len(), workers);

        let snapshot = load_snapshot(&self.config.paths.session_file);
        let chain = ExtractionChain::parallel(&self.config);
        let worker = Worker {
            harvester: self,
            ledger: &ledger,
            chain: &chain,
            snapshot: snapshot.as_ref(),
        };

        let mut futures = FuturesUnordered::new();
        let mut tally = Tally::default();

        for (idx, item) in items.into_iter().enumerate() {
            futures.push(worker.process(idx % workers, item));

            while futures.len() >= workers {
                if let Some(result) = futures.next().await {
                    tally.add(result);
                }
            }
            if tally.error.is_some() {
                break;
            }
        }
        // in-flight items still close their sessions
        while let Some(result) = futures.next().await {
            tally.add(result);
        }
        if let Some(e) = tally.error {
            return Err(e);
        }

        ledger
            .record_run(tally.processed, tally.successful, tally.failed)
            .await?;
        let stats = ledger.stats().await;
        tracing::info!("Parallel run complete: {}", stats);

        Ok(RunSummary {
            processed: tally.processed,
            successful: tally.successful,
            failed: tally.failed,
            stats,
        })
    }
}
