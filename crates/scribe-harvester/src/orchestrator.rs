//! Sequential harvest over a single browser session.
//!
//! `Init -> EnsureSession -> (Login) -> Discover -> FilterPending ->
//! ForEach(download) -> Report`. Per-item failures are contained in the
//! ledger; only session-level failures end a run early.

use crate::discovery::discover;
use crate::error::{HarvestError, Result};
use crate::login::{login, Credentials};
use crate::popups::close_popup;
use scribe_browser::{BrowserActions, SessionFactory, SessionSnapshot};
use scribe_core::{AppConfig, Item, PathsConfig};
use scribe_extract::ExtractionChain;
use scribe_ledger::{Ledger, LedgerStats, SharedLedger};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Method name for attempts that never reached the extraction chain.
pub(crate) const NAVIGATION_METHOD: &str = "navigation";

/// Options of one sequential run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Delete all durable state first
    pub reset: bool,
    /// Only look at the most recent items
    pub quick: bool,
    /// Keep only the first N discovered items; wins over `quick`
    pub limit: Option<usize>,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    /// Ledger totals after the run
    pub stats: LedgerStats,
}

impl RunSummary {
    /// No item remains failed in the ledger.
    pub fn is_clean(&self) -> bool {
        self.stats.failed == 0
    }
}

/// Delete the ledger, session snapshot, and progress file.
pub fn reset_state(paths: &PathsConfig) -> Result<()> {
    for path in [&paths.state_file, &paths.session_file, &paths.progress_file] {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!("State reset complete");
    Ok(())
}

/// Capture a diagnostic screenshot into the output directory, best effort.
pub(crate) async fn debug_screenshot(page: &dyn BrowserActions, output_dir: &Path, name: &str) {
    let path = output_dir.join(name);
    match page.screenshot().await {
        Ok(png) => match tokio::fs::write(&path, png).await {
            Ok(()) => tracing::info!("Saved debug screenshot {}", path.display()),
            Err(e) => tracing::warn!("Could not write {}: {}", path.display(), e),
        },
        Err(e) => tracing::warn!("Could not capture {}: {}", name, e),
    }
}

/// Load the saved session snapshot; any problem means a fresh session.
pub(crate) fn load_snapshot(path: &Path) -> Option<SessionSnapshot> {
    match SessionSnapshot::load(path) {
        Ok(Some(snapshot)) => Some(snapshot),
        Ok(None) => {
            tracing::info!("No saved session found");
            None
        }
        Err(e) => {
            tracing::warn!("Failed to load session, starting fresh: {}", e);
            None
        }
    }
}

/// Drives harvest runs with configuration fixed at construction.
pub struct Harvester {
    pub(crate) config: AppConfig,
    pub(crate) factory: Arc<dyn SessionFactory>,
    credentials: Option<Credentials>,
}

impl Harvester {
    pub fn new(config: AppConfig, factory: Arc<dyn SessionFactory>) -> Self {
        let credentials = Credentials::from_config(&config.credentials);
        Self {
            config,
            factory,
            credentials,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn open_ledger(&self) -> SharedLedger {
        SharedLedger::new(Ledger::load(&self.config.paths.state_file))
    }

    /// Run a sequential harvest.
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        tokio::fs::create_dir_all(&self.config.paths.output_dir).await?;
        if options.reset {
            tracing::info!("Resetting state...");
            reset_state(&self.config.paths)?;
        }

        let ledger = self.open_ledger();
        let stats = ledger.stats().await;
        tracing::info!(
            "Current state: {} downloaded, {} pending, {} failed",
            stats.successful,
            stats.pending,
            stats.failed
        );

        let page = self.factory.launch().await?;
        let result = self.run_in_session(page.as_ref(), &ledger, options).await;

        if let Err(e) = &result {
            if !matches!(
                e,
                HarvestError::Authentication(_) | HarvestError::NoItemsDiscovered
            ) {
                tracing::error!("Fatal error: {}", e);
                debug_screenshot(page.as_ref(), &self.config.paths.output_dir, "debug_fatal_error.png")
                    .await;
            }
        }
        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        result
    }

    async fn run_in_session(
        &self,
        page: &dyn BrowserActions,
        ledger: &SharedLedger,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        self.ensure_session(page, ledger).await?;

        let mut items = discover(page, &self.config, ledger, options.quick).await?;
        if items.is_empty() {
            tracing::warn!("No items found");
            debug_screenshot(page, &self.config.paths.output_dir, "debug_no_meetings.png").await;
            return Err(HarvestError::NoItemsDiscovered);
        }

        if let Some(limit) = options.limit {
            tracing::info!("Limited run: only processing the top {} items", limit);
            items.truncate(limit);
        } else if options.quick {
            let limit = self.config.discovery.quick_item_limit;
            tracing::info!("Quick mode: only checking the {} most recent items", limit);
            items.truncate(limit);
        }

        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            if !ledger.is_downloaded(&item.id).await {
                pending.push(item);
            }
        }
        tracing::info!("Items to download: {}", pending.len());

        let chain = ExtractionChain::sequential(&self.config);
        let delay = Duration::from_millis(self.config.download.delay_between_items_ms);
        let mut successful = 0;

        for (idx, item) in pending.iter().enumerate() {
            tracing::info!("[{}/{}] Processing: {}", idx + 1, pending.len(), item.short_title());
            if self.download_item(page, item, ledger, &chain).await? {
                successful += 1;
            }
            if idx + 1 < pending.len() {
                tokio::time::sleep(delay).await;
            }
        }

        let failed = pending.len() - successful;
        ledger.record_run(pending.len(), successful, failed).await?;

        let stats = ledger.stats().await;
        tracing::info!("Run complete: {}", stats);
        Ok(RunSummary {
            processed: pending.len(),
            successful,
            failed,
            stats,
        })
    }

    /// Open the listing, logging in first when the service asks for it.
    async fn ensure_session(&self, page: &dyn BrowserActions, ledger: &SharedLedger) -> Result<()> {
        let paths = &self.config.paths;
        if let Some(snapshot) = load_snapshot(&paths.session_file) {
            tracing::info!("Loading saved session...");
            if let Err(e) = page.restore_session(&snapshot).await {
                tracing::warn!("Failed to restore session, continuing without it: {}", e);
            }
        }

        self.open_listing(page).await?;
        let url = page.current_url().await?;
        tracing::info!("Current URL after navigation: {}", url);
        if !self.config.auth.is_signin_url(&url) {
            return Ok(());
        }

        tracing::info!("Login required");
        let Some(credentials) = &self.credentials else {
            return Err(HarvestError::Authentication(
                "no credentials configured".to_string(),
            ));
        };
        if !login(page, &self.config, credentials).await? {
            debug_screenshot(page, &paths.output_dir, "debug_login_failed.png").await;
            return Err(HarvestError::Authentication(
                "login could not be confirmed".to_string(),
            ));
        }

        match page.export_session().await {
            Ok(snapshot) => {
                if let Err(e) = snapshot.save(&paths.session_file) {
                    tracing::warn!("Failed to save session: {}", e);
                }
                ledger.lock().await.mark_session_created()?;
            }
            Err(e) => tracing::warn!("Failed to capture session: {}", e),
        }

        self.open_listing(page).await?;
        let url = page.current_url().await?;
        if self.config.auth.is_signin_url(&url) {
            tracing::error!("Still on login page after login attempt");
            debug_screenshot(page, &paths.output_dir, "debug_still_on_login.png").await;
            return Err(HarvestError::Authentication(
                "still on the sign-in page after login".to_string(),
            ));
        }
        tracing::info!("Login confirmed");
        Ok(())
    }

    async fn open_listing(&self, page: &dyn BrowserActions) -> Result<()> {
        page.navigate(&self.config.service.listing_url)
            .await
            .map_err(|e| HarvestError::ListingUnreachable(e.to_string()))?;
        tokio::time::sleep(Duration::from_millis(self.config.auth.listing_settle_ms)).await;
        Ok(())
    }

    /// Harvest one item with retries. `Ok(false)` once every attempt failed.
    async fn download_item(
        &self,
        page: &dyn BrowserActions,
        item: &Item,
        ledger: &SharedLedger,
        chain: &ExtractionChain,
    ) -> Result<bool> {
        if ledger.is_downloaded(&item.id).await {
            tracing::info!("Already downloaded: {}", item.short_title());
            return Ok(true);
        }

        let download = &self.config.download;
        let attempts = download.max_attempts;
        for attempt in 0..attempts {
            tracing::info!("Attempt {}/{} for {}", attempt + 1, attempts, item.short_title());

            match page.navigate(&item.url).await {
                Ok(()) => {
                    tokio::time::sleep(Duration::from_millis(download.settle_ms)).await;
                    close_popup(page, &self.config.selectors).await;
                    if let Some(harvest) = chain.run(page, item, ledger).await? {
                        tracing::info!(
                            "Harvested {} via {} ({} bytes)",
                            item.id,
                            harvest.method,
                            harvest.size
                        );
                        return Ok(true);
                    }
                    tracing::warn!("All strategies failed on attempt {}", attempt + 1);
                }
                Err(e) => {
                    tracing::warn!("Navigation failed on attempt {}: {}", attempt + 1, e);
                    ledger
                        .record_attempt(&item.id, NAVIGATION_METHOD, false, Some(e.to_string()))
                        .await?;
                }
            }

            if attempt + 1 < attempts {
                let wait = download.backoff_ms(attempt);
                tracing::info!("Waiting {}ms before retry...", wait);
                tokio::time::sleep(Duration::from_millis(wait)).await;
            }
        }

        ledger
            .mark_failure(&item.id, Some(format!("failed after {attempts} attempts")))
            .await?;
        tracing::error!("Failed to download after {} attempts: {}", attempts, item.short_title());
        Ok(false)
    }
}
