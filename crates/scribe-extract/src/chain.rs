//! Ordered strategy chain.

use crate::artifact::ArtifactWriter;
use crate::error::Result;
use crate::strategies::{DirectText, ExportButton, Screenshot, StructuredData};
use crate::strategy::{Method, Outcome, Strategy};
use scribe_browser::BrowserActions;
use scribe_core::{AppConfig, Item};
use scribe_ledger::SharedLedger;
use std::path::PathBuf;
use std::time::Duration;

/// A successfully harvested item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub method: Method,
    pub path: PathBuf,
    pub size: u64,
}

/// Strategies tried in priority order until one produces content.
pub struct ExtractionChain {
    strategies: Vec<Box<dyn Strategy>>,
    writer: ArtifactWriter,
    gap: Duration,
}

impl ExtractionChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, writer: ArtifactWriter) -> Self {
        Self {
            strategies,
            writer,
            gap: Duration::ZERO,
        }
    }

    /// Pause between a failed strategy and the next one.
    #[must_use]
    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    /// Direct text, structured data, the export flow when enabled, then a
    /// screenshot.
    pub fn sequential(config: &AppConfig) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(DirectText::new(config.selectors.clone())),
            Box::new(StructuredData),
        ];
        if config.download.export_button_enabled {
            strategies.push(Box::new(ExportButton::new(
                config.selectors.clone(),
                &config.download,
            )));
        }
        strategies.push(Box::new(Screenshot));

        Self::new(strategies, Self::writer(config))
            .with_gap(Duration::from_millis(config.download.strategy_gap_ms))
    }

    /// The fast text-only subset used by concurrent workers.
    pub fn parallel(config: &AppConfig) -> Self {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(DirectText::new(config.selectors.clone())),
            Box::new(StructuredData),
        ];
        Self::new(strategies, Self::writer(config))
    }

    fn writer(config: &AppConfig) -> ArtifactWriter {
        ArtifactWriter::new(
            config.paths.output_dir.clone(),
            config.download.filename_max_len,
        )
    }

    pub fn methods(&self) -> Vec<Method> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Run the chain against a loaded item page.
    ///
    /// Every strategy invoked leaves one attempt record. On the first success
    /// the artifact is written and the item marked harvested. `Ok(None)`
    /// means every strategy failed; only ledger failures are returned as
    /// errors.
    pub async fn run(
        &self,
        page: &dyn BrowserActions,
        item: &Item,
        ledger: &SharedLedger,
    ) -> Result<Option<Harvest>> {
        for (idx, strategy) in self.strategies.iter().enumerate() {
            let method = strategy.method();
            tracing::info!("[{}] Trying {}", method, item.short_title());

            let error = match strategy.extract(page, item).await {
                Ok(Outcome::Found(artifact)) => {
                    match self.writer.write(item, method, &artifact).await {
                        Ok((path, size)) => {
                            ledger
                                .record_attempt(&item.id, method.as_str(), true, None)
                                .await?;
                            ledger
                                .mark_success(&item.id, &path, method.as_str(), size)
                                .await?;
                            return Ok(Some(Harvest { method, path, size }));
                        }
                        Err(e) => Some(e.to_string()),
                    }
                }
                Ok(Outcome::Declined(reason)) => {
                    tracing::debug!("[{}] Declined: {}", method, reason);
                    None
                }
                Err(e) => {
                    tracing::debug!("[{}] Error: {}", method, e);
                    Some(e.to_string())
                }
            };

            ledger
                .record_attempt(&item.id, method.as_str(), false, error)
                .await?;

            if idx + 1 < self.strategies.len() && !self.gap.is_zero() {
                tokio::time::sleep(self.gap).await;
            }
        }
        Ok(None)
    }
}
