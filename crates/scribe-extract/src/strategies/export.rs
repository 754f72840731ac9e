//! The service's own export: overflow menu, Export item, confirm dialog.
//!
//! Longest UI dependency chain of all strategies and disabled by default.

use crate::error::Result;
use crate::strategy::{Artifact, Method, Outcome, Strategy};
use scribe_browser::probe::{click_first, css_targets};
use scribe_browser::{BrowserActions, Target};
use scribe_core::{DownloadConfig, Item, SelectorConfig};
use std::time::Duration;

const EXPORT_LABEL: &str = "Export";
const REEXPORT_LABEL: &str = "Re-export";
/// Wait per overflow-menu candidate
const PROBE_TIMEOUT_MS: u64 = 5000;

pub struct ExportButton {
    selectors: SelectorConfig,
    menu_wait: Duration,
    download_timeout_ms: u64,
}

impl ExportButton {
    pub fn new(selectors: SelectorConfig, download: &DownloadConfig) -> Self {
        Self {
            selectors,
            menu_wait: Duration::from_millis(download.settle_ms),
            download_timeout_ms: download.export_timeout_ms,
        }
    }

    async fn open_overflow_menu(&self, page: &dyn BrowserActions) -> bool {
        let menus = css_targets(&self.selectors.overflow_menu);
        if click_first(page, &menus, PROBE_TIMEOUT_MS).await.is_some() {
            return true;
        }

        // icon fonts render the glyph name as button text
        let icons: Vec<Target> = self
            .selectors
            .overflow_icons
            .iter()
            .map(|icon| Target::with_text("button", icon.as_str()))
            .collect();
        click_first(page, &icons, 0).await.is_some()
    }
}

#[async_trait::async_trait]
impl Strategy for ExportButton {
    fn method(&self) -> Method {
        Method::ExportButton
    }

    async fn extract(&self, page: &dyn BrowserActions, _item: &Item) -> Result<Outcome> {
        if !self.open_overflow_menu(page).await {
            return Ok(Outcome::Declined("more options button not found"));
        }
        tokio::time::sleep(self.menu_wait).await;

        let menu_items: Vec<Target> = self
            .selectors
            .export_menu_items
            .iter()
            .map(|sel| Target::with_text(sel.as_str(), EXPORT_LABEL).excluding(REEXPORT_LABEL))
            .collect();
        if click_first(page, &menu_items, 0).await.is_none() {
            return Ok(Outcome::Declined("export option not found"));
        }
        tokio::time::sleep(self.menu_wait).await;

        for selector in &self.selectors.export_confirm {
            let confirm = Target::with_text(selector.as_str(), EXPORT_LABEL);
            if !page.is_visible(&confirm).await.unwrap_or(false) {
                continue;
            }
            match page.download(&confirm, self.download_timeout_ms).await {
                Ok(bytes) => return Ok(Outcome::Found(Artifact::Download(bytes))),
                Err(e) => tracing::debug!("[{}] {} did not export: {}", Method::ExportButton, confirm, e),
            }
        }
        Ok(Outcome::Declined("could not complete export"))
    }
}
