//! Item discovery on the lazily loaded listing page.

use crate::error::Result;
use scribe_browser::{BrowserActions, Link};
use scribe_core::{AppConfig, DiscoveryConfig, Item, ItemId, ServiceConfig};
use scribe_ledger::SharedLedger;
use std::collections::HashSet;
use std::time::Duration;

const PROGRESS_EVERY: u32 = 10;
/// Anchor text shorter than this is replaced by a synthetic title.
const MIN_TITLE_CHARS: usize = 2;
const SYNTHETIC_ID_CHARS: usize = 10;

/// How the scroll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub iterations: u32,
    /// Item count at the last observation
    pub count: usize,
}

/// Scroll until the item count is unchanged for a full stability window or
/// `max_scrolls` is reached.
pub async fn scroll_to_load_all(
    page: &dyn BrowserActions,
    discovery: &DiscoveryConfig,
    max_scrolls: u32,
) -> ScrollReport {
    tracing::info!("Scrolling to load items (limit: {} scrolls)", max_scrolls);

    match page.count(&discovery.container_selector).await {
        Ok(n) if n > 0 => tracing::info!("Found listing container {}", discovery.container_selector),
        _ => tracing::warn!(
            "Listing container {} not found, scrolling the page",
            discovery.container_selector
        ),
    }

    let wait = Duration::from_millis(discovery.scroll_wait_ms);
    let mut previous = 0;
    let mut unchanged = 0;
    let mut iterations = 0;

    while unchanged < discovery.stability_window && iterations < max_scrolls {
        if let Err(e) = page.scroll_to_bottom(&discovery.container_selector).await {
            tracing::debug!("Scroll failed: {}", e);
        }
        tokio::time::sleep(wait).await;
        iterations += 1;

        let count = match page.count(&discovery.count_selector).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!("Count failed: {}", e);
                previous
            }
        };
        if count == previous {
            unchanged += 1;
        } else {
            unchanged = 0;
        }
        previous = count;

        if iterations % PROGRESS_EVERY == 0 {
            tracing::info!("Scroll progress: {} scrolls, {} items found", iterations, count);
        }
    }

    tracing::info!("Loaded {} items after {} scrolls", previous, iterations);
    ScrollReport {
        iterations,
        count: previous,
    }
}

/// Normalize listing anchors into unique items, in listing order.
pub fn parse_items(links: &[Link], service: &ServiceConfig, discovery: &DiscoveryConfig) -> Vec<Item> {
    let base = service.base_url.trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for link in links {
        let Some(id) = ItemId::from_href(&link.href, &service.item_path_prefix) else {
            continue;
        };
        if id.len() < discovery.min_id_len || !seen.insert(id.clone()) {
            continue;
        }

        let text = link.text.trim();
        let title: String = if text.chars().count() < MIN_TITLE_CHARS {
            format!("Meeting_{}", id.prefix(SYNTHETIC_ID_CHARS))
        } else {
            text.chars().take(discovery.max_title_len).collect()
        };
        let url = format!("{}{}{}", base, service.item_path_prefix, id);
        items.push(Item::new(id, title, url));
    }
    items
}

/// Load the whole listing, then register every item found in the ledger.
///
/// The listing page must already be open.
pub async fn discover(
    page: &dyn BrowserActions,
    config: &AppConfig,
    ledger: &SharedLedger,
    quick: bool,
) -> Result<Vec<Item>> {
    let discovery = &config.discovery;
    let max_scrolls = if quick {
        discovery.quick_max_scrolls
    } else {
        discovery.max_scrolls
    };
    scroll_to_load_all(page, discovery, max_scrolls).await;

    tracing::info!("Extracting item information...");
    let links = page.links(&discovery.anchor_selector).await?;
    let items = parse_items(&links, &config.service, discovery);

    let mut ledger = ledger.lock().await;
    let mut new = 0;
    for item in &items {
        if ledger.register(item)? {
            new += 1;
        }
    }
    ledger.set_total_found(items.len())?;

    tracing::info!("Found {} unique items ({} new)", items.len(), new);
    Ok(items)
}
