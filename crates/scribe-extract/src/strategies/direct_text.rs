//! Transcript text read straight from the rendered DOM.

use crate::error::Result;
use crate::strategy::{Artifact, Method, Outcome, Strategy};
use scribe_browser::BrowserActions;
use scribe_core::{Item, SelectorConfig};

/// Text of the primary container is taken whole above this many chars.
const PRIMARY_MIN_CHARS: usize = 500;
/// Individual candidate containers must exceed this.
const CONTAINER_MIN_CHARS: usize = 50;
/// Below this the main-content fallback is consulted.
const FALLBACK_BELOW_CHARS: usize = 100;
/// A main-content candidate above this ends the fallback search.
const MAIN_CONTENT_MIN_CHARS: usize = 200;
/// Cleaned text must exceed this to count as a transcript.
const MIN_TRANSCRIPT_CHARS: usize = 100;
/// Cleaned lines must be at least this long.
const MIN_LINE_CHARS: usize = 6;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Drop short lines and lines naming UI chrome.
pub fn clean_lines(text: &str, denylist: &[String]) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| char_len(line) >= MIN_LINE_CHARS)
        .filter(|line| {
            let lower = line.to_lowercase();
            !denylist.iter().any(|phrase| lower.contains(phrase.as_str()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct DirectText {
    selectors: SelectorConfig,
}

impl DirectText {
    pub fn new(selectors: SelectorConfig) -> Self {
        Self { selectors }
    }

    async fn container_text(&self, page: &dyn BrowserActions) -> String {
        if let Ok(text) = page.extract_text(&self.selectors.primary_container).await {
            if char_len(&text) > PRIMARY_MIN_CHARS {
                return text;
            }
        }

        let mut found = Vec::new();
        for selector in &self.selectors.transcript_containers {
            match page.extract_all_text(selector).await {
                Ok(texts) => found.extend(
                    texts
                        .iter()
                        .map(|t| t.trim())
                        .filter(|t| char_len(t) > CONTAINER_MIN_CHARS)
                        .map(str::to_string),
                ),
                Err(e) => tracing::debug!("[{}] {} unavailable: {}", Method::DirectText, selector, e),
            }
            if !found.is_empty() {
                break;
            }
        }
        found.join("\n\n")
    }
}

#[async_trait::async_trait]
impl Strategy for DirectText {
    fn method(&self) -> Method {
        Method::DirectText
    }

    async fn extract(&self, page: &dyn BrowserActions, _item: &Item) -> Result<Outcome> {
        let mut combined = self.container_text(page).await;

        if char_len(&combined) < FALLBACK_BELOW_CHARS {
            for selector in &self.selectors.main_content {
                if let Ok(text) = page.extract_text(selector).await {
                    combined = text;
                    if char_len(&combined) > MAIN_CONTENT_MIN_CHARS {
                        break;
                    }
                }
            }
        }

        let clean = clean_lines(&combined, &self.selectors.chrome_denylist);
        if char_len(&clean) > MIN_TRANSCRIPT_CHARS {
            Ok(Outcome::Found(Artifact::Text(clean)))
        } else {
            Ok(Outcome::Declined("insufficient text content"))
        }
    }
}
