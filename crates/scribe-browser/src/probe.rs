//! Ordered selector probes.
//!
//! Each logical UI action has several candidate selectors. Candidates are
//! tried in order and the first that matches wins; an absent element is
//! never an error.

use crate::actions::{BrowserActions, Target};

/// Build CSS targets from selector strings.
pub fn css_targets(selectors: &[String]) -> Vec<Target> {
    selectors.iter().map(Target::css).collect()
}

/// Click the first target that is present and visible.
///
/// Plain CSS targets are waited for up to `timeout_ms` each; text targets
/// are checked once. Returns the index of the clicked target.
pub async fn click_first(
    page: &dyn BrowserActions,
    targets: &[Target],
    timeout_ms: u64,
) -> Option<usize> {
    for (idx, target) in targets.iter().enumerate() {
        if target.text.is_none()
            && timeout_ms > 0
            && page
                .wait_for_selector(&target.selector, timeout_ms)
                .await
                .is_err()
        {
            continue;
        }

        match page.click_target(target).await {
            Ok(true) => {
                tracing::debug!("Clicked {}", target);
                return Some(idx);
            }
            Ok(false) => {}
            Err(e) => tracing::debug!("Probe {} failed: {}", target, e),
        }
    }
    None
}

/// The first selector that appears within `timeout_ms`.
pub async fn first_present<'a>(
    page: &dyn BrowserActions,
    selectors: &'a [String],
    timeout_ms: u64,
) -> Option<&'a str> {
    for selector in selectors {
        match page.wait_for_selector(selector, timeout_ms).await {
            Ok(()) => return Some(selector.as_str()),
            Err(e) => tracing::debug!("Probe {} failed: {}", selector, e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeDom, FakePage};

    fn page() -> FakePage {
        FakePage::with_dom(
            FakeDom::new()
                .element("button.second", "Continue")
                .element("li", "Re-export")
                .element("li", "Export"),
        )
    }

    #[tokio::test]
    async fn test_click_first_skips_absent_candidates() {
        let page = page();
        let targets = css_targets(&["button.first".to_string(), "button.second".to_string()]);
        assert_eq!(click_first(&page, &targets, 10).await, Some(1));
        assert_eq!(page.clicks(), vec!["button.second [Continue]".to_string()]);
    }

    #[tokio::test]
    async fn test_click_first_honors_exclusion() {
        let page = page();
        let targets = vec![Target::with_text("li", "Export").excluding("Re-export")];
        assert_eq!(click_first(&page, &targets, 10).await, Some(0));
        assert_eq!(page.clicks(), vec!["li [Export]".to_string()]);
    }

    #[tokio::test]
    async fn test_nothing_matches() {
        let page = page();
        let targets = css_targets(&["#missing".to_string()]);
        assert_eq!(click_first(&page, &targets, 10).await, None);
        assert!(page.clicks().is_empty());

        let selectors = vec!["#missing".to_string(), "li".to_string()];
        assert_eq!(first_present(&page, &selectors, 10).await, Some("li"));
    }
}
