use scribe_browser::probe::{click_first, css_targets};
use scribe_browser::{BrowserActions, Target};
use scribe_core::SelectorConfig;

/// Dismiss at most one transient popup. Returns whether one was closed.
pub async fn close_popup(page: &dyn BrowserActions, selectors: &SelectorConfig) -> bool {
    let mut targets = css_targets(&selectors.popup_close);
    targets.extend(
        selectors
            .popup_close_labels
            .iter()
            .map(|label| Target::with_text("button", label.as_str())),
    );
    click_first(page, &targets, 0).await.is_some()
}
