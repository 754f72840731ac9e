use crate::error::{BrowserError, Result};
use crate::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// An element to act on: a CSS selector, optionally narrowed by its visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub selector: String,
    /// Visible text must contain this
    pub text: Option<String>,
    /// Visible text must not contain this
    pub exclude: Option<String>,
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
            exclude: None,
        }
    }

    pub fn with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: Some(text.into()),
            exclude: None,
        }
    }

    #[must_use]
    pub fn excluding(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = Some(exclude.into());
        self
    }

    /// Whether an element with `text` satisfies the text constraints.
    pub fn accepts_text(&self, text: &str) -> bool {
        self.text.as_deref().map_or(true, |needle| text.contains(needle))
            && self.exclude.as_deref().map_or(true, |ex| !text.contains(ex))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(text) = &self.text {
            write!(f, " [text~={text:?}]")?;
        }
        if let Some(ex) = &self.exclude {
            write!(f, " [text!~={ex:?}]")?;
        }
        Ok(())
    }
}

/// An anchor as seen on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// Browser actions for automation
///
/// Absent elements surface as [`BrowserError::SelectorNotFound`]; slow ones
/// as [`BrowserError::Timeout`]. Neither is fatal to a run.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL the page currently shows, after redirects
    async fn current_url(&self) -> Result<String>;

    /// Fill a form field by selector
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Extract text from the first matching element
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Extract text from every matching element, in document order
    async fn extract_all_text(&self, selector: &str) -> Result<Vec<String>>;

    /// Number of elements matching a selector
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Anchors matching a selector, in document order
    async fn links(&self, selector: &str) -> Result<Vec<Link>>;

    /// Whether a visible element satisfies the target
    async fn is_visible(&self, target: &Target) -> Result<bool>;

    /// Click the first visible element satisfying the target; `false` if none
    async fn click_target(&self, target: &Target) -> Result<bool>;

    /// Scroll a container to its bottom, or the whole page when it is absent.
    /// Returns whether the container was found.
    async fn scroll_to_bottom(&self, container_selector: &str) -> Result<bool>;

    /// Evaluate a script expression and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Take a full-page screenshot (PNG)
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Click the target and capture the file download it triggers
    async fn download(&self, target: &Target, timeout_ms: u64) -> Result<Vec<u8>>;

    /// Capture cookies of the current session
    async fn export_session(&self) -> Result<SessionSnapshot>;

    /// Install cookies from a previous session
    async fn restore_session(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Release the browser
    async fn close(&self) -> Result<()>;
}

/// Launches independent browser sessions.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserActions>>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
