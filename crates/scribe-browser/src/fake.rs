//! Scripted in-memory page.
//!
//! Stands in for Chromium in tests. A [`FakeSite`] maps URLs to [`FakeDom`]s;
//! queries match an element when its selector equals one of the
//! comma-separated parts of the query selector.

use crate::actions::{BrowserActions, Link, SessionFactory, Target};
use crate::error::{BrowserError, Result};
use crate::session::{SessionSnapshot, StoredCookie};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Minimal PNG signature used as screenshot payload.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

const SESSION_COOKIE: &str = "scribe_fake_session";

fn selector_matches(query: &str, selector: &str) -> bool {
    query.split(',').any(|part| part.trim() == selector)
}

#[derive(Debug, Clone)]
struct FakeElement {
    selector: String,
    text: String,
    visible: bool,
    navigates_to: Option<String>,
    authenticates: bool,
}

/// Lazy-loading listing: `initial + per_scroll * min(scrolls, grows_for)` links are visible.
#[derive(Debug, Clone, Copy)]
pub struct Feed {
    pub initial: usize,
    pub per_scroll: usize,
    pub grows_for: usize,
}

/// Content of one fake page.
#[derive(Debug, Clone)]
pub struct FakeDom {
    elements: Vec<FakeElement>,
    links: Vec<Link>,
    link_selector: String,
    feed: Option<Feed>,
    eval: serde_json::Value,
    screenshot: Option<Vec<u8>>,
    download: Option<Vec<u8>>,
    has_container: bool,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            links: Vec::new(),
            link_selector: r#"a[href*="/u/"]"#.to_string(),
            feed: None,
            eval: serde_json::Value::Null,
            screenshot: Some(PNG_BYTES.to_vec()),
            download: None,
            has_container: true,
        }
    }

    /// Add a visible element.
    #[must_use]
    pub fn element(mut self, selector: &str, text: &str) -> Self {
        self.elements.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            visible: true,
            navigates_to: None,
            authenticates: false,
        });
        self
    }

    /// Add an element that exists but is not rendered.
    #[must_use]
    pub fn hidden_element(mut self, selector: &str, text: &str) -> Self {
        self = self.element(selector, text);
        if let Some(last) = self.elements.last_mut() {
            last.visible = false;
        }
        self
    }

    /// Add a visible element whose click moves the page to `url`.
    /// When `authenticates` is set the click also completes login.
    #[must_use]
    pub fn link_button(mut self, selector: &str, text: &str, url: &str, authenticates: bool) -> Self {
        self = self.element(selector, text);
        if let Some(last) = self.elements.last_mut() {
            last.navigates_to = Some(url.to_string());
            last.authenticates = authenticates;
        }
        self
    }

    #[must_use]
    pub fn links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    #[must_use]
    pub fn link_selector(mut self, selector: &str) -> Self {
        self.link_selector = selector.to_string();
        self
    }

    #[must_use]
    pub fn feed(mut self, feed: Feed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Value returned by every script evaluation on this page.
    #[must_use]
    pub fn eval(mut self, value: serde_json::Value) -> Self {
        self.eval = value;
        self
    }

    #[must_use]
    pub fn screenshot_fails(mut self) -> Self {
        self.screenshot = None;
        self
    }

    #[must_use]
    pub fn download(mut self, bytes: &[u8]) -> Self {
        self.download = Some(bytes.to_vec());
        self
    }

    #[must_use]
    pub fn without_scroll_container(mut self) -> Self {
        self.has_container = false;
        self
    }

    fn visible_links(&self, scrolls: usize) -> &[Link] {
        let shown = match self.feed {
            Some(feed) => feed.initial + feed.per_scroll * scrolls.min(feed.grows_for),
            None => self.links.len(),
        };
        &self.links[..shown.min(self.links.len())]
    }
}

/// A set of pages plus login behavior, shared by every session launched from it.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakeDom>,
    signin_url: Option<String>,
    failing: HashMap<String, usize>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, url: &str, dom: FakeDom) -> Self {
        self.pages.insert(url.to_string(), dom);
        self
    }

    /// Unauthenticated navigations land on `url` instead of their target.
    #[must_use]
    pub fn require_login(mut self, url: &str) -> Self {
        self.signin_url = Some(url.to_string());
        self
    }

    /// The next `times` navigations to `url` fail.
    #[must_use]
    pub fn fail_navigation(mut self, url: &str, times: usize) -> Self {
        self.failing.insert(url.to_string(), times);
        self
    }
}

#[derive(Debug)]
struct PageState {
    site: FakeSite,
    url: String,
    dom: FakeDom,
    scrolls: usize,
    authenticated: bool,
    navigations: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    closed: bool,
}

/// In-memory implementation of [`BrowserActions`].
#[derive(Debug)]
pub struct FakePage {
    state: Mutex<PageState>,
    active: Option<Arc<AtomicUsize>>,
}

impl FakePage {
    pub fn new(site: FakeSite) -> Self {
        Self {
            state: Mutex::new(PageState {
                site,
                url: "about:blank".to_string(),
                dom: FakeDom::new(),
                scrolls: 0,
                authenticated: false,
                navigations: Vec::new(),
                clicks: Vec::new(),
                fills: Vec::new(),
                closed: false,
            }),
            active: None,
        }
    }

    /// A page already showing `dom`.
    pub fn with_dom(dom: FakeDom) -> Self {
        let page = Self::new(FakeSite::new());
        page.lock().dom = dom;
        page
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        // a poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Clicked elements as `selector [text]`.
    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.lock().scrolls
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn go(state: &mut PageState, url: &str) {
        state.url = url.to_string();
        state.dom = state.site.pages.get(url).cloned().unwrap_or_default();
        state.scrolls = 0;
    }
}

#[async_trait::async_trait]
impl BrowserActions for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.lock();
        state.navigations.push(url.to_string());

        if let Some(remaining) = state.site.failing.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::Timeout(format!("navigate {url}")));
            }
        }

        let destination = match &state.site.signin_url {
            Some(signin) if !state.authenticated => signin.clone(),
            _ => url.to_string(),
        };
        Self::go(&mut state, &destination);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.dom.elements.iter().any(|e| selector_matches(selector, &e.selector)) {
            return Err(BrowserError::SelectorNotFound(selector.to_string()));
        }
        state.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout_ms: u64) -> Result<()> {
        let state = self.lock();
        if state.dom.elements.iter().any(|e| selector_matches(selector, &e.selector)) {
            Ok(())
        } else {
            Err(BrowserError::Timeout(selector.to_string()))
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let state = self.lock();
        state
            .dom
            .elements
            .iter()
            .find(|e| selector_matches(selector, &e.selector))
            .map(|e| e.text.clone())
            .ok_or_else(|| BrowserError::SelectorNotFound(selector.to_string()))
    }

    async fn extract_all_text(&self, selector: &str) -> Result<Vec<String>> {
        let state = self.lock();
        Ok(state
            .dom
            .elements
            .iter()
            .filter(|e| selector_matches(selector, &e.selector))
            .map(|e| e.text.clone())
            .collect())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let state = self.lock();
        let elements = state
            .dom
            .elements
            .iter()
            .filter(|e| selector_matches(selector, &e.selector))
            .count();
        let links = if selector_matches(selector, &state.dom.link_selector) {
            state.dom.visible_links(state.scrolls).len()
        } else {
            0
        };
        Ok(elements + links)
    }

    async fn links(&self, selector: &str) -> Result<Vec<Link>> {
        let state = self.lock();
        if selector_matches(selector, &state.dom.link_selector) {
            Ok(state.dom.visible_links(state.scrolls).to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    async fn is_visible(&self, target: &Target) -> Result<bool> {
        let state = self.lock();
        Ok(state.dom.elements.iter().any(|e| {
            e.visible && selector_matches(&target.selector, &e.selector) && target.accepts_text(&e.text)
        }))
    }

    async fn click_target(&self, target: &Target) -> Result<bool> {
        let mut state = self.lock();
        let hit = state
            .dom
            .elements
            .iter()
            .find(|e| {
                e.visible
                    && selector_matches(&target.selector, &e.selector)
                    && target.accepts_text(&e.text)
            })
            .cloned();

        let Some(element) = hit else {
            return Ok(false);
        };
        state
            .clicks
            .push(format!("{} [{}]", element.selector, element.text));
        if element.authenticates {
            state.authenticated = true;
        }
        if let Some(url) = element.navigates_to {
            Self::go(&mut state, &url);
        }
        Ok(true)
    }

    async fn scroll_to_bottom(&self, _container_selector: &str) -> Result<bool> {
        let mut state = self.lock();
        state.scrolls += 1;
        Ok(state.dom.has_container)
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(self.lock().dom.eval.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.lock()
            .dom
            .screenshot
            .clone()
            .ok_or_else(|| BrowserError::ChromiumError("screenshot capture failed".to_string()))
    }

    async fn download(&self, target: &Target, _timeout_ms: u64) -> Result<Vec<u8>> {
        if !self.click_target(target).await? {
            return Err(BrowserError::SelectorNotFound(target.to_string()));
        }
        self.lock()
            .dom
            .download
            .clone()
            .ok_or_else(|| BrowserError::Download("no download triggered".to_string()))
    }

    async fn export_session(&self) -> Result<SessionSnapshot> {
        let state = self.lock();
        let cookies = if state.authenticated {
            vec![StoredCookie {
                name: SESSION_COOKIE.to_string(),
                value: "1".to_string(),
                domain: "fake.test".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: true,
                expires: None,
            }]
        } else {
            Vec::new()
        };
        Ok(SessionSnapshot::new(cookies))
    }

    async fn restore_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut state = self.lock();
        if snapshot
            .live_cookies(chrono::Utc::now())
            .any(|c| c.name == SESSION_COOKIE)
        {
            state.authenticated = true;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            if let Some(active) = &self.active {
                active.fetch_sub(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// Launches [`FakePage`]s over one site and tracks concurrency.
#[derive(Debug, Default)]
pub struct FakeFactory {
    site: FakeSite,
    launched: AtomicUsize,
    active: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl FakeFactory {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            ..Self::default()
        }
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Sessions launched but not closed.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open sessions.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionFactory for FakeFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserActions>> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let mut page = FakePage::new(self.site.clone());
        page.active = Some(Arc::clone(&self.active));
        Ok(Box::new(page))
    }
}
