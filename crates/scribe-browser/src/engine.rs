use crate::actions::{extract_domain, BrowserActions, Link, SessionFactory, Target};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::session::{SessionSnapshot, StoredCookie};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use scribe_core::BrowserConfig;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Encode a string as a JavaScript string literal.
fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_opt(value: Option<&str>) -> String {
    value.map_or_else(|| "null".to_string(), js_str)
}

/// Script that finds the first visible element satisfying `target`, runs
/// `action` on it (`el` in scope) and yields whether one was found.
fn target_script(target: &Target, action: &str) -> String {
    format!(
        r"(() => {{
  const needle = {needle};
  const exclude = {exclude};
  for (const el of document.querySelectorAll({selector})) {{
    if (!(el.offsetWidth || el.offsetHeight || el.getClientRects().length)) continue;
    const text = el.innerText || el.textContent || '';
    if (needle !== null && !text.includes(needle)) continue;
    if (exclude !== null && text.includes(exclude)) continue;
    {action}
    return true;
  }}
  return false;
}})()",
        needle = js_opt(target.text.as_deref()),
        exclude = js_opt(target.exclude.as_deref()),
        selector = js_str(&target.selector),
    )
}

fn scroll_script(container_selector: &str) -> String {
    format!(
        r"(() => {{
  const container = document.querySelector({selector});
  if (container) {{
    container.scrollTop = container.scrollHeight;
    return true;
  }}
  window.scrollTo(0, document.body.scrollHeight);
  return false;
}})()",
        selector = js_str(container_selector),
    )
}

fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_str(selector))
}

fn links_script(selector: &str) -> String {
    format!(
        r"Array.from(document.querySelectorAll({selector})).map(a => ({{
  href: a.getAttribute('href') || '',
  text: (a.innerText || '').trim()
}}))",
        selector = js_str(selector),
    )
}

fn list_dir(dir: &Path) -> Result<HashSet<PathBuf>> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .collect())
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "crdownload" || ext == "tmp")
}

/// Browser automation engine
///
/// One Chromium process with one page. Every operation is bounded by a timeout.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
    operation_timeout: Duration,
    download_dir: PathBuf,
}

impl BrowserEngine {
    /// Launch Chromium with the given settings and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let fingerprint = FingerprintConfig::from_config(config);

        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                // Handle events if needed
                let _ = event;
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.set_user_agent(SetUserAgentOverrideParams::new(
            fingerprint.user_agent.clone(),
        ))
        .await?;

        let download_dir =
            std::env::temp_dir().join(format!("scribe-downloads-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&download_dir)?;
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_dir.display().to_string())
            .build()
            .map_err(BrowserError::ChromiumError)?;
        browser.execute(behavior).await?;

        tracing::debug!(
            "Browser launched (headless={}, ua={})",
            config.headless,
            fingerprint.user_agent
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            download_dir,
        })
    }

    async fn bounded<T, F>(&self, what: &str, limit: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| BrowserError::Timeout(format!("{what} exceeded {limit:?}")))?
    }

    async fn eval_value(&self, script: String) -> Result<serde_json::Value> {
        self.bounded("evaluate", self.operation_timeout, async {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| BrowserError::Script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        })
        .await
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(
            domain = %extract_domain(url).unwrap_or_default(),
            "Navigating to {}",
            url
        );
        self.bounded("navigate", self.navigation_timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        self.bounded("current_url", self.operation_timeout, async {
            Ok(self.page.url().await?.unwrap_or_default())
        })
        .await
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        self.bounded("fill_field", self.operation_timeout, async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
            element.click().await?.type_str(value).await?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "selector {selector} not present after {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        self.bounded("extract_text", self.operation_timeout, async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
            Ok(element.inner_text().await?.unwrap_or_default())
        })
        .await
    }

    async fn extract_all_text(&self, selector: &str) -> Result<Vec<String>> {
        self.bounded("extract_all_text", self.operation_timeout, async {
            let elements = self
                .page
                .find_elements(selector)
                .await
                .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
            let mut texts = Vec::with_capacity(elements.len());
            for element in elements {
                if let Some(text) = element.inner_text().await? {
                    texts.push(text);
                }
            }
            Ok(texts)
        })
        .await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let value = self.eval_value(count_script(selector)).await?;
        value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| BrowserError::Script(format!("non-numeric count: {value}")))
    }

    async fn links(&self, selector: &str) -> Result<Vec<Link>> {
        let value = self.eval_value(links_script(selector)).await?;
        serde_json::from_value(value).map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn is_visible(&self, target: &Target) -> Result<bool> {
        let value = self.eval_value(target_script(target, "")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click_target(&self, target: &Target) -> Result<bool> {
        let value = self.eval_value(target_script(target, "el.click();")).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_to_bottom(&self, container_selector: &str) -> Result<bool> {
        let value = self.eval_value(scroll_script(container_selector)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.eval_value(script.to_string()).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.bounded("screenshot", self.navigation_timeout, async {
            let params = ScreenshotParams::builder().full_page(true).build();
            Ok(self.page.screenshot(params).await?)
        })
        .await
    }

    async fn download(&self, target: &Target, timeout_ms: u64) -> Result<Vec<u8>> {
        let before = list_dir(&self.download_dir)?;
        if !self.click_target(target).await? {
            return Err(BrowserError::SelectorNotFound(target.to_string()));
        }

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let fresh = list_dir(&self.download_dir)?
                .into_iter()
                .find(|p| !before.contains(p) && !is_partial_download(p));
            if let Some(path) = fresh {
                let bytes = tokio::fs::read(&path).await?;
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::debug!("Could not remove staged download {}: {}", path.display(), e);
                }
                return Ok(bytes);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Download(format!(
                    "no file after {timeout_ms}ms clicking {target}"
                )));
            }
            tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
        }
    }

    async fn export_session(&self) -> Result<SessionSnapshot> {
        let cookies = self
            .bounded("get_cookies", self.operation_timeout, async {
                Ok(self.page.get_cookies().await?)
            })
            .await?;

        let stored = cookies
            .into_iter()
            .map(|c| StoredCookie {
                expires: (!c.session).then_some(c.expires),
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect();
        Ok(SessionSnapshot::new(stored))
    }

    async fn restore_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let params = snapshot
            .live_cookies(chrono::Utc::now())
            .map(|c| {
                CookieParam::builder()
                    .name(c.name.clone())
                    .value(c.value.clone())
                    .domain(c.domain.clone())
                    .path(c.path.clone())
                    .secure(c.secure)
                    .http_only(c.http_only)
                    .build()
                    .map_err(BrowserError::Session)
            })
            .collect::<Result<Vec<_>>>()?;

        let count = params.len();
        self.bounded("set_cookies", self.operation_timeout, async {
            self.page.set_cookies(params).await?;
            Ok(())
        })
        .await?;
        tracing::debug!("Restored {} session cookies", count);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        self.handler.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.download_dir) {
            tracing::debug!("Could not remove {}: {}", self.download_dir.display(), e);
        }
        closed?;
        Ok(())
    }
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    config: BrowserConfig,
}

impl ChromiumFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl SessionFactory for ChromiumFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserActions>> {
        Ok(Box::new(BrowserEngine::launch(&self.config).await?))
    }
}
