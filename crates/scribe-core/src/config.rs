//! Configuration management for Scribe.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every section defaults independently,
//! so a partial file only needs the values it changes.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/scribe/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target service endpoints
    pub service: ServiceConfig,
    /// Login identity (the secret is never written to disk)
    pub credentials: CredentialsConfig,
    /// Durable state and output locations
    pub paths: PathsConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Listing-page enumeration settings
    pub discovery: DiscoveryConfig,
    /// Per-item download and retry settings
    pub download: DownloadConfig,
    /// DOM selector candidates, in priority order
    pub selectors: SelectorConfig,
    /// Login detection heuristics and timings
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. A missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of `self`.
    ///
    /// Supports the following environment variables:
    /// - `SCRIBE_EMAIL`: login identifier
    /// - `SCRIBE_PASSWORD`: login secret
    /// - `SCRIBE_HEADLESS`: browser headless mode (true/false)
    /// - `SCRIBE_OUTPUT_DIR`: artifact output directory
    /// - `SCRIBE_WORKERS`: parallel worker count
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Ok(val) = std::env::var("SCRIBE_EMAIL") {
            self.credentials.email = val;
            tracing::debug!("Override credentials.email from env");
        }

        if let Ok(val) = std::env::var("SCRIBE_PASSWORD") {
            self.credentials.password = Some(val);
        }

        if let Ok(val) = std::env::var("SCRIBE_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("SCRIBE_OUTPUT_DIR") {
            tracing::debug!("Override paths.output_dir from env: {}", val);
            self.paths.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("SCRIBE_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.download.workers = workers;
                tracing::debug!("Override download.workers from env: {}", workers);
            }
        }

        self
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.download.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.download.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "download.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.discovery.stability_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "discovery.stability_window".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if url::Url::parse(&self.service.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "service.base_url".to_string(),
                reason: format!("not an absolute URL: {}", self.service.base_url),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/scribe/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "scribe", "scribe").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Target service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Origin used to build canonical item URLs
    pub base_url: String,
    /// Sign-in entry point
    pub login_url: String,
    /// The single listing page that is enumerated
    pub listing_url: String,
    /// Path prefix that precedes an item id in item links
    pub item_path_prefix: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://otter.ai".to_string(),
            login_url: "https://otter.ai/signin".to_string(),
            listing_url: "https://otter.ai/my-notes".to_string(),
            item_path_prefix: "/u/".to_string(),
        }
    }
}

/// Login identity.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Account identifier (email)
    pub email: String,
    /// Account secret, only ever supplied through the environment
    #[serde(skip)]
    pub password: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Durable state and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory receiving one artifact per processed item
    pub output_dir: PathBuf,
    /// Ledger file (JSON)
    pub state_file: PathBuf,
    /// Browser session snapshot (JSON)
    pub session_file: PathBuf,
    /// Auxiliary progress file, only touched by reset
    pub progress_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            state_file: PathBuf::from(".scribe_state.json"),
            session_file: PathBuf::from(".scribe_session.json"),
            progress_file: PathBuf::from(".download_progress.json"),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Fixed user agent; a randomized desktop agent is used when unset
    pub user_agent: Option<String>,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Timeout for every other page operation in milliseconds
    pub operation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            navigation_timeout_secs: 60,
            operation_timeout_ms: 15_000,
        }
    }
}

/// Listing-page enumeration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scroll iteration cap for a full run
    pub max_scrolls: u32,
    /// Scroll iteration cap in quick mode
    pub quick_max_scrolls: u32,
    /// Items kept in quick mode
    pub quick_item_limit: usize,
    /// Consecutive unchanged counts that end scrolling
    pub stability_window: u32,
    /// Wait after each scroll in milliseconds
    pub scroll_wait_ms: u64,
    /// Item ids shorter than this are not items
    pub min_id_len: usize,
    /// Titles are truncated to this many characters
    pub max_title_len: usize,
    /// Scrollable container holding the listing
    pub container_selector: String,
    /// Elements counted to detect listing growth
    pub count_selector: String,
    /// Anchors that link to items
    pub anchor_selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_scrolls: 500,
            quick_max_scrolls: 2,
            quick_item_limit: 15,
            stability_window: 15,
            scroll_wait_ms: 3000,
            min_id_len: 10,
            max_title_len: 100,
            container_selector: ".otter-main-content__container".to_string(),
            count_selector: r#"app-home-speech-card, a[href*="/u/"]"#.to_string(),
            anchor_selector: r#"a[href*="/u/"]"#.to_string(),
        }
    }
}

/// Per-item download and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Full attempts per item in sequential mode
    pub max_attempts: u32,
    /// Backoff before retry `n` (0-based) is `2^n * backoff_base_ms`
    pub backoff_base_ms: u64,
    /// Wait after navigating to an item in sequential mode
    pub settle_ms: u64,
    /// Wait after navigating to an item in parallel mode
    pub parallel_settle_ms: u64,
    /// Pause between strategies that declined
    pub strategy_gap_ms: u64,
    /// Pause between successive items in sequential mode
    pub delay_between_items_ms: u64,
    /// Enable the UI export-button strategy (slow, fragile)
    pub export_button_enabled: bool,
    /// How long to wait for the export download
    pub export_timeout_ms: u64,
    /// Worker count for the parallel orchestrator
    pub workers: usize,
    /// Upper bound for sanitized file stems
    pub filename_max_len: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 2000,
            settle_ms: 1500,
            parallel_settle_ms: 2000,
            strategy_gap_ms: 500,
            delay_between_items_ms: 500,
            export_button_enabled: false,
            export_timeout_ms: 60_000,
            workers: 4,
            filename_max_len: 80,
        }
    }
}

impl DownloadConfig {
    /// Backoff to wait after the zero-based attempt `attempt` failed.
    #[must_use]
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        2u64.saturating_pow(attempt)
            .saturating_mul(self.backoff_base_ms)
    }
}

/// DOM selector candidates for an uncontrolled, versioned UI.
///
/// Each list is tried in order until one candidate matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Single container expected to hold the whole transcript
    pub primary_container: String,
    /// Containers whose texts are concatenated when the primary one is short
    pub transcript_containers: Vec<String>,
    /// Generic main-content fallbacks
    pub main_content: Vec<String>,
    /// Lines containing any of these (case-insensitive) are UI chrome
    pub chrome_denylist: Vec<String>,
    /// Buttons that open the per-item overflow menu
    pub overflow_menu: Vec<String>,
    /// Icon ligatures identifying an overflow button
    pub overflow_icons: Vec<String>,
    /// Menu entries that may carry the export label
    pub export_menu_items: Vec<String>,
    /// Dialog buttons that confirm an export
    pub export_confirm: Vec<String>,
    /// Close buttons of transient popups
    pub popup_close: Vec<String>,
    /// Labelled buttons that dismiss transient popups
    pub popup_close_labels: Vec<String>,
    /// Cookie consent button on the sign-in page
    pub cookie_accept: String,
    /// Buttons switching to the identifier/secret sign-in method
    pub alternate_signin: Vec<String>,
    /// Identifier inputs
    pub email_input: Vec<String>,
    /// Buttons submitting the identifier
    pub email_submit: Vec<String>,
    /// Secret inputs
    pub password_input: Vec<String>,
    /// Buttons submitting the secret
    pub password_submit: Vec<String>,
    /// Elements that carry a login error message
    pub login_error: String,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            primary_container: r#".otter-transcript-container, main, [role="main"]"#.to_string(),
            transcript_containers: strings(&[
                ".otter-transcript-container",
                r#"[class*="transcript"]"#,
                r#"[class*="speech"]"#,
                ".monologue",
                ".paragraph",
            ]),
            main_content: strings(&["main", r#"[role="main"]"#, "#root", ".app-content"]),
            chrome_denylist: strings(&["sign out", "settings", "help", "export", "share"]),
            overflow_menu: strings(&[
                r#"button[aria-label*="more" i]"#,
                r#"button[aria-label*="options" i]"#,
                "button.head-bar__menu-button",
                r#"[data-testid="more-options"]"#,
            ]),
            overflow_icons: strings(&["more_horiz", "more_vert"]),
            export_menu_items: strings(&[r#"[role="menuitem"]"#, "li", "span", "button"]),
            export_confirm: strings(&[
                "button.bg-primary",
                r#"button[class*="primary"]"#,
                r#"div[role="dialog"] button"#,
                "button:not([disabled])",
            ]),
            popup_close: strings(&[
                r#"button[aria-label="Close"]"#,
                ".close-button",
                r#"[data-testid="close-button"]"#,
            ]),
            popup_close_labels: strings(&["Got it", "\u{00d7}", "Dismiss", "Later"]),
            cookie_accept: "button.accept-cookies-button".to_string(),
            alternate_signin: strings(&["button.other-sign-in-button", r#"[class*="other-sign-in"]"#]),
            email_input: strings(&[
                "#otter-email-input",
                r#"input[type="email"]"#,
                r#"input[name="email"]"#,
            ]),
            email_submit: strings(&["#otter-sign-in", r#"button[type="submit"]"#]),
            password_input: strings(&["#otter-password", r#"input[type="password"]"#]),
            password_submit: strings(&["#otter-password-next", r#"button[type="submit"]"#]),
            login_error: r#"[class*="error"], [class*="alert"], [role="alert"]"#.to_string(),
        }
    }
}

/// Login detection heuristics and timings.
///
/// Authentication state is inferred from URL substrings only. This is a
/// known weak point: an unexpected redirect target without a sign-in marker
/// is read as "logged in".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// URL substrings meaning "not authenticated"
    pub signin_markers: Vec<String>,
    /// URL substrings meaning "authenticated"
    pub authenticated_markers: Vec<String>,
    /// Wait after opening the sign-in page
    pub page_settle_ms: u64,
    /// Per-step probe timeout for optional UI elements
    pub step_timeout_ms: u64,
    /// Probe timeout for the identifier and secret inputs
    pub input_timeout_ms: u64,
    /// Wait after the final submit before judging the URL
    pub completion_wait_ms: u64,
    /// Wait on the listing page after login or navigation
    pub listing_settle_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signin_markers: strings(&["signin", "login", "sign-in"]),
            authenticated_markers: strings(&["home", "workspace", "conversations"]),
            page_settle_ms: 3000,
            step_timeout_ms: 3000,
            input_timeout_ms: 5000,
            completion_wait_ms: 8000,
            listing_settle_ms: 3000,
        }
    }
}

impl AuthConfig {
    /// True when the URL still points at a sign-in page.
    #[must_use]
    pub fn is_signin_url(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.signin_markers.iter().any(|m| url.contains(m.as_str()))
    }

    /// True when the URL points into an authenticated area.
    #[must_use]
    pub fn is_authenticated_url(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.authenticated_markers
            .iter()
            .any(|m| url.contains(m.as_str()))
    }
}
