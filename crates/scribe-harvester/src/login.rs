//! Sign-in flow.
//!
//! The service's sign-in page changes shape often, so every step probes an
//! ordered list of candidates and moves on when a step's element is absent.
//! Success is judged from the final URL: an authenticated marker means
//! success, and an ambiguous URL counts as success unless it still carries a
//! sign-in marker. That heuristic can report false positives; a session that
//! is not really authenticated is caught afterwards when the listing page
//! redirects back to sign-in.

use crate::error::Result;
use scribe_browser::probe::{click_first, css_targets, first_present};
use scribe_browser::{BrowserActions, Target};
use scribe_core::{AppConfig, CredentialsConfig};
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

/// Account credentials. The password is wiped from memory on drop.
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Credentials from config, if both parts are present.
    pub fn from_config(config: &CredentialsConfig) -> Option<Self> {
        match &config.password {
            Some(password) if !config.email.is_empty() && !password.is_empty() => {
                Some(Self::new(config.email.clone(), password.clone()))
            }
            _ => None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CSS candidates followed by text-matched buttons.
fn targets(selectors: &[String], button_labels: &[&str]) -> Vec<Target> {
    let mut targets = css_targets(selectors);
    targets.extend(
        button_labels
            .iter()
            .map(|label| Target::with_text("button", *label)),
    );
    targets
}

/// Run the sign-in flow. Returns whether the session looks authenticated.
///
/// Absent UI elements are not errors; only a navigation failure is.
pub async fn login(
    page: &dyn BrowserActions,
    config: &AppConfig,
    credentials: &Credentials,
) -> Result<bool> {
    let auth = &config.auth;
    let selectors = &config.selectors;
    tracing::info!("Starting login...");

    page.navigate(&config.service.login_url).await?;
    tokio::time::sleep(Duration::from_millis(auth.page_settle_ms)).await;

    let url = page.current_url().await?;
    if auth.is_authenticated_url(&url) {
        tracing::info!("Already logged in");
        return Ok(true);
    }

    if click_first(page, &[Target::css(selectors.cookie_accept.as_str())], auth.step_timeout_ms)
        .await
        .is_some()
    {
        tracing::debug!("Accepted cookie banner");
    }

    let alternate = targets(&selectors.alternate_signin, &["Other ways to log in"]);
    if click_first(page, &alternate, auth.step_timeout_ms).await.is_some() {
        tracing::debug!("Switched to email sign-in");
    }

    let Some(email_input) = first_present(page, &selectors.email_input, auth.input_timeout_ms).await
    else {
        tracing::error!("Could not find email input field");
        return Ok(false);
    };
    tracing::info!("Entering email: {}", credentials.email());
    page.fill_field(email_input, credentials.email()).await?;

    let email_submit = targets(&selectors.email_submit, &["Sign in"]);
    click_first(page, &email_submit, auth.step_timeout_ms).await;

    let Some(password_input) =
        first_present(page, &selectors.password_input, auth.input_timeout_ms).await
    else {
        tracing::error!("Could not find password input field");
        return Ok(false);
    };
    page.fill_field(password_input, &credentials.password).await?;

    let password_submit = targets(&selectors.password_submit, &["Next", "Log in"]);
    click_first(page, &password_submit, auth.step_timeout_ms).await;

    tracing::info!("Waiting for login to complete...");
    tokio::time::sleep(Duration::from_millis(auth.completion_wait_ms)).await;

    let url = page.current_url().await?;
    if auth.is_authenticated_url(&url) {
        tracing::info!("Login successful");
        return Ok(true);
    }

    if let Ok(message) = page.extract_text(&selectors.login_error).await {
        tracing::error!("Login failed: {}", message.trim());
        return Ok(false);
    }

    tracing::warn!("Login status unclear, current URL: {}", url);
    Ok(!auth.is_signin_url(&url))
}
