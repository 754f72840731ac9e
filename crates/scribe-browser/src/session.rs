//! Persisted login sessions.
//!
//! A snapshot is the cookie jar captured right after a successful login.
//! Later runs install it before opening the listing so login can be skipped.

use crate::error::{BrowserError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One cookie, in the subset of fields needed to re-install it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Expiry as seconds since the epoch; `None` for session cookies
    #[serde(default)]
    pub expires: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl StoredCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let now = now.timestamp() as f64;
        self.expires.is_some_and(|exp| exp > 0.0 && exp <= now)
    }
}

/// Opaque serialized browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

impl SessionSnapshot {
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self {
            created_at: Utc::now(),
            cookies,
        }
    }

    /// Cookies that have not expired yet.
    pub fn live_cookies(&self, now: DateTime<Utc>) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.iter().filter(move |c| !c.is_expired(now))
    }

    /// Read a snapshot; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&contents)
            .map_err(|e| BrowserError::Session(format!("{}: {e}", path.display())))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| BrowserError::Session(e.to_string()))?;
        std::fs::write(path, contents)?;
        tracing::info!("Session saved to {}", path.display());
        Ok(())
    }
}
