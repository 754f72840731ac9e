//! Scribe Core - Foundation crate for the Scribe transcript harvester.
//!
//! This crate provides shared types, error handling, configuration management,
//! and the filename sanitizer that all other Scribe crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`ItemId`, `Item`)
//! - [`sanitize`] - Filesystem-safe names from arbitrary titles
//!
//! # Example
//!
//! ```rust
//! use scribe_core::{sanitize_filename, AppConfig};
//!
//! let config = AppConfig::default();
//! let name = sanitize_filename("Weekly sync: Q3 / roadmap", config.download.filename_max_len);
//! assert_eq!(name, "Weekly_sync_Q3_roadmap");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, AuthConfig, BrowserConfig, CredentialsConfig, DiscoveryConfig, DownloadConfig,
    PathsConfig, SelectorConfig, ServiceConfig,
};
pub use error::{ConfigError, ConfigResult, ScribeError};
pub use sanitize::sanitize_filename;
pub use types::{Item, ItemId};
