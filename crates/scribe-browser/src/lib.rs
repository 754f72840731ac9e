//! Browser automation engine for the transcript service.
//!
//! Exposes the page capability as the [`BrowserActions`] trait, a Chromium
//! implementation driven over CDP, persisted login sessions, and ordered
//! selector probes for tolerating UI drift.

pub mod actions;
pub mod engine;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod fingerprint;
pub mod probe;
pub mod session;

pub use actions::{BrowserActions, Link, SessionFactory, Target};
pub use engine::{BrowserEngine, ChromiumFactory};
pub use error::{BrowserError, Result};
pub use session::SessionSnapshot;
