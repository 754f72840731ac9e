//! Harvest orchestration.
//!
//! Establishes an authenticated session, discovers items on the listing
//! page, and drives the extraction chain over every pending item, either one
//! at a time in a single browser or across a pool of independent sessions.

pub mod discovery;
pub mod error;
pub mod login;
pub mod orchestrator;
pub mod parallel;
pub mod popups;

pub use discovery::{discover, parse_items, scroll_to_load_all, ScrollReport};
pub use error::{HarvestError, Result};
pub use login::{login, Credentials};
pub use orchestrator::{reset_state, Harvester, RunOptions, RunSummary};
