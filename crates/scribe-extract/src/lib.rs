//! Transcript extraction.
//!
//! A loaded item page is handed to an ordered chain of strategies; the first
//! one that produces content wins. Every strategy invocation leaves exactly
//! one attempt record in the ledger.

pub mod artifact;
pub mod chain;
pub mod error;
pub mod strategies;
pub mod strategy;

pub use artifact::ArtifactWriter;
pub use chain::{ExtractionChain, Harvest};
pub use error::{ExtractError, Result};
pub use strategy::{Artifact, Method, Outcome, Strategy};
