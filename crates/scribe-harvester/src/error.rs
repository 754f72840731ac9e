use scribe_browser::BrowserError;
use scribe_extract::ExtractError;
use scribe_ledger::LedgerError;
use thiserror::Error;

/// Harvest errors
///
/// The first three variants are session-level and abort a run; per-item
/// failures never surface here.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Listing page unreachable: {0}")]
    ListingUnreachable(String),

    #[error("No items discovered on the listing page")]
    NoItemsDiscovered,

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
