use scribe_browser::BrowserError;
use scribe_ledger::LedgerError;
use thiserror::Error;

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("malformed client state: {0}")]
    State(#[from] serde_json::Error),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
