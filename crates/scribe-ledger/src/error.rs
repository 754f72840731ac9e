use scribe_core::ItemId;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("item {0} is not registered in the ledger")]
    UnknownItem(ItemId),

    #[error("failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
