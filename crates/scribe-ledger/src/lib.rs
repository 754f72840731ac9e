//! Persistent job ledger.
//!
//! The ledger is the single source of truth for what has been discovered,
//! attempted, and harvested. Every mutation is written through to disk so a
//! crash loses at most the item in flight.

pub mod error;
pub mod ledger;
pub mod shared;

pub use error::{LedgerError, Result};
pub use ledger::{AttemptRecord, EntryStatus, Ledger, LedgerEntry, LedgerStats, RunRecord};
pub use shared::SharedLedger;
