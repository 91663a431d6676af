//! # Journal Core
//!
//! Append-only journals over a caller-supplied SQL database.
//!
//! ## Architecture
//!
//! - **storage**: the `Database` contract, value/result types, transactions,
//!   and the bundled SQLite implementation
//! - **journal**: `PlainJournal` (narratives) and `QuantifiableJournal`
//!   (amounts, compact + full tables, consolidation, balance routing)
//! - **record_types**: the closed vocabulary a journal accepts
//! - **amount**: fixed-point amount rules
//! - **config**: TOML-loadable journal and storage settings
//! - **clock**: injectable time source
//!
//! ## Example
//!
//! ```no_run
//! use journal_core::{QuantifiableJournal, RecordTypeSet, SqliteDatabase};
//! use rust_decimal::Decimal;
//!
//! # fn main() -> journal_core::Result<()> {
//! let db = SqliteDatabase::open_in_memory()?;
//! let types = RecordTypeSet::new(["available", "reserved"])?;
//! let wallet = QuantifiableJournal::open(&db, "wallet", types)?;
//!
//! wallet.record("alice", "available", Decimal::from(5), Some("deposit"))?;
//! wallet.transfer_balance("alice", "available", "reserved", Decimal::from(2), None)?;
//! assert_eq!(wallet.compound_balance("alice", "reserved", None, None)?, Decimal::from(2));
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod record_types;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{JournalConfig, RetryPolicy, StorageConfig};
pub use error::{JournalError, Result};
pub use journal::{
    BalanceSource, ConsolidationReport, JournalEntry, LedgerEntry, PlainJournal,
    QuantifiableJournal, RecordFilter,
};
pub use record_types::RecordTypeSet;
pub use storage::{Database, SqliteDatabase};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
