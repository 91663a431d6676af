//! Entry types returned by history queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::storage::Row;

/// Columns selected for a [`JournalEntry`].
pub(crate) const JOURNAL_COLUMNS: &str = "id, client, recorded_at, record_type, narrative";

/// Columns selected for a [`LedgerEntry`].
pub(crate) const LEDGER_COLUMNS: &str = "id, client, recorded_at, record_type, amount, narrative";

/// One narrative record from a plain journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub client: String,
    pub recorded_at: DateTime<Utc>,
    pub record_type: String,
    pub narrative: String,
}

/// One individual movement from the full ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub client: String,
    pub recorded_at: DateTime<Utc>,
    pub record_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub narrative: String,
}

impl TryFrom<Row> for JournalEntry {
    type Error = JournalError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(JournalEntry {
            id: row.integer("id")?,
            client: row.text("client")?,
            recorded_at: row.timestamp("recorded_at")?,
            record_type: row.text("record_type")?,
            narrative: row.text("narrative")?,
        })
    }
}

impl TryFrom<Row> for LedgerEntry {
    type Error = JournalError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.integer("id")?,
            client: row.text("client")?,
            recorded_at: row.timestamp("recorded_at")?,
            record_type: row.text("record_type")?,
            amount: row.decimal("amount")?,
            narrative: row.text("narrative")?,
        })
    }
}
