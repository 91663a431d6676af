//! Append-only narrative journal.

use std::sync::Arc;

use tracing::debug;

use super::row::{JournalEntry, JOURNAL_COLUMNS};
use super::{compact_table, index_statements, select_history, RecordFilter};
use crate::clock::{Clock, SystemClock};
use crate::config::{validate_journal_name, JournalConfig};
use crate::error::Result;
use crate::record_types::RecordTypeSet;
use crate::storage::{Database, SqlValue};

/// Per-client narrative log with no amounts and no compaction.
///
/// Rows live in `<name>log`; the journal never updates or deletes them.
pub struct PlainJournal<'db, D: Database + ?Sized> {
    db: &'db D,
    table: String,
    record_types: RecordTypeSet,
    clock: Arc<dyn Clock>,
}

impl<'db, D: Database + ?Sized> PlainJournal<'db, D> {
    /// Open the journal `name`, creating its table if needed.
    pub fn open(db: &'db D, name: &str, record_types: RecordTypeSet) -> Result<Self> {
        Self::open_parts(db, name, record_types, Arc::new(SystemClock))
    }

    pub fn open_with(db: &'db D, config: &JournalConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Self::open_parts(db, &config.name, config.record_type_set()?, clock)
    }

    fn open_parts(
        db: &'db D,
        name: &str,
        record_types: RecordTypeSet,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        validate_journal_name(name)?;
        let table = compact_table(name);

        db.execute_until_successful(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                record_type TEXT NOT NULL CHECK ({check}),
                narrative TEXT NOT NULL
            )
            "#,
            table = table,
            check = record_types.check_constraint("record_type", db),
        ))?;
        for statement in index_statements(&table) {
            db.execute_until_successful(&statement)?;
        }
        debug!(table = %table, "plain journal ready");

        Ok(Self {
            db,
            table,
            record_types,
            clock,
        })
    }

    pub fn record_types(&self) -> &RecordTypeSet {
        &self.record_types
    }

    /// Append one narrative entry stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::InvalidRecordType` if the type is not in the
    /// journal's vocabulary; nothing is written in that case.
    pub fn record(&self, client: &str, record_type: &str, narrative: &str) -> Result<()> {
        self.record_types.ensure(record_type)?;

        let db = self.db;
        db.execute(&format!(
            "INSERT INTO {} (client, recorded_at, record_type, narrative) VALUES ({}, {}, {}, {})",
            self.table,
            db.quote_literal(&SqlValue::from(client)),
            db.quote_literal(&SqlValue::from(self.clock.now_micros())),
            db.quote_literal(&SqlValue::from(record_type)),
            db.quote_literal(&SqlValue::from(narrative)),
        ))?;
        Ok(())
    }

    /// Entries for `client` inside the filter's window, in insertion order.
    ///
    /// # Errors
    ///
    /// - `JournalError::InvalidRecordType` if the filter names an unknown type
    /// - `JournalError::NoRecordsSelected` if nothing matched
    pub fn records(&self, client: &str, filter: &RecordFilter) -> Result<Vec<JournalEntry>> {
        if let Some(ref record_type) = filter.record_type {
            self.record_types.ensure(record_type)?;
        }

        select_history(
            self.db,
            &self.table,
            JOURNAL_COLUMNS,
            client,
            filter,
            self.clock.now_micros(),
        )?
        .map(JournalEntry::try_from)
        .collect()
    }
}
