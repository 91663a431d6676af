//! Amount-bearing journal with a compact and a full table.
//!
//! Every movement is written twice in one transaction: to `<name>log`,
//! which is periodically consolidated, and to `<name>fulllog`, which keeps
//! every row forever. Balances read whichever table can answer the
//! requested window (see [`routing`](super::routing)); history always reads
//! the full table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::consolidation::{self, ConsolidationReport};
use super::routing::{self, BalanceSource};
use super::row::{LedgerEntry, LEDGER_COLUMNS};
use super::{compact_table, full_table, index_statements, select_history, Conditions, RecordFilter};
use crate::amount::{checked_add, checked_sum, ensure_representable};
use crate::clock::{Clock, SystemClock};
use crate::config::{validate_journal_name, JournalConfig, DEFAULT_RETENTION_MONTHS};
use crate::error::{JournalError, Result};
use crate::record_types::RecordTypeSet;
use crate::storage::{Database, SqlValue, Transaction};

/// Ledger of signed amounts per client and record type.
pub struct QuantifiableJournal<'db, D: Database + ?Sized> {
    db: &'db D,
    compact: String,
    full: String,
    record_types: RecordTypeSet,
    retention_months: u32,
    clock: Arc<dyn Clock>,
}

/// Which amounts a balance query adds up.
#[derive(Debug, Clone, Copy)]
enum Sign {
    Credits,
    Debits,
    All,
}

impl Sign {
    fn keeps(self, amount: &Decimal) -> bool {
        match self {
            Sign::Credits => *amount > Decimal::ZERO,
            Sign::Debits => *amount < Decimal::ZERO,
            Sign::All => true,
        }
    }
}

impl<'db, D: Database + ?Sized> QuantifiableJournal<'db, D> {
    /// Open the journal `name` with the default retention and wall-clock
    /// time, then run one consolidation pass.
    pub fn open(db: &'db D, name: &str, record_types: RecordTypeSet) -> Result<Self> {
        Self::open_parts(
            db,
            name,
            record_types,
            DEFAULT_RETENTION_MONTHS,
            Arc::new(SystemClock),
        )
    }

    pub fn open_with(db: &'db D, config: &JournalConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Self::open_parts(
            db,
            &config.name,
            config.record_type_set()?,
            config.retention_months,
            clock,
        )
    }

    fn open_parts(
        db: &'db D,
        name: &str,
        record_types: RecordTypeSet,
        retention_months: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        validate_journal_name(name)?;
        let journal = Self {
            db,
            compact: compact_table(name),
            full: full_table(name),
            record_types,
            retention_months,
            clock,
        };
        journal.provision()?;
        journal.consolidate()?;
        Ok(journal)
    }

    fn provision(&self) -> Result<()> {
        let check = self.record_types.check_constraint("record_type", self.db);

        self.db.execute_until_successful(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                record_type TEXT NOT NULL CHECK ({check}),
                amount TEXT NOT NULL,
                narrative TEXT NOT NULL,
                opening_balance INTEGER NOT NULL DEFAULT 0
            )
            "#,
            table = self.compact,
            check = check,
        ))?;
        self.db.execute_until_successful(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                record_type TEXT NOT NULL CHECK ({check}),
                amount TEXT NOT NULL,
                narrative TEXT NOT NULL
            )
            "#,
            table = self.full,
            check = check,
        ))?;

        for statement in index_statements(&self.compact)
            .into_iter()
            .chain(index_statements(&self.full))
        {
            self.db.execute_until_successful(&statement)?;
        }
        debug!(compact = %self.compact, full = %self.full, "ledger tables ready");
        Ok(())
    }

    pub fn record_types(&self) -> &RecordTypeSet {
        &self.record_types
    }

    /// Fold compact-table detail older than the retention window into
    /// opening-balance rows.
    pub fn consolidate(&self) -> Result<ConsolidationReport> {
        consolidation::consolidate(
            self.db,
            &self.compact,
            self.clock.now_micros(),
            self.retention_months,
        )
    }

    /// Append one movement to both tables.
    ///
    /// Zero amounts are accepted. A missing narrative is stored as "".
    pub fn record(
        &self,
        client: &str,
        record_type: &str,
        amount: Decimal,
        narrative: Option<&str>,
    ) -> Result<()> {
        self.record_types.ensure(record_type)?;
        let amount = ensure_representable(amount)?;
        let narrative = narrative.unwrap_or("");
        let now = self.clock.now_micros();

        let tx = Transaction::begin(self.db)?;
        self.insert_pair(client, now, record_type, amount, narrative)?;
        tx.commit()
    }

    /// Move `amount` from one record type to another for the same client.
    ///
    /// # Errors
    ///
    /// - `JournalError::InvalidRecordType` if either type is unknown
    /// - `JournalError::UselessOperation` for a zero amount or identical types
    pub fn transfer_balance(
        &self,
        client: &str,
        source: &str,
        destination: &str,
        amount: Decimal,
        narrative: Option<&str>,
    ) -> Result<()> {
        self.record_types.ensure(source)?;
        self.record_types.ensure(destination)?;
        if amount.is_zero() {
            return Err(JournalError::UselessOperation(
                "transfer of a zero amount".to_string(),
            ));
        }
        if source == destination {
            return Err(JournalError::UselessOperation(format!(
                "transfer from {} to itself",
                source
            )));
        }
        let amount = ensure_representable(amount)?;
        let narrative = narrative.unwrap_or("");
        let now = self.clock.now_micros();

        let tx = Transaction::begin(self.db)?;
        self.insert_pair(client, now, source, -amount, narrative)?;
        self.insert_pair(client, now, destination, amount, narrative)?;
        tx.commit()?;

        debug!(client, source, destination, %amount, "transferred balance");
        Ok(())
    }

    fn insert_pair(
        &self,
        client: &str,
        recorded_at: DateTime<Utc>,
        record_type: &str,
        amount: Decimal,
        narrative: &str,
    ) -> Result<()> {
        let db = self.db;
        let values = [
            db.quote_literal(&SqlValue::from(client)),
            db.quote_literal(&SqlValue::from(recorded_at)),
            db.quote_literal(&SqlValue::from(record_type)),
            db.quote_literal(&SqlValue::from(amount)),
            db.quote_literal(&SqlValue::from(narrative)),
        ]
        .join(", ");

        db.execute(&format!(
            "INSERT INTO {} (client, recorded_at, record_type, amount, narrative, opening_balance) \
             VALUES ({}, {})",
            self.compact,
            values,
            db.quote_literal(&SqlValue::from(false)),
        ))?;
        db.execute(&format!(
            "INSERT INTO {} (client, recorded_at, record_type, amount, narrative) VALUES ({})",
            self.full, values,
        ))?;
        Ok(())
    }

    /// Which table a balance query over `[start, end)` would read.
    pub fn balance_source(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<BalanceSource> {
        routing::select_source(self.db, &self.compact, start, end)
    }

    /// Sum of positive amounts in `[start, end)`.
    pub fn total_credit_amount(
        &self,
        client: &str,
        record_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Decimal> {
        self.sum(client, record_type, start, end, Sign::Credits)
    }

    /// Absolute value of the sum of negative amounts in `[start, end)`.
    pub fn total_debit_amount(
        &self,
        client: &str,
        record_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Decimal> {
        self.sum(client, record_type, start, end, Sign::Debits)
            .map(|total| total.abs())
    }

    /// Net balance in `[start, end)`; zero when nothing matched.
    pub fn compound_balance(
        &self,
        client: &str,
        record_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Decimal> {
        self.sum(client, record_type, start, end, Sign::All)
    }

    fn sum(
        &self,
        client: &str,
        record_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        sign: Sign,
    ) -> Result<Decimal> {
        self.record_types.ensure(record_type)?;

        let table = match self.balance_source(start, end)? {
            BalanceSource::Compact => &self.compact,
            BalanceSource::Full => &self.full,
        };

        let mut conditions = Conditions::new(self.db);
        conditions.eq("client", client).eq("record_type", record_type);
        if start.is_some() || end.is_some() {
            let end = end.unwrap_or_else(|| self.clock.now_micros());
            conditions.window("recorded_at", start, Some(end));
        }

        let amounts = self
            .db
            .execute(&format!(
                "SELECT amount FROM {}{}",
                table,
                conditions.render()
            ))?
            .map(|row| row.decimal("amount"))
            .collect::<Result<Vec<_>>>()?;

        checked_sum(amounts.into_iter().filter(|amount| sign.keeps(amount)))
    }

    /// Individual movements for `client` from the full table.
    ///
    /// # Errors
    ///
    /// - `JournalError::InvalidRecordType` if the filter names an unknown type
    /// - `JournalError::NoRecordsSelected` if nothing matched
    pub fn records(&self, client: &str, filter: &RecordFilter) -> Result<Vec<LedgerEntry>> {
        if let Some(ref record_type) = filter.record_type {
            self.record_types.ensure(record_type)?;
        }

        select_history(
            self.db,
            &self.full,
            LEDGER_COLUMNS,
            client,
            filter,
            self.clock.now_micros(),
        )?
        .map(LedgerEntry::try_from)
        .collect()
    }

    /// Check that both tables hold the same net amount for every client and
    /// record type, and that no stored type is outside the vocabulary.
    pub fn verify_integrity(&self) -> Result<()> {
        let compact = self.totals_by_group(&self.compact)?;
        let full = self.totals_by_group(&self.full)?;

        let keys: BTreeSet<&(String, String)> = compact.keys().chain(full.keys()).collect();
        for key in keys {
            let (client, record_type) = key;
            if !self.record_types.validate(record_type) {
                return Err(JournalError::IntegrityViolation(format!(
                    "client {} has rows of unknown type {}",
                    client, record_type
                )));
            }

            let in_compact = compact.get(key).copied().unwrap_or(Decimal::ZERO);
            let in_full = full.get(key).copied().unwrap_or(Decimal::ZERO);
            if in_compact != in_full {
                return Err(JournalError::IntegrityViolation(format!(
                    "client {} type {}: {} holds {} but {} holds {}",
                    client, record_type, self.compact, in_compact, self.full, in_full
                )));
            }
        }

        debug!(compact = %self.compact, full = %self.full, "journal tables agree");
        Ok(())
    }

    fn totals_by_group(&self, table: &str) -> Result<BTreeMap<(String, String), Decimal>> {
        let mut totals: BTreeMap<(String, String), Decimal> = BTreeMap::new();
        for row in self
            .db
            .execute(&format!("SELECT client, record_type, amount FROM {}", table))?
        {
            let key = (row.text("client")?, row.text("record_type")?);
            let amount = row.decimal("amount")?;
            let total = totals.entry(key).or_insert(Decimal::ZERO);
            *total = checked_add(*total, amount)?;
        }
        Ok(totals)
    }
}
