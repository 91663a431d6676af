//! Folding old compact-table detail into opening-balance rows.
//!
//! Rows dated before `now - retention` are grouped by client, record type
//! and direction. Each group is replaced by one row dated at the cutoff
//! carrying the group's sum. The full table is never touched.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::Conditions;
use crate::amount::{checked_sum, Direction};
use crate::error::{JournalError, Result};
use crate::storage::{Database, SqlValue, Transaction};

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    /// Rows older than this were folded
    pub cutoff: DateTime<Utc>,
    /// Detail rows deleted from the compact table
    pub rows_folded: usize,
    /// Opening-balance rows inserted in their place
    pub opening_rows_written: usize,
}

impl ConsolidationReport {
    pub fn is_noop(&self) -> bool {
        self.rows_folded == 0
    }
}

/// `now` minus `retention_months` calendar months.
pub(crate) fn cutoff_for(now: DateTime<Utc>, retention_months: u32) -> Result<DateTime<Utc>> {
    now.checked_sub_months(Months::new(retention_months))
        .ok_or_else(|| {
            JournalError::Config(format!(
                "retention of {} months reaches before the supported date range",
                retention_months
            ))
        })
}

type GroupKey = (String, String, Direction);

/// Run one pass over `compact_table` inside a single transaction.
pub(crate) fn consolidate<D: Database + ?Sized>(
    db: &D,
    compact_table: &str,
    now: DateTime<Utc>,
    retention_months: u32,
) -> Result<ConsolidationReport> {
    let cutoff = cutoff_for(now, retention_months)?;
    let tx = Transaction::begin(db)?;

    let mut conditions = Conditions::new(db);
    conditions.before("recorded_at", cutoff);
    let filter = conditions.render();

    let mut groups: BTreeMap<GroupKey, Vec<Decimal>> = BTreeMap::new();
    let mut rows_folded = 0;
    for row in tx.db().execute(&format!(
        "SELECT client, record_type, amount FROM {}{} ORDER BY id",
        compact_table, filter
    ))? {
        let amount = row.decimal("amount")?;
        let key = (
            row.text("client")?,
            row.text("record_type")?,
            Direction::of(amount),
        );
        groups.entry(key).or_default().push(amount);
        rows_folded += 1;
    }

    if rows_folded == 0 {
        tx.commit()?;
        debug!(table = %compact_table, cutoff = %cutoff, "nothing to consolidate");
        return Ok(ConsolidationReport {
            cutoff,
            rows_folded,
            opening_rows_written: 0,
        });
    }

    tx.db()
        .execute(&format!("DELETE FROM {}{}", compact_table, filter))?;

    let opening_rows_written = groups.len();
    for ((client, record_type, direction), amounts) in groups {
        let total = checked_sum(amounts)?;
        tx.db().execute(&format!(
            "INSERT INTO {} (client, recorded_at, record_type, amount, narrative, opening_balance) \
             VALUES ({}, {}, {}, {}, {}, {})",
            compact_table,
            db.quote_literal(&SqlValue::from(client)),
            db.quote_literal(&SqlValue::from(cutoff)),
            db.quote_literal(&SqlValue::from(record_type)),
            db.quote_literal(&SqlValue::from(total)),
            db.quote_literal(&SqlValue::from(direction.opening_narrative())),
            db.quote_literal(&SqlValue::from(true)),
        ))?;
    }

    tx.commit()?;
    info!(
        table = %compact_table,
        cutoff = %cutoff,
        rows_folded,
        opening_rows_written,
        "consolidated journal"
    );

    Ok(ConsolidationReport {
        cutoff,
        rows_folded,
        opening_rows_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteDatabase;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn setup(rows: &[(&str, &str, &str, &str)]) -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE wlog (id INTEGER PRIMARY KEY AUTOINCREMENT, client TEXT NOT NULL, \
             recorded_at TEXT NOT NULL, record_type TEXT NOT NULL, amount TEXT NOT NULL, \
             narrative TEXT NOT NULL, opening_balance INTEGER NOT NULL)",
        )
        .unwrap();
        for (client, recorded_at, record_type, amount) in rows {
            db.execute(&format!(
                "INSERT INTO wlog (client, recorded_at, record_type, amount, narrative, opening_balance) \
                 VALUES ('{}', '{}', '{}', '{}', '', 0)",
                client, recorded_at, record_type, amount
            ))
            .unwrap();
        }
        db
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cutoff_is_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
        assert_eq!(
            cutoff_for(now, 3).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_groups_by_client_type_and_direction() {
        let db = setup(&[
            ("A", "2024-01-01 00:00:00.000000", "available", "5"),
            ("A", "2024-01-02 00:00:00.000000", "available", "3"),
            ("A", "2024-01-03 00:00:00.000000", "available", "-1"),
            ("B", "2024-01-04 00:00:00.000000", "available", "0"),
            ("A", "2024-06-01 00:00:00.000000", "available", "7"),
        ]);

        let report = consolidate(&db, "wlog", now(), 3).unwrap();
        assert_eq!(report.rows_folded, 4);
        assert_eq!(report.opening_rows_written, 3);
        assert_eq!(report.cutoff, Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap());

        let mut rows = db
            .execute(
                "SELECT client, amount, narrative FROM wlog \
                 WHERE opening_balance = 1 ORDER BY client, narrative",
            )
            .unwrap();
        assert_eq!(rows.row_count(), 3);

        let credits = rows.next_row().unwrap();
        assert_eq!(credits.text("narrative").unwrap(), "starting credits");
        assert_eq!(credits.decimal("amount").unwrap(), Decimal::from(8));

        let debits = rows.next_row().unwrap();
        assert_eq!(debits.text("narrative").unwrap(), "starting debits");
        assert_eq!(debits.decimal("amount").unwrap(), Decimal::from(-1));

        let zero = rows.next_row().unwrap();
        assert_eq!(zero.text("client").unwrap(), "B");
        assert_eq!(zero.text("narrative").unwrap(), "starting debits");
        assert_eq!(zero.decimal("amount").unwrap(), Decimal::ZERO);

        let recent = db
            .execute("SELECT amount FROM wlog WHERE opening_balance = 0")
            .unwrap()
            .row_count();
        assert_eq!(recent, 1);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let db = setup(&[("A", "2024-01-01 00:00:00.000000", "available", "1.5")]);

        let first = consolidate(&db, "wlog", now(), 3).unwrap();
        assert!(!first.is_noop());

        let second = consolidate(&db, "wlog", now(), 3).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.opening_rows_written, 0);

        let amount = db
            .execute("SELECT amount FROM wlog")
            .unwrap()
            .next_row()
            .unwrap()
            .decimal("amount")
            .unwrap();
        assert_eq!(amount, Decimal::from_str("1.5").unwrap());
    }

    #[test]
    fn test_later_pass_refolds_opening_rows() {
        let db = setup(&[
            ("A", "2024-01-01 00:00:00.000000", "available", "2"),
            ("A", "2024-04-01 00:00:00.000000", "available", "3"),
        ]);
        consolidate(&db, "wlog", now(), 3).unwrap();

        let later = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let report = consolidate(&db, "wlog", later, 3).unwrap();
        assert_eq!(report.rows_folded, 2);
        assert_eq!(report.opening_rows_written, 1);

        let mut rows = db.execute("SELECT amount, recorded_at FROM wlog").unwrap();
        assert_eq!(rows.row_count(), 1);
        let row = rows.next_row().unwrap();
        assert_eq!(row.decimal("amount").unwrap(), Decimal::from(5));
        assert_eq!(
            row.timestamp("recorded_at").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_failure_rolls_back() {
        let db = setup(&[("A", "2024-01-01 00:00:00.000000", "available", "oops")]);

        assert!(consolidate(&db, "wlog", now(), 3).is_err());
        assert_eq!(db.execute("SELECT id FROM wlog").unwrap().row_count(), 1);

        // The abandoned transaction must not block the next one.
        db.execute("UPDATE wlog SET amount = '1'").unwrap();
        assert_eq!(consolidate(&db, "wlog", now(), 3).unwrap().rows_folded, 1);
    }
}
