//! Journals: the plain narrative log and the amount-bearing ledger.
//!
//! Both borrow a caller-owned [`Database`] and validate every record type
//! against their [`RecordTypeSet`](crate::RecordTypeSet) before touching
//! storage. They share filter and SQL-building helpers but no base type.

pub mod consolidation;
pub mod plain;
pub mod quantifiable;
pub mod routing;
pub mod row;

use chrono::{DateTime, Utc};

use crate::error::{JournalError, Result};
use crate::storage::{Database, ResultSet, SqlValue};

pub use consolidation::ConsolidationReport;
pub use plain::PlainJournal;
pub use quantifiable::QuantifiableJournal;
pub use routing::BalanceSource;
pub use row::{JournalEntry, LedgerEntry};

/// Filter for history queries.
///
/// The window is half-open: `[since, until)`. A missing `until` means "now",
/// a missing `since` means the unbounded past.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Start date (inclusive)
    pub since: Option<DateTime<Utc>>,

    /// End date (exclusive)
    pub until: Option<DateTime<Utc>>,

    /// Only this record type
    pub record_type: Option<String>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, date: DateTime<Utc>) -> Self {
        self.since = Some(date);
        self
    }

    pub fn until(mut self, date: DateTime<Utc>) -> Self {
        self.until = Some(date);
        self
    }

    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub(crate) fn compact_table(name: &str) -> String {
    format!("{}log", name)
}

pub(crate) fn full_table(name: &str) -> String {
    format!("{}fulllog", name)
}

/// `CREATE INDEX` statements for the columns every query filters on.
pub(crate) fn index_statements(table: &str) -> Vec<String> {
    ["client", "recorded_at", "record_type"]
        .iter()
        .map(|column| {
            format!(
                "CREATE INDEX IF NOT EXISTS {table}_{column} ON {table} ({column})",
                table = table,
                column = column
            )
        })
        .collect()
}

/// Accumulates `WHERE` conditions with literals quoted by the database.
pub(crate) struct Conditions<'d, D: Database + ?Sized> {
    db: &'d D,
    clauses: Vec<String>,
}

impl<'d, D: Database + ?Sized> Conditions<'d, D> {
    pub(crate) fn new(db: &'d D) -> Self {
        Self {
            db,
            clauses: Vec::new(),
        }
    }

    fn push(&mut self, column: &str, op: &str, value: SqlValue) -> &mut Self {
        let literal = self.db.quote_literal(&value);
        self.clauses.push(format!("{} {} {}", column, op, literal));
        self
    }

    pub(crate) fn eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.push(column, "=", value.into())
    }

    pub(crate) fn at_least(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.push(column, ">=", value.into())
    }

    pub(crate) fn before(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.push(column, "<", value.into())
    }

    /// Optional `[since, until)` window on `column`.
    pub(crate) fn window(
        &mut self,
        column: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> &mut Self {
        if let Some(since) = since {
            self.at_least(column, since);
        }
        if let Some(until) = until {
            self.before(column, until);
        }
        self
    }

    /// ` WHERE a AND b`, or nothing when no condition was added.
    pub(crate) fn render(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// History query shared by both journals. The record type, if any, must
/// already be validated.
pub(crate) fn select_history<D: Database + ?Sized>(
    db: &D,
    table: &str,
    columns: &str,
    client: &str,
    filter: &RecordFilter,
    now: DateTime<Utc>,
) -> Result<ResultSet> {
    let mut conditions = Conditions::new(db);
    conditions
        .eq("client", client)
        .window("recorded_at", filter.since, Some(filter.until.unwrap_or(now)));
    if let Some(ref record_type) = filter.record_type {
        conditions.eq("record_type", record_type.as_str());
    }

    let mut query = format!("SELECT {} FROM {}{}", columns, table, conditions.render());
    query.push_str(" ORDER BY id");
    if let Some(limit) = filter.limit {
        query.push_str(&format!(" LIMIT {}", limit));
    }

    let result = db.execute(&query)?;
    if result.is_empty() {
        return Err(JournalError::NoRecordsSelected);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteDatabase;
    use chrono::TimeZone;

    #[test]
    fn test_record_filter_builder() {
        let now = Utc::now();
        let filter = RecordFilter::new()
            .since(now)
            .record_type("available")
            .limit(10);

        assert_eq!(filter.since, Some(now));
        assert_eq!(filter.until, None);
        assert_eq!(filter.record_type.as_deref(), Some("available"));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn test_conditions_render() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut conditions = Conditions::new(&db);
        assert_eq!(conditions.render(), "");

        conditions
            .eq("client", "O'Neil")
            .window("recorded_at", Some(start), None);
        assert_eq!(
            conditions.render(),
            " WHERE client = 'O''Neil' AND recorded_at >= '2024-01-01 00:00:00.000000'"
        );
    }

    #[test]
    fn test_table_names() {
        assert_eq!(compact_table("test"), "testlog");
        assert_eq!(full_table("test"), "testfulllog");
        assert_eq!(
            index_statements("testlog")[0],
            "CREATE INDEX IF NOT EXISTS testlog_client ON testlog (client)"
        );
    }
}
