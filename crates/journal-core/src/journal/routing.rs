//! Choosing which ledger table answers a balance query.
//!
//! An opening-balance row dated `C` stands in for every compact row that
//! was older than `C`. A window that reaches back to `C` or earlier would
//! either count that summary inside the window or miss the detail it
//! replaced, so such windows are answered from the full table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::Conditions;
use crate::error::Result;
use crate::storage::Database;

/// Table a balance query reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    /// Recent detail plus opening balances
    Compact,
    /// Every individual movement
    Full,
}

/// Pick the table for a `[start, end)` balance query.
///
/// The bound checked against opening rows is `start`, or `end` when no
/// start is given. With neither, the compact table is always enough.
pub(crate) fn select_source<D: Database + ?Sized>(
    db: &D,
    compact_table: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<BalanceSource> {
    let bound = match start.or(end) {
        Some(bound) => bound,
        None => return Ok(BalanceSource::Compact),
    };

    let mut conditions = Conditions::new(db);
    conditions
        .eq("opening_balance", true)
        .at_least("recorded_at", bound);
    let found = db.execute(&format!(
        "SELECT id FROM {}{} LIMIT 1",
        compact_table,
        conditions.render()
    ))?;

    let source = if found.is_empty() {
        BalanceSource::Compact
    } else {
        BalanceSource::Full
    };
    debug!(table = %compact_table, bound = %bound, ?source, "routed balance query");
    Ok(source)
}
