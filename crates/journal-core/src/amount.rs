//! Fixed-point amount rules.
//!
//! Amounts are [`Decimal`] values. The ledger column keeps 18 fractional
//! digits, so anything with a larger scale is rejected rather than rounded.
//! Sums are always checked; a balance never silently wraps or rounds.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

/// Fractional digits kept by the amount column.
pub const AMOUNT_SCALE: u32 = 18;

/// Reject amounts that would lose precision when stored.
pub fn ensure_representable(amount: Decimal) -> Result<Decimal> {
    if amount.scale() > AMOUNT_SCALE {
        return Err(JournalError::InvalidAmount(format!(
            "{} has more than {} fractional digits",
            amount, AMOUNT_SCALE
        )));
    }
    Ok(amount)
}

/// Add two amounts, failing instead of rounding.
///
/// `Decimal` keeps about 28 significant digits and silently drops
/// fractional digits once a sum needs more, so the result is checked for
/// exactness as well as for range overflow.
pub fn checked_add(acc: Decimal, amount: Decimal) -> Result<Decimal> {
    let sum = acc
        .checked_add(amount)
        .ok_or(JournalError::AmountOverflow)?;
    if sum.checked_sub(acc) != Some(amount) || sum.checked_sub(amount) != Some(acc) {
        return Err(JournalError::AmountOverflow);
    }
    Ok(sum)
}

/// Sum amounts exactly; see [`checked_add`].
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, checked_add)
}

/// Sign of a ledger movement.
///
/// Only used to group rows during consolidation; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    /// Positive amounts are credits; zero and negative amounts are debits.
    pub fn of(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            Direction::Credit
        } else {
            Direction::Debit
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Credit => "credits",
            Direction::Debit => "debits",
        }
    }

    /// Narrative written on opening-balance rows.
    pub fn opening_narrative(self) -> String {
        format!("starting {}", self.label())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
