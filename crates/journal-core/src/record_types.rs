//! The closed vocabulary of record types a journal accepts.

use std::collections::BTreeSet;

use crate::error::{JournalError, Result};
use crate::storage::{Database, SqlValue};

/// Fixed set of record-type tags, supplied when a journal is opened.
///
/// Every write and every typed read is checked against this set before
/// storage is touched. The same set is embedded in the table definition as
/// a `CHECK` constraint, so storage rejects foreign values too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeSet {
    // Declaration order is kept for DDL; the set is for lookups.
    ordered: Vec<String>,
    lookup: BTreeSet<String>,
}

impl RecordTypeSet {
    pub fn new<I, S>(types: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut lookup = BTreeSet::new();

        for record_type in types {
            let record_type = record_type.into();
            if record_type.is_empty() {
                return Err(JournalError::Config(
                    "Record type must not be empty".to_string(),
                ));
            }
            if !lookup.insert(record_type.clone()) {
                return Err(JournalError::Config(format!(
                    "Duplicate record type: {}",
                    record_type
                )));
            }
            ordered.push(record_type);
        }

        if ordered.is_empty() {
            return Err(JournalError::Config(
                "At least one record type is required".to_string(),
            ));
        }

        Ok(Self { ordered, lookup })
    }

    pub fn validate(&self, record_type: &str) -> bool {
        self.lookup.contains(record_type)
    }

    /// Fail with `InvalidRecordType` unless the tag belongs to the set.
    pub fn ensure(&self, record_type: &str) -> Result<()> {
        if self.validate(record_type) {
            Ok(())
        } else {
            Err(JournalError::InvalidRecordType(record_type.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// `column IN ('a', 'b', ...)`, quoted by the given database.
    pub fn check_constraint<D: Database + ?Sized>(&self, column: &str, db: &D) -> String {
        let literals: Vec<String> = self
            .iter()
            .map(|record_type| db.quote_literal(&SqlValue::from(record_type)))
            .collect();
        format!("{} IN ({})", column, literals.join(", "))
    }
}
