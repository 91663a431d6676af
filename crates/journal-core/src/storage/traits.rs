//! Storage collaborator contract.
//!
//! Journals talk to storage only through [`Database`], which covers four
//! things: run a statement, run an idempotent statement until
//! it succeeds, quote a literal, and bracket work in a transaction. Schema
//! creation, query execution and escaping belong to the implementation.

use super::types::{ResultSet, SqlValue};
use crate::error::Result;

/// Transactional SQL store consumed by the journals.
///
/// Implementations must ensure:
/// - `execute` runs exactly one statement against the current connection
/// - statements issued between `begin` and `commit` are atomic
/// - `quote_literal` renders decimals without loss
///
/// The handle is owned by the caller; journals borrow it and never pool
/// or cache connections.
pub trait Database: Send + Sync {
    /// Run one statement (DDL, DML or query).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the statement fails. The error is
    /// propagated unchanged to the journal's caller.
    fn execute(&self, sql: &str) -> Result<ResultSet>;

    /// Run an idempotent statement, retrying transient failures.
    ///
    /// Only used for schema creation, which can race with concurrent
    /// first-time initialisation.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::SchemaUnavailable` once the implementation's
    /// retry bound is exhausted.
    fn execute_until_successful(&self, sql: &str) -> Result<()>;

    /// Render a scalar as a literal safe to splice into a statement.
    fn quote_literal(&self, value: &SqlValue) -> String {
        value.ansi_literal()
    }

    /// Open a transaction.
    fn begin(&self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&self) -> Result<()>;

    /// Abandon the open transaction.
    fn rollback(&self) -> Result<()>;
}
