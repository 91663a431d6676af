//! Storage abstraction for journals.
//!
//! Journals never talk to a driver directly. They consume the narrow
//! [`Database`] contract:
//! - run one statement and get a [`ResultSet`] back
//! - run an idempotent schema statement until it succeeds (bounded)
//! - quote a scalar as a literal
//! - begin / commit / roll back a transaction
//!
//! [`SqliteDatabase`] is the bundled implementation.

pub mod sqlite;
pub mod traits;
pub mod transaction;
pub mod types;

pub use sqlite::SqliteDatabase;
pub use traits::Database;
pub use transaction::Transaction;
pub use types::{format_timestamp, parse_timestamp, ResultSet, Row, SqlValue, TIMESTAMP_FORMAT};
