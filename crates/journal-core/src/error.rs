//! Error types for journal operations.
//!
//! Every public operation returns [`Result`]. Argument errors
//! (`InvalidRecordType`, `UselessOperation`, `InvalidAmount`) are raised
//! before any storage access; storage errors are propagated unchanged.

use thiserror::Error;

/// Result type alias for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Core error type for journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Record type outside the journal's vocabulary
    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    /// Transfer that would not move anything
    #[error("Useless operation: {0}")]
    UselessOperation(String),

    /// History query matched nothing
    #[error("No records selected")]
    NoRecordsSelected,

    /// Amount not representable in the ledger's fixed-point column
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Aggregation exceeded the decimal range
    #[error("Amount overflow while summing ledger rows")]
    AmountOverflow,

    /// Invalid caller input (journal names and similar)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Compact and full tables disagree
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// Schema provisioning kept failing past the retry bound
    #[error("Schema unavailable after {attempts} attempts: {last_error}")]
    SchemaUnavailable { attempts: u32, last_error: String },
}

impl JournalError {
    /// Whether the error came from the storage collaborator rather than
    /// from argument validation.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            JournalError::Storage(_)
                | JournalError::Sqlite { .. }
                | JournalError::SchemaUnavailable { .. }
        )
    }
}

impl From<std::io::Error> for JournalError {
    fn from(err: std::io::Error) -> Self {
        JournalError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for JournalError {
    fn from(err: toml::de::Error) -> Self {
        JournalError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        assert!(JournalError::Storage("disk".into()).is_storage());
        assert!(JournalError::SchemaUnavailable {
            attempts: 3,
            last_error: "locked".into()
        }
        .is_storage());
        assert!(!JournalError::NoRecordsSelected.is_storage());
        assert!(!JournalError::InvalidRecordType("x".into()).is_storage());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = JournalError::InvalidRecordType("bonus".to_string());
        assert_eq!(err.to_string(), "Invalid record type: bonus");
    }
}
