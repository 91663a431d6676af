//! Journal configuration.
//!
//! Configuration is plain serde data, usually loaded from TOML:
//!
//! ```toml
//! name = "wallet"
//! record_types = ["available", "reserved"]
//! retention_months = 3
//!
//! [storage]
//! path = "/var/lib/wallet/journal.sqlite"
//! busy_timeout_ms = 5000
//!
//! [storage.schema_retry]
//! max_attempts = 50
//! initial_backoff_ms = 10
//! max_backoff_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::record_types::RecordTypeSet;

/// Default consolidation window.
pub const DEFAULT_RETENTION_MONTHS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Table prefix; tables are `<name>log` and `<name>fulllog`.
    pub name: String,

    /// Closed vocabulary of record types.
    pub record_types: Vec<String>,

    /// Compact-table detail older than this many months is consolidated.
    #[serde(default = "default_retention_months")]
    pub retention_months: u32,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_retention_months() -> u32 {
    DEFAULT_RETENTION_MONTHS
}

impl JournalConfig {
    pub fn new<I, S>(name: impl Into<String>, record_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            record_types: record_types.into_iter().map(Into::into).collect(),
            retention_months: DEFAULT_RETENTION_MONTHS,
            storage: StorageConfig::default(),
        }
    }

    pub fn with_retention_months(mut self, months: u32) -> Self {
        self.retention_months = months;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: JournalConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JournalError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| JournalError::Config(format!("TOML error: {}", e)))
    }

    /// Check everything that can be checked without touching storage.
    pub fn validate(&self) -> Result<()> {
        validate_journal_name(&self.name)?;
        if self.retention_months == 0 {
            return Err(JournalError::Config(
                "retention_months must be at least 1".to_string(),
            ));
        }
        self.storage.schema_retry.validate()?;
        self.record_type_set().map(|_| ())
    }

    pub fn record_type_set(&self) -> Result<RecordTypeSet> {
        RecordTypeSet::new(self.record_types.iter().cloned())
    }
}

/// Journal names end up inside table identifiers.
pub fn validate_journal_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(JournalError::InvalidInput(
            "Journal name must not be empty".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(JournalError::InvalidInput(format!(
            "Journal name {:?} may only contain ASCII letters, digits and underscores",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file; `None` keeps the database in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub schema_retry: RetryPolicy,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            schema_retry: RetryPolicy::default(),
        }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Bounded exponential backoff for idempotent schema statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_backoff_ms: 10,
            max_backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to the cap.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(JournalError::Config(
                "schema_retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(JournalError::Config(
                "schema_retry.initial_backoff_ms exceeds max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = JournalConfig::from_toml_str(
            r#"
            name = "wallet"
            record_types = ["available", "reserved"]
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "wallet");
        assert_eq!(config.retention_months, 3);
        assert_eq!(config.storage.path, None);
        assert_eq!(config.storage.busy_timeout_ms, 5_000);
        assert_eq!(config.storage.schema_retry, RetryPolicy::default());
        assert_eq!(config.record_type_set().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_full_config() {
        let config = JournalConfig::from_toml_str(
            r#"
            name = "wallet"
            record_types = ["available"]
            retention_months = 6

            [storage]
            path = "/tmp/wallet.sqlite"
            busy_timeout_ms = 250

            [storage.schema_retry]
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.retention_months, 6);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/wallet.sqlite")));
        assert_eq!(config.storage.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.storage.schema_retry.max_attempts, 4);
        assert_eq!(config.storage.schema_retry.initial_backoff_ms, 10);
    }

    #[test]
    fn test_rejects_bad_name() {
        let result = JournalConfig::from_toml_str(
            r#"
            name = "wallet; DROP TABLE x"
            record_types = ["available"]
            "#,
        );
        assert!(matches!(result, Err(JournalError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_zero_retention() {
        let config = JournalConfig::new("wallet", ["available"]).with_retention_months(0);
        assert!(matches!(config.validate(), Err(JournalError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_vocabulary() {
        let config = JournalConfig::new("wallet", Vec::<String>::new());
        assert!(matches!(config.validate(), Err(JournalError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = JournalConfig::from_toml_str("name = ");
        assert!(matches!(result, Err(JournalError::Config(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = JournalConfig::new("wallet", ["available", "reserved"]);
        let rendered = config.to_toml_string().unwrap();
        let parsed = JournalConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.record_types, config.record_types);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
        assert_eq!(policy.backoff(4), Duration::from_millis(50));
        assert_eq!(policy.backoff(60), Duration::from_millis(50));
    }
}
