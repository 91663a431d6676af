//! SQLite implementation of the storage contract.
//!
//! One handle wraps one connection. Any thread may use it: statements are
//! serialised through a mutex, and once a thread has opened a transaction
//! every other thread's statements wait until that transaction commits or
//! rolls back. Separate handles to the same file are isolated by SQLite's
//! own locking (`BEGIN IMMEDIATE` takes the write lock up front, the busy
//! timeout covers the wait). A thread that opens a transaction has to
//! finish it; [`Transaction`](super::Transaction) does that on drop.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{debug, warn};

use super::traits::Database;
use super::types::{ResultSet, Row, SqlValue};
use crate::config::{RetryPolicy, StorageConfig};
use crate::error::{JournalError, Result};

struct Session {
    conn: Connection,
    /// Thread whose statement left the connection inside a transaction.
    tx_owner: Option<ThreadId>,
}

/// rusqlite-backed [`Database`].
pub struct SqliteDatabase {
    session: Mutex<Session>,
    tx_released: Condvar,
    schema_retry: RetryPolicy,
}

impl SqliteDatabase {
    /// Open (or create) a database file with default settings.
    pub fn open(path: &Path) -> Result<Self> {
        let config = StorageConfig {
            path: Some(path.to_path_buf()),
            ..StorageConfig::default()
        };
        Self::from_config(&config)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_config(&StorageConfig::default())
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.schema_retry.validate()?;
        let conn = match config.path {
            Some(ref path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout())?;
        debug!(path = ?config.path, "opened sqlite journal storage");

        Ok(Self {
            session: Mutex::new(Session {
                conn,
                tx_owner: None,
            }),
            tx_released: Condvar::new(),
            schema_retry: config.schema_retry,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.schema_retry = policy;
        self
    }

    /// Lock the session once no other thread has a transaction open.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Session>> {
        let current = thread::current().id();
        let mut session = self.session.lock().map_err(|_| poisoned())?;
        while session.tx_owner.is_some_and(|owner| owner != current) {
            session = self.tx_released.wait(session).map_err(|_| poisoned())?;
        }
        Ok(session)
    }

    /// Record who owns the connection after a statement ran.
    fn track_transaction(&self, session: &mut Session) {
        if session.conn.is_autocommit() {
            if session.tx_owner.take().is_some() {
                self.tx_released.notify_all();
            }
        } else if session.tx_owner.is_none() {
            session.tx_owner = Some(thread::current().id());
        }
    }

    fn run(conn: &Connection, sql: &str) -> Result<ResultSet> {
        let mut stmt = conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            let changed = stmt.execute([])?;
            return Ok(ResultSet::affected(changed));
        }

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(Self::value_from_ref(row.get_ref(index)?)?);
            }
            collected.push(Row::new(Arc::clone(&columns), values));
        }

        Ok(ResultSet::from_rows(collected))
    }

    fn value_from_ref(value: ValueRef<'_>) -> Result<SqlValue> {
        Ok(match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(value) => SqlValue::Integer(value),
            ValueRef::Real(value) => SqlValue::Real(value),
            ValueRef::Text(bytes) => SqlValue::Text(
                std::str::from_utf8(bytes)
                    .map_err(|e| JournalError::Storage(format!("Invalid UTF-8 in text column: {}", e)))?
                    .to_string(),
            ),
            ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
        })
    }
}

fn poisoned() -> JournalError {
    JournalError::Storage("SQLite connection poisoned".to_string())
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str) -> Result<ResultSet> {
        let mut session = self.lock_conn()?;
        let result = Self::run(&session.conn, sql);
        self.track_transaction(&mut session);
        result
    }

    fn execute_until_successful(&self, sql: &str) -> Result<()> {
        let policy = self.schema_retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.execute(sql) {
                Ok(_) => return Ok(()),
                Err(err) if attempt >= policy.max_attempts => {
                    return Err(JournalError::SchemaUnavailable {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "schema statement failed, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    fn begin(&self) -> Result<()> {
        self.execute("BEGIN IMMEDIATE").map(|_| ())
    }

    fn commit(&self) -> Result<()> {
        self.execute("COMMIT").map(|_| ())
    }

    fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK").map(|_| ())
    }
}
