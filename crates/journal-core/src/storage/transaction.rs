//! Scoped transaction over a [`Database`].

use tracing::warn;

use super::traits::Database;
use crate::error::Result;

/// An open transaction that rolls back unless committed.
///
/// Mirrors `rusqlite::Transaction`: dropping the guard without calling
/// [`commit`](Transaction::commit) abandons every statement issued through it.
#[must_use = "a transaction rolls back when dropped"]
pub struct Transaction<'a, D: Database + ?Sized> {
    db: &'a D,
    finished: bool,
}

impl<'a, D: Database + ?Sized> Transaction<'a, D> {
    pub fn begin(db: &'a D) -> Result<Self> {
        db.begin()?;
        Ok(Self {
            db,
            finished: false,
        })
    }

    /// The database this transaction runs against.
    pub fn db(&self) -> &'a D {
        self.db
    }

    /// Commit. On failure the guard is dropped unfinished and rolls back.
    pub fn commit(mut self) -> Result<()> {
        self.db.commit()?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.db.rollback()
    }
}

impl<D: Database + ?Sized> Drop for Transaction<'_, D> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.db.rollback() {
                warn!(error = %err, "rollback of abandoned transaction failed");
            }
        }
    }
}
