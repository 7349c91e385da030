//! Request-scoped store session and the explicit transaction state machine.
//!
//! A [`Session`] owns exactly one SQLite connection and is handed to whoever
//! needs the store; there is no process-wide handle. Writers open a
//! [`Transaction`] on it, which moves through
//!
//! ```text
//! Idle --begin--> Active --commit--> Committed
//!                   |
//!                   +----rollback--> RolledBack
//! ```
//!
//! Every other transition fails with [`WriteError::InvalidTransition`].

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StoreLocation;
use crate::db;
use crate::error::WriteError;

/// Lifecycle of one [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        };
        f.write_str(s)
    }
}

/// Store handle with an explicit open/close lifecycle.
#[derive(Debug)]
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Open the store at `location`, configure it and migrate the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(location: &StoreLocation, busy_timeout: Duration) -> Result<Self> {
        let conn = db::open_location(location, busy_timeout)
            .with_context(|| format!("open session on {location}"))?;
        debug!(%location, "session opened");
        Ok(Self { conn })
    }

    /// Wrap an already configured connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a writer transaction (`BEGIN IMMEDIATE`).
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidTransition`] if a transaction is already
    /// open on this connection, or [`WriteError::TransactionFailed`] if the
    /// store refuses the `BEGIN`.
    pub fn begin_transaction(&self) -> Result<Transaction<'_>, WriteError> {
        if self.is_transaction_in_progress() {
            return Err(WriteError::InvalidTransition {
                state: TransactionState::Active,
                action: "begin",
            });
        }
        let mut tx = Transaction::new(&self.conn);
        tx.begin()?;
        Ok(tx)
    }

    /// Commit `tx`, which must have been opened on this session.
    ///
    /// # Errors
    ///
    /// See [`Transaction::commit`].
    pub fn commit_transaction(&self, tx: &mut Transaction<'_>) -> Result<(), WriteError> {
        debug_assert!(std::ptr::eq(tx.conn, &self.conn));
        tx.commit()
    }

    /// Roll back `tx`, which must have been opened on this session.
    ///
    /// # Errors
    ///
    /// See [`Transaction::rollback`].
    pub fn rollback_transaction(&self, tx: &mut Transaction<'_>) -> Result<(), WriteError> {
        debug_assert!(std::ptr::eq(tx.conn, &self.conn));
        tx.rollback()
    }

    /// `true` while SQLite is inside an explicit transaction.
    #[must_use]
    pub fn is_transaction_in_progress(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Close the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite refuses to close (e.g. unfinalized
    /// statements).
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("close session")?;
        debug!("session closed");
        Ok(())
    }
}

/// One transaction on a borrowed connection.
///
/// Dropping a transaction that is still [`TransactionState::Active`] rolls it
/// back.
#[derive(Debug)]
pub struct Transaction<'s> {
    conn: &'s Connection,
    state: TransactionState,
}

impl<'s> Transaction<'s> {
    /// New transaction in the [`TransactionState::Idle`] state.
    #[must_use]
    pub const fn new(conn: &'s Connection) -> Self {
        Self {
            conn,
            state: TransactionState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Connection the transaction's statements run on.
    #[must_use]
    pub const fn connection(&self) -> &'s Connection {
        self.conn
    }

    /// # Errors
    ///
    /// Fails unless the transaction is idle, or if SQLite rejects the
    /// `BEGIN IMMEDIATE`.
    pub fn begin(&mut self) -> Result<(), WriteError> {
        self.expect_state(TransactionState::Idle, "begin")?;
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(WriteError::store("begin"))?;
        self.state = TransactionState::Active;
        Ok(())
    }

    /// Commit the transaction.
    ///
    /// A `COMMIT` rejected by a deferred constraint leaves SQLite inside the
    /// transaction; the state then stays `Active` so the caller can still
    /// roll back.
    ///
    /// # Errors
    ///
    /// Fails unless the transaction is active, or if SQLite rejects the
    /// `COMMIT`.
    pub fn commit(&mut self) -> Result<(), WriteError> {
        self.expect_state(TransactionState::Active, "commit")?;
        match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(source) => {
                self.sync_with_store();
                Err(WriteError::TransactionFailed {
                    operation: "commit",
                    source,
                })
            }
        }
    }

    /// # Errors
    ///
    /// Fails unless the transaction is active, or if SQLite rejects the
    /// `ROLLBACK`.
    pub fn rollback(&mut self) -> Result<(), WriteError> {
        self.expect_state(TransactionState::Active, "roll back")?;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(WriteError::store("rollback"))?;
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    /// Reconcile the state with SQLite after a failed statement.
    ///
    /// Some errors (e.g. `SQLITE_FULL`) make SQLite roll back on its own; an
    /// `Active` transaction whose connection is back in autocommit mode is
    /// marked rolled back.
    pub fn sync_with_store(&mut self) {
        if self.state == TransactionState::Active && self.conn.is_autocommit() {
            debug!("store rolled the transaction back on its own");
            self.state = TransactionState::RolledBack;
        }
    }

    fn expect_state(
        &self,
        expected: TransactionState,
        action: &'static str,
    ) -> Result<(), WriteError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WriteError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.sync_with_store();
        if self.state != TransactionState::Active {
            return;
        }
        if let Err(error) = self.conn.execute_batch("ROLLBACK") {
            warn!(%error, "rollback of abandoned transaction failed");
        } else {
            warn!("abandoned transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, Transaction, TransactionState};
    use crate::db;
    use crate::error::{ErrorCode, WriteError};

    fn test_session() -> Session {
        Session::from_connection(db::open_in_memory().expect("open in-memory store"))
    }

    fn stakeholder_count(session: &Session) -> i64 {
        session
            .connection()
            .query_row("SELECT COUNT(*) FROM stakeholder", [], |row| row.get(0))
            .expect("count stakeholders")
    }

    #[test]
    fn begin_commit_walks_the_state_machine() {
        let session = test_session();
        let mut tx = Transaction::new(session.connection());
        assert_eq!(tx.state(), TransactionState::Idle);

        tx.begin().expect("begin");
        assert_eq!(tx.state(), TransactionState::Active);
        assert!(session.is_transaction_in_progress());

        tx.connection()
            .execute("INSERT INTO stakeholder (id) VALUES ('a')", [])
            .expect("insert");
        tx.commit().expect("commit");
        assert_eq!(tx.state(), TransactionState::Committed);
        assert!(!session.is_transaction_in_progress());
        drop(tx);

        assert_eq!(stakeholder_count(&session), 1);
    }

    #[test]
    fn rollback_discards_writes() {
        let session = test_session();
        let mut tx = session.begin_transaction().expect("begin");
        tx.connection()
            .execute("INSERT INTO stakeholder (id) VALUES ('a')", [])
            .expect("insert");
        tx.rollback().expect("rollback");
        assert_eq!(tx.state(), TransactionState::RolledBack);
        drop(tx);

        assert_eq!(stakeholder_count(&session), 0);
        assert!(!session.is_transaction_in_progress());
    }

    #[test]
    fn session_commits_and_rolls_back_its_transactions() {
        let session = test_session();

        let mut tx = session.begin_transaction().expect("begin");
        tx.connection()
            .execute("INSERT INTO stakeholder (id) VALUES ('a')", [])
            .expect("insert");
        session.commit_transaction(&mut tx).expect("commit");
        assert_eq!(tx.state(), TransactionState::Committed);
        let err = session
            .commit_transaction(&mut tx)
            .expect_err("second commit");
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        drop(tx);

        let mut tx = session.begin_transaction().expect("begin again");
        tx.connection()
            .execute("INSERT INTO stakeholder (id) VALUES ('b')", [])
            .expect("insert");
        session.rollback_transaction(&mut tx).expect("rollback");
        assert_eq!(tx.state(), TransactionState::RolledBack);
        assert!(session.rollback_transaction(&mut tx).is_err());
        drop(tx);

        assert_eq!(stakeholder_count(&session), 1);
        assert!(!session.is_transaction_in_progress());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let session = test_session();
        let mut tx = Transaction::new(session.connection());

        let err = tx.commit().expect_err("commit from idle");
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        let err = tx.rollback().expect_err("rollback from idle");
        assert!(matches!(
            err,
            WriteError::InvalidTransition {
                state: TransactionState::Idle,
                action: "roll back"
            }
        ));

        tx.begin().expect("begin");
        assert!(tx.begin().is_err(), "begin twice");
        tx.commit().expect("commit");
        assert!(tx.commit().is_err(), "commit after commit");
        assert!(tx.rollback().is_err(), "rollback after commit");
    }

    #[test]
    fn session_refuses_nested_begin() {
        let session = test_session();
        let _tx = session.begin_transaction().expect("first begin");
        let err = session.begin_transaction().expect_err("second begin");
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
    }

    #[test]
    fn dropping_active_transaction_rolls_back() {
        let session = test_session();
        {
            let tx = session.begin_transaction().expect("begin");
            tx.connection()
                .execute("INSERT INTO stakeholder (id) VALUES ('a')", [])
                .expect("insert");
        }
        assert!(!session.is_transaction_in_progress());
        assert_eq!(stakeholder_count(&session), 0);
    }

    #[test]
    fn deferred_fk_failure_keeps_transaction_active_until_rollback() {
        let session = test_session();
        let mut tx = session.begin_transaction().expect("begin");
        tx.connection()
            .execute(
                "INSERT INTO stakeholder_relation (parent_id, child_id) VALUES ('ghost', 'nobody')",
                [],
            )
            .expect("deferred fk accepts the statement");

        let err = tx.commit().expect_err("commit must fail on dangling edge");
        assert_eq!(err.code(), ErrorCode::TransactionFailed);
        assert_eq!(tx.state(), TransactionState::Active);
        assert!(session.is_transaction_in_progress());

        tx.rollback().expect("rollback");
        drop(tx);
        assert!(!session.is_transaction_in_progress());
    }

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(TransactionState::Idle.to_string(), "idle");
        assert_eq!(TransactionState::RolledBack.to_string(), "rolled back");
    }

    #[test]
    fn close_releases_connection() {
        let session = test_session();
        session.close().expect("close");
    }
}
