use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Lifecycle of one write transaction.
///
/// `Idle -> Open -> {Committed | RolledBack} -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Idle,
    Open,
    Committed,
    RolledBack,
    Closed,
}

/// An open IMMEDIATE transaction on a dedicated write connection.
///
/// SQLite takes the write lock at `BEGIN IMMEDIATE`, so writers are
/// serialized in commit order. Dropping the guard without committing rolls
/// back.
pub struct WriteTxn<'c> {
    tx: Option<Transaction<'c>>,
    label: &'static str,
    state: TxnState,
}

impl<'c> WriteTxn<'c> {
    pub(crate) fn begin(conn: &'c mut Connection, label: &'static str) -> StoreResult<Self> {
        debug!(txn = label, state = ?TxnState::Idle, "Opening write transaction");
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!(txn = label, state = ?TxnState::Open, "Write transaction open");

        Ok(Self {
            tx: Some(tx),
            label,
            state: TxnState::Open,
        })
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    /// The connection the transaction runs on. Statements executed through
    /// it are part of the transaction.
    pub fn conn(&self) -> &Connection {
        // `tx` is only taken by commit/rollback, which consume `self`.
        self.tx.as_deref().expect("transaction used after completion")
    }

    pub(crate) fn commit(mut self) -> StoreResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        match tx.commit() {
            Ok(()) => {
                self.state = TxnState::Committed;
                debug!(txn = self.label, state = ?self.state, "Write transaction committed");
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves nothing applied; the connection is
                // closed right after and SQLite discards the transaction.
                self.state = TxnState::RolledBack;
                warn!(txn = self.label, "Commit failed, rolled back: {}", e);
                // Only BUSY/LOCKED become `Conflict`; I/O and other engine
                // failures stay `Store`.
                Err(StoreError::from(e))
            }
        }
    }

    pub(crate) fn rollback(mut self, cause: &StoreError) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        if let Err(e) = tx.rollback() {
            warn!(txn = self.label, "Rollback failed: {}", e);
        }
        self.state = TxnState::RolledBack;
        debug!(txn = self.label, state = ?self.state, "Write transaction rolled back: {}", cause);
    }
}

impl Drop for WriteTxn<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            // Never reached commit or rollback (the body panicked).
            self.state = TxnState::RolledBack;
            warn!(txn = self.label, "Write transaction abandoned, rolled back");
        }
        self.state = TxnState::Closed;
        debug!(txn = self.label, state = ?self.state, "Write transaction closed");
    }
}
