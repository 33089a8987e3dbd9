pub mod aggregate;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod sessions;
pub mod txn;
pub mod users;

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

pub use error::{StoreError, StoreResult};
pub use txn::{TxnState, WriteTxn};

#[derive(Debug, Clone)]
pub struct DbOptions {
    pub reader_pool_size: usize,
    /// How long a writer waits on the engine's write lock before the
    /// transaction is reported as a conflict.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            reader_pool_size: 4,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Handle to the SQLite store.
///
/// Reads go through a fixed pool of read-only connections. Every write opens
/// its own connection and runs inside one IMMEDIATE transaction (see
/// [`Database::write`]), so no write state is shared between requests.
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    open_writers: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path, opts: &DbOptions) -> StoreResult<Self> {
        let bootstrap = Connection::open(path)?;

        // WAL mode for concurrent reads
        let mode: String =
            bootstrap.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("journal_mode = {}", mode);
        bootstrap.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&bootstrap)?;
        drop(bootstrap);

        let pool_size = opts.reader_pool_size.max(1);
        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.pragma_update(None, "query_only", "ON")?;
            conn.busy_timeout(opts.busy_timeout)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (per-request writers + {} readers)",
            path.display(),
            pool_size
        );
        Ok(Self {
            path: path.to_path_buf(),
            busy_timeout: opts.busy_timeout,
            readers,
            reader_idx: AtomicUsize::new(0),
            open_writers: AtomicUsize::new(0),
        })
    }

    /// Run `f` on one of the read-only connections. No transactional
    /// isolation: readers may observe state between two committed writes.
    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| StoreError::Store(format!("Reader lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `body` inside a fresh write transaction.
    ///
    /// `Ok` commits, `Err` rolls back and is returned unchanged. The
    /// connection is closed on every path, including a panic in `body`.
    pub fn write<F, T>(&self, label: &'static str, body: F) -> StoreResult<T>
    where
        F: FnOnce(&WriteTxn<'_>) -> StoreResult<T>,
    {
        let mut handle = self.open_writer()?;
        let txn = WriteTxn::begin(&mut handle.conn, label)?;

        match body(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.rollback(&e);
                Err(e)
            }
        }
    }

    /// Number of write connections currently open.
    pub fn open_writers(&self) -> usize {
        self.open_writers.load(Ordering::SeqCst)
    }

    fn open_writer(&self) -> StoreResult<WriterHandle<'_>> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        self.open_writers.fetch_add(1, Ordering::SeqCst);
        Ok(WriterHandle {
            conn,
            open_writers: &self.open_writers,
        })
    }
}

struct WriterHandle<'a> {
    conn: Connection,
    open_writers: &'a AtomicUsize,
}

impl Drop for WriterHandle<'_> {
    fn drop(&mut self) {
        self.open_writers.fetch_sub(1, Ordering::SeqCst);
        debug!("Write connection closed");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Open a database in a fresh temp dir. Keep the `TempDir` alive for the
    /// duration of the test.
    pub fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("test.db"), &DbOptions::default())
            .expect("open database");
        (dir, db)
    }
}
