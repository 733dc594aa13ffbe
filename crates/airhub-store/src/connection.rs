//! Connection management for the store.
//!
//! All writes go through a single writer connection guarded by a mutex, so
//! two writers never interleave. File-backed stores run in WAL mode and hand
//! out separate read-only connections, which lets reads proceed alongside
//! each other and alongside a write while only ever seeing committed rows.
//! In-memory databases cannot be shared between connections, so their reads
//! go through the writer.
//!
//! Connections are opened on first use and kept until [`Connections::close`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::schema;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle reader connections kept for reuse.
const MAX_IDLE_READERS: usize = 4;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    File(PathBuf),
    Memory,
}

pub(crate) struct Connections {
    location: Location,
    writer: Mutex<Option<Connection>>,
    readers: Mutex<Vec<Connection>>,
    opened: AtomicBool,
    /// Bumped on close so readers checked out before it are not pooled again.
    generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Connections {
    pub(crate) fn new(location: Location) -> Self {
        Self {
            location,
            writer: Mutex::new(None),
            readers: Mutex::new(Vec::new()),
            opened: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Open the writer connection now instead of on first use.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        self.with_writer(|_| Ok(()))
    }

    /// Run `f` with exclusive access to the writer connection.
    pub(crate) fn with_writer<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = lock(&self.writer);
        let conn = match guard.take() {
            Some(conn) => conn,
            None => self.open_writer()?,
        };
        let conn = guard.insert(conn);
        f(conn)
    }

    /// Run `f` against a connection that sees only committed data.
    pub(crate) fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let path = match &self.location {
            Location::File(path) => path,
            Location::Memory => return self.with_writer(|conn| f(conn)),
        };

        // Readers attach to an existing, initialized database.
        if !self.opened.load(Ordering::Acquire) {
            self.ensure_open()?;
        }

        let generation = self.generation.load(Ordering::Acquire);
        let pooled = lock(&self.readers).pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => open_reader(path)?,
        };

        let result = f(&conn);

        if self.generation.load(Ordering::Acquire) == generation {
            let mut idle = lock(&self.readers);
            if idle.len() < MAX_IDLE_READERS {
                idle.push(conn);
            }
        }

        result
    }

    /// Release every connection. The next operation reopens lazily.
    pub(crate) fn close(&self) {
        let mut writer = lock(&self.writer);
        self.generation.fetch_add(1, Ordering::AcqRel);
        lock(&self.readers).clear();

        if let Some(conn) = writer.take() {
            if let Err((_, e)) = conn.close() {
                warn!("Error while closing database: {}", e);
            }
            info!("Closed database");
        }
        self.opened.store(false, Ordering::Release);
    }

    fn open_writer(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
                }

                info!("Opening database at {}", path.display());
                let conn = Connection::open(path)?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                // WAL lets readers keep a consistent snapshot while the writer commits
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )?;
                conn
            }
            Location::Memory => {
                debug!("Opening in-memory database");
                Connection::open_in_memory()?
            }
        };

        schema::initialize(&conn)?;
        self.opened.store(true, Ordering::Release);
        Ok(conn)
    }
}

fn open_reader(path: &Path) -> Result<Connection> {
    debug!("Opening reader connection to {}", path.display());
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI,
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?)
    }

    #[test]
    fn test_memory_reads_use_writer() {
        let conns = Connections::new(Location::Memory);
        conns
            .with_writer(|conn| {
                conn.execute(
                    "INSERT INTO readings (device_id, device_name, timestamp, type, value, unit)
                     VALUES ('d1', 'x', 1, 'voc', 100.0, 'index')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(conns.with_reader(count).unwrap(), 1);
        assert!(conns.path().is_none());
    }

    #[test]
    fn test_file_reader_sees_committed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("readings.db");
        let conns = Connections::new(Location::File(path.clone()));

        // First read opens the writer and creates the parent directory
        assert_eq!(conns.with_reader(count).unwrap(), 0);
        assert!(path.exists());

        conns
            .with_writer(|conn| {
                conn.execute(
                    "INSERT INTO readings (device_id, device_name, timestamp, type, value, unit)
                     VALUES ('d1', 'x', 1, 'pm25', 3.0, 'μg/m³')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(conns.with_reader(count).unwrap(), 1);
    }

    #[test]
    fn test_reader_connections_are_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let conns = Connections::new(Location::File(dir.path().join("ro.db")));

        let result = conns.with_reader(|conn| {
            conn.execute("DELETE FROM readings", [])?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn test_close_then_reopen_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let conns = Connections::new(Location::File(dir.path().join("reopen.db")));
        conns.ensure_open().unwrap();
        conns
            .with_writer(|conn| {
                conn.execute(
                    "INSERT INTO readings (device_id, device_name, timestamp, type, value, unit)
                     VALUES ('d1', 'x', 1, 'humidity', 30.0, '%')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        conns.close();
        conns.close(); // closing twice is harmless

        assert_eq!(conns.with_reader(count).unwrap(), 1);
    }
}
