//! Persistent cache of scanned library metadata.
//!
//! The store is strictly a cache: the filesystem is the source of truth,
//! and any database that fails validation is reported as corrupt so the
//! caller can throw it away and rescan.

use super::models::TrackRecord;
use super::schema::INDEX_SCHEMA;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// The file exists but is not a usable index: unreadable as SQLite,
    /// stamped with a different schema version, or structurally off.
    /// Recoverable by rebuilding from the filesystem.
    #[error("index database is corrupt or incompatible: {0}")]
    Corrupt(String),
    #[error("index database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("index database io error: {0}")]
    Io(#[from] std::io::Error),
}

enum PendingOp {
    Upsert(TrackRecord),
    Remove(PathBuf),
}

/// SQLite-backed index store. Mutations are buffered and applied in a
/// single transaction on [`commit`](SqliteIndexStore::commit), so a crash
/// mid-scan leaves the previous index intact.
pub struct SqliteIndexStore {
    conn: Connection,
    pending: Vec<PendingOp>,
}

impl SqliteIndexStore {
    /// Open the index at `path`, creating the schema when the database is
    /// brand new and validating it otherwise. An existing file that fails
    /// validation yields [`IndexStoreError::Corrupt`]; deciding whether to
    /// rebuild is the caller's call.
    pub fn open(path: &Path) -> Result<Self, IndexStoreError> {
        let conn = Connection::open(path)?;

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                [],
                |r| r.get(0),
            )
            .map_err(|e| IndexStoreError::Corrupt(e.to_string()))?;

        if table_count == 0 {
            info!(path = %path.display(), "Creating new library index");
            INDEX_SCHEMA
                .create(&conn)
                .map_err(|e| IndexStoreError::Corrupt(e.to_string()))?;
        } else {
            INDEX_SCHEMA
                .validate(&conn)
                .map_err(|e| IndexStoreError::Corrupt(e.to_string()))?;
            debug!(path = %path.display(), "Opened existing library index");
        }

        Ok(Self {
            conn,
            pending: Vec::new(),
        })
    }

    /// Delete whatever is at `path` and open a fresh index in its place.
    pub fn rebuild(path: &Path) -> Result<Self, IndexStoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Self::open(path)
    }

    /// Read every persisted track. Ordered by path so repeated loads of the
    /// same index are identical.
    pub fn load(&self) -> Result<Vec<TrackRecord>, IndexStoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, artist, title, album, duration_secs, is_live, mtime \
             FROM tracks ORDER BY path",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrackRecord {
                    path: PathBuf::from(row.get::<_, String>(0)?),
                    artist: row.get(1)?,
                    title: row.get(2)?,
                    album: row.get(3)?,
                    duration_secs: row.get::<_, Option<i64>>(4)?.map(|d| d as u64),
                    is_live: row.get::<_, i64>(5)? != 0,
                    mtime: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Queue an insert-or-replace for `record`, applied at commit time.
    pub fn upsert(&mut self, record: TrackRecord) {
        self.pending.push(PendingOp::Upsert(record));
    }

    /// Queue removal of the row for `path`, applied at commit time.
    pub fn remove(&mut self, path: &Path) {
        self.pending.push(PendingOp::Remove(path.to_path_buf()));
    }

    /// Apply all queued mutations atomically, in the order they were
    /// queued, so a remove followed by an upsert of the same path lands as
    /// the upsert.
    pub fn commit(&mut self) -> Result<(), IndexStoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        for op in self.pending.drain(..) {
            match op {
                PendingOp::Upsert(record) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO tracks \
                         (path, artist, title, album, duration_secs, is_live, mtime) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            record.path.to_string_lossy(),
                            record.artist,
                            record.title,
                            record.album,
                            record.duration_secs.map(|d| d as i64),
                            record.is_live as i64,
                            record.mtime,
                        ],
                    )?;
                }
                PendingOp::Remove(path) => {
                    tx.execute(
                        "DELETE FROM tracks WHERE path = ?1",
                        params![path.to_string_lossy()],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop every row while keeping the schema, for forced full rescans.
    pub fn clear(&mut self) -> Result<(), IndexStoreError> {
        self.pending.clear();
        self.conn.execute("DELETE FROM tracks", [])?;
        Ok(())
    }

    #[cfg(test)]
    fn get(&self, path: &Path) -> Result<Option<TrackRecord>, IndexStoreError> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                "SELECT path, artist, title, album, duration_secs, is_live, mtime \
                 FROM tracks WHERE path = ?1",
                params![path.to_string_lossy()],
                |row| {
                    Ok(TrackRecord {
                        path: PathBuf::from(row.get::<_, String>(0)?),
                        artist: row.get(1)?,
                        title: row.get(2)?,
                        album: row.get(3)?,
                        duration_secs: row.get::<_, Option<i64>>(4)?.map(|d| d as u64),
                        is_live: row.get::<_, i64>(5)? != 0,
                        mtime: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
