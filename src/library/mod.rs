//! Library indexing: filesystem scanning, tag extraction, and the SQLite
//! cache that makes repeat runs cheap.

mod index_store;
mod metadata;
mod models;
mod schema;
mod scanner;

pub use index_store::{IndexStoreError, SqliteIndexStore};
pub use metadata::{LoftyReader, MetadataError, MetadataReader, RawMetadata};
pub use models::{IndexedTrack, LibrarySnapshot, ScanStats, TrackRecord};
pub use scanner::{LibraryScanner, ScanError};

use std::path::Path;
use tracing::warn;

/// Open the index at `path`, discarding and recreating it when the existing
/// file is corrupt or stamped with an incompatible schema version. The next
/// scan repopulates it from the filesystem.
pub fn open_or_rebuild_index(path: &Path) -> Result<SqliteIndexStore, IndexStoreError> {
    match SqliteIndexStore::open(path) {
        Ok(store) => Ok(store),
        Err(IndexStoreError::Corrupt(reason)) => {
            warn!(path = %path.display(), reason, "Index unusable, rebuilding from scratch");
            SqliteIndexStore::rebuild(path)
        }
        Err(e) => Err(e),
    }
}
