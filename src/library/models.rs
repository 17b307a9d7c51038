//! Data model for the on-disk music library and its in-memory snapshot.

use crate::normalize::Normalizer;
use std::path::{Path, PathBuf};

/// One audio file as persisted in the index database. Raw tag values are
/// stored as read; normalized forms are derived in memory, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub duration_secs: Option<u64>,
    pub is_live: bool,
    /// File modification time, seconds since the Unix epoch. Drives
    /// incremental rescans.
    pub mtime: i64,
}

impl TrackRecord {
    /// Filename without directory or extension, used as a secondary title
    /// source when tags disagree with the file name.
    pub fn filename_stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// A [`TrackRecord`] with its comparison forms precomputed, so the matcher
/// never re-normalizes per query.
#[derive(Debug, Clone)]
pub struct IndexedTrack {
    pub record: TrackRecord,
    pub norm_artist: String,
    pub norm_title: String,
    pub norm_stem: String,
    /// The stored title carried a parenthetical that a strip keyword
    /// removed ("remix", "radio edit", ...). Used as a late tie-break.
    pub had_stripped_parenthetical: bool,
}

impl IndexedTrack {
    pub fn from_record(record: TrackRecord, normalizer: &Normalizer) -> Self {
        let artist = normalizer.normalize(&record.artist);
        let title = normalizer.normalize(&record.title);
        let stem = normalizer.normalize(record.filename_stem());
        Self {
            norm_artist: artist.text,
            norm_title: title.text,
            norm_stem: stem.text,
            had_stripped_parenthetical: title.had_stripped_parenthetical
                || stem.had_stripped_parenthetical,
            record,
        }
    }

    pub fn path(&self) -> &Path {
        &self.record.path
    }
}

/// Immutable view of the library produced by a scan. Matching runs against
/// this, never against the database.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    tracks: Vec<IndexedTrack>,
}

impl LibrarySnapshot {
    pub fn new(mut tracks: Vec<IndexedTrack>) -> Self {
        // Deterministic iteration order regardless of scan parallelism.
        tracks.sort_by(|a, b| a.record.path.cmp(&b.record.path));
        Self { tracks }
    }

    pub fn tracks(&self) -> &[IndexedTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Per-category outcome counts for one scan, reported to the user after
/// every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Files that looked like audio but could not be read or tagged.
    pub failed: usize,
}

impl ScanStats {
    pub fn total_indexed(&self) -> usize {
        self.added + self.updated + self.unchanged
    }
}
