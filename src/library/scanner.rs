//! Filesystem scan and index reconciliation.
//!
//! A scan walks the library root, compares file mtimes against the index,
//! extracts tags only for new or changed files, and commits the resulting
//! mutations in one transaction. Tag extraction runs on the rayon pool;
//! all database writes stay on the calling thread.

use super::index_store::{IndexStoreError, SqliteIndexStore};
use super::metadata::MetadataReader;
use super::models::{IndexedTrack, LibrarySnapshot, ScanStats, TrackRecord};
use crate::normalize::Normalizer;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk library root {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error(transparent)]
    Store(#[from] IndexStoreError),
}

pub struct LibraryScanner<'a, M: MetadataReader> {
    reader: &'a M,
    normalizer: &'a Normalizer,
    /// Lowercase extensions without the leading dot.
    extensions: Vec<String>,
}

impl<'a, M: MetadataReader> LibraryScanner<'a, M> {
    pub fn new(reader: &'a M, normalizer: &'a Normalizer, extensions: &[String]) -> Self {
        Self {
            reader,
            normalizer,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Reconcile the index with the filesystem under `root` and return the
    /// resulting snapshot plus per-category counts. With `force_rescan` the
    /// index contents are discarded first and every file is re-extracted.
    pub fn scan(
        &self,
        root: &Path,
        store: &mut SqliteIndexStore,
        force_rescan: bool,
    ) -> Result<(LibrarySnapshot, ScanStats), ScanError> {
        let mut existing: HashMap<PathBuf, TrackRecord> = if force_rescan {
            store.clear()?;
            HashMap::new()
        } else {
            store
                .load()?
                .into_iter()
                .map(|r| (r.path.clone(), r))
                .collect()
        };

        let on_disk = self.enumerate(root)?;
        let on_disk_paths: HashSet<&PathBuf> = on_disk.iter().map(|(p, _)| p).collect();

        let mut stats = ScanStats::default();
        let mut unchanged: Vec<TrackRecord> = Vec::new();
        let mut to_extract: Vec<(PathBuf, i64)> = Vec::new();

        // Re-extract only when the file is strictly newer than the index;
        // a file restored from backup with an older mtime is still current.
        for (path, mtime) in &on_disk {
            match existing.get(path) {
                Some(record) if record.mtime >= *mtime => {
                    unchanged.push(record.clone());
                    stats.unchanged += 1;
                }
                _ => to_extract.push((path.clone(), *mtime)),
            }
        }

        // Removals: indexed paths no longer present on disk.
        for path in existing.keys() {
            if !on_disk_paths.contains(path) {
                debug!(path = %path.display(), "Track removed from library");
                store.remove(path);
                stats.removed += 1;
            }
        }

        // Extraction is the expensive part; fan it out.
        let extracted: Vec<_> = to_extract
            .par_iter()
            .map(|(path, mtime)| (path, *mtime, self.reader.read(path)))
            .collect();

        let mut fresh: Vec<TrackRecord> = Vec::new();
        for (path, mtime, result) in extracted {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    stats.failed += 1;
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            // Untagged files still index under their filename.
            let title = raw.title.unwrap_or_else(|| stem.clone());
            let artist = raw.artist.unwrap_or_default();
            let is_live = self
                .normalizer
                .is_live_track(&title, &stem, raw.album.as_deref());

            let record = TrackRecord {
                path: path.clone(),
                artist,
                title,
                album: raw.album,
                duration_secs: raw.duration_secs,
                is_live,
                mtime,
            };

            if existing.remove(path).is_some() {
                stats.updated += 1;
            } else {
                stats.added += 1;
            }
            store.upsert(record.clone());
            fresh.push(record);
        }

        store.commit()?;
        info!(
            added = stats.added,
            updated = stats.updated,
            removed = stats.removed,
            unchanged = stats.unchanged,
            failed = stats.failed,
            "Library scan complete"
        );

        let tracks = unchanged
            .into_iter()
            .chain(fresh)
            .map(|record| IndexedTrack::from_record(record, self.normalizer))
            .collect();
        Ok((LibrarySnapshot::new(tracks), stats))
    }

    /// Walk `root` and return every matching audio file with its mtime.
    /// Hidden files and directories are skipped; unreadable entries are
    /// logged and skipped rather than aborting the scan.
    fn enumerate(&self, root: &Path) -> Result<Vec<(PathBuf, i64)>, ScanError> {
        let mut files = Vec::new();
        let walker = walkdir::WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // A missing root is fatal; anything below it is not.
                    if e.path() == Some(root) || e.path().is_none() {
                        return Err(ScanError::Walk {
                            path: root.to_path_buf(),
                            source: e,
                        });
                    }
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_audio_extension(entry.path()) {
                continue;
            }
            let mtime = match file_mtime(entry.path()) {
                Ok(mtime) => mtime,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Cannot stat file");
                    continue;
                }
            };
            files.push((entry.into_path(), mtime));
        }
        files.sort();
        Ok(files)
    }

    fn has_audio_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == e)
            })
            .unwrap_or(false)
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn file_mtime(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}
