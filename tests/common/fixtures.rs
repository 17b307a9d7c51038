//! Test fixture creation: a temp-dir music library plus a metadata reader
//! that serves canned tags keyed by filename.

#![allow(dead_code)]

use playlist_maker::config::defaults;
use playlist_maker::library::{
    self, LibraryScanner, LibrarySnapshot, MetadataError, MetadataReader, RawMetadata, ScanStats,
    SqliteIndexStore,
};
use playlist_maker::normalize::Normalizer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub struct FakeReader {
    tags: Mutex<HashMap<String, RawMetadata>>,
    fail: Mutex<Vec<String>>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self {
            tags: Mutex::new(HashMap::new()),
            fail: Mutex::new(Vec::new()),
        }
    }

    pub fn set_tags(&self, file_name: &str, metadata: RawMetadata) {
        self.tags
            .lock()
            .unwrap()
            .insert(file_name.to_string(), metadata);
    }

    pub fn fail_on(&self, file_name: &str) {
        self.fail.lock().unwrap().push(file_name.to_string());
    }
}

impl MetadataReader for FakeReader {
    fn read(&self, path: &Path) -> Result<RawMetadata, MetadataError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if self.fail.lock().unwrap().contains(&name) {
            return Err(MetadataError::Parse("unreadable fixture".to_string()));
        }
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_default())
    }
}

/// A music library rooted in a temp directory, with its index database
/// kept outside the scanned tree.
pub struct TestLibrary {
    root: TempDir,
    index_dir: TempDir,
    pub reader: FakeReader,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            index_dir: tempfile::tempdir().unwrap(),
            reader: FakeReader::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn index_db(&self) -> PathBuf {
        self.index_dir.path().join("library_index.sqlite")
    }

    /// Create a dummy file at `rel_path` and register its tags.
    pub fn add_track(&self, rel_path: &str, artist: &str, title: &str) -> PathBuf {
        self.add_track_on_album(rel_path, artist, title, None)
    }

    pub fn add_track_on_album(
        &self,
        rel_path: &str,
        artist: &str,
        title: &str,
        album: Option<&str>,
    ) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"fixture audio").unwrap();

        let file_name = path.file_name().unwrap().to_str().unwrap();
        self.reader.set_tags(
            file_name,
            RawMetadata {
                artist: Some(artist.to_string()),
                title: Some(title.to_string()),
                album: album.map(|a| a.to_string()),
                duration_secs: Some(240),
            },
        );
        path
    }

    pub fn remove_track(&self, rel_path: &str) {
        std::fs::remove_file(self.root.path().join(rel_path)).unwrap();
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(&defaults::strip_keywords(), &defaults::live_album_keywords()).unwrap()
    }

    /// Run a full scan against the persistent index.
    pub fn scan(&self) -> (LibrarySnapshot, ScanStats) {
        self.scan_with(false)
    }

    pub fn scan_with(&self, force_rescan: bool) -> (LibrarySnapshot, ScanStats) {
        let normalizer = self.normalizer();
        let scanner = LibraryScanner::new(&self.reader, &normalizer, &defaults::extensions());
        let mut store = library::open_or_rebuild_index(&self.index_db()).unwrap();
        scanner
            .scan(self.root.path(), &mut store, force_rescan)
            .unwrap()
    }

    pub fn open_store(&self) -> SqliteIndexStore {
        library::open_or_rebuild_index(&self.index_db()).unwrap()
    }
}
