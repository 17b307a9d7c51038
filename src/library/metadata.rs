//! Audio tag extraction behind a trait, so scanning logic stays testable
//! without real audio files on disk.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read audio tags: {0}")]
    Parse(String),
}

/// Tag values as they come out of the file, all optional. The scanner
/// decides fallbacks for missing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<u64>,
}

pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawMetadata, MetadataError>;
}

/// The real reader, backed by lofty's format probing. Handles every
/// container in the scanner's extension allowlist.
pub struct LoftyReader;

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> Result<RawMetadata, MetadataError> {
        use lofty::file::TaggedFileExt;
        use lofty::prelude::*;
        use lofty::probe::Probe;

        let tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::Parse(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::Parse(e.to_string()))?;

        let duration_secs = Some(tagged_file.properties().duration().as_secs());

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
        let (artist, title, album) = match tag {
            Some(tag) => (
                tag.artist().map(|s| s.to_string()),
                tag.title().map(|s| s.to_string()),
                tag.album().map(|s| s.to_string()),
            ),
            None => (None, None, None),
        };

        Ok(RawMetadata {
            artist,
            title,
            album,
            duration_secs,
        })
    }
}
