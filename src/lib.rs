//! Playlist Maker Library
//!
//! Matches "Artist - Track" query lines against a local music library and
//! produces M3U playlists. This library exposes the internal modules for
//! testing and potential reuse.

pub mod config;
pub mod library;
pub mod matching;
pub mod normalize;
pub mod playlist;
pub mod prompt;
pub mod resolve;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use library::{LibraryScanner, LibrarySnapshot, LoftyReader, SqliteIndexStore};
pub use matching::{MatchOutcome, MatchParams, MatchingEngine};
pub use normalize::Normalizer;
pub use resolve::{Decision, DecisionProvider, Resolution, SkipReason};
