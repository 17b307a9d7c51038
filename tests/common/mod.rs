//! Common test infrastructure
//!
//! Builds throwaway on-disk libraries with canned tag metadata, so the
//! full scan/index/match pipeline runs end to end without real audio
//! files or a tag parser.

mod fixtures;

// Public API - this is what tests import
pub use fixtures::{FakeReader, TestLibrary};
