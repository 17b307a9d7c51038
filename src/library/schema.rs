//! SQLite schema for the library index database.
//!
//! The index is a pure cache of filesystem state. Any validation failure is
//! grounds for a rebuild, so the schema carries no migrations; bumping the
//! version invalidates existing files.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("path", &SqlType::Text, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("duration_secs", &SqlType::Integer),
        sqlite_column!("is_live", &SqlType::Integer, non_null = true),
        sqlite_column!("mtime", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_tracks_artist", "artist")],
};

pub const INDEX_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[TRACKS_TABLE],
};
