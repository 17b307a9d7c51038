//! Built-in defaults, the bottom layer of config resolution.

use std::path::PathBuf;

pub const INDEX_DB_FILENAME: &str = "library_index.sqlite";

pub fn threshold() -> f64 {
    75.0
}

pub fn live_penalty() -> f64 {
    0.75
}

pub fn artist_weight() -> f64 {
    0.4
}

pub fn title_weight() -> f64 {
    0.6
}

pub fn leader_gap() -> f64 {
    10.0
}

pub fn library() -> PathBuf {
    PathBuf::from("~/music")
}

pub fn output_dir() -> PathBuf {
    PathBuf::from("./playlists")
}

pub fn missing_dir() -> PathBuf {
    PathBuf::from("./missing-tracks")
}

pub fn extensions() -> Vec<String> {
    [".mp3", ".flac", ".ogg", ".m4a"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parenthetical content containing any of these is stripped before
/// comparison, and the strip is remembered as a ranking signal.
pub fn strip_keywords() -> Vec<String> {
    [
        "remix",
        "radio edit",
        "edit",
        "version",
        "mix",
        "acoustic",
        "mono",
        "stereo",
        "reprise",
        "instrumental",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Album titles matching any of these patterns flag every track on the
/// album as live.
pub fn live_album_keywords() -> Vec<String> {
    [
        r"\blive\b",
        r"\bunplugged\b",
        r"\bconcert\b",
        "live at",
        "live in",
        "live from",
        "official bootleg",
        "acoustic sessions",
        r"peel session[s]?",
        r"radio session[s]?",
        "mtv unplugged",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
