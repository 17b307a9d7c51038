use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Paths (fall back to built-in defaults when absent here and on the CLI)
    pub library: Option<String>,
    pub output_dir: Option<String>,
    pub missing_dir: Option<String>,
    pub index_db: Option<String>,
    pub extensions: Option<Vec<String>>,

    pub matching: Option<MatchingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: Option<f64>,
    pub live_penalty: Option<f64>,
    pub artist_weight: Option<f64>,
    pub title_weight: Option<f64>,
    pub leader_gap: Option<f64>,
    pub strip_keywords: Option<Vec<String>>,
    pub live_album_keywords: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
