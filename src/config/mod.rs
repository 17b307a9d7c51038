pub mod defaults;
mod file_config;

pub use file_config::{FileConfig, MatchingConfig};

use crate::matching::MatchParams;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that participate in config resolution. This struct
/// mirrors the CLI flags that a TOML config file can also supply.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub library: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub missing_dir: Option<PathBuf>,
    pub index_db: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub threshold: Option<f64>,
    pub live_penalty: Option<f64>,
    pub strip_keywords: Option<Vec<String>>,
    pub live_album_keywords: Option<Vec<String>>,
    pub force_rescan: bool,
    pub interactive: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library: PathBuf,
    pub output_dir: PathBuf,
    pub missing_dir: PathBuf,
    pub index_db: PathBuf,
    pub extensions: Vec<String>,
    pub match_params: MatchParams,
    pub strip_keywords: Vec<String>,
    pub live_album_keywords: Vec<String>,
    pub force_rescan: bool,
    pub interactive: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and an optional TOML file.
    /// CLI values win over file values, file values over built-in defaults.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let matching = file.matching.clone().unwrap_or_default();

        let library = cli
            .library
            .clone()
            .or_else(|| file.library.as_ref().map(expand_home))
            .unwrap_or_else(defaults::library);
        let library = expand_home_path(&library);
        if !library.exists() {
            bail!("Music library path does not exist: {:?}", library);
        }
        if !library.is_dir() {
            bail!("Music library path is not a directory: {:?}", library);
        }

        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| file.output_dir.as_ref().map(expand_home))
            .unwrap_or_else(defaults::output_dir);
        let missing_dir = cli
            .missing_dir
            .clone()
            .or_else(|| file.missing_dir.as_ref().map(expand_home))
            .unwrap_or_else(defaults::missing_dir);

        // The index lives next to the music unless told otherwise, so one
        // library gets one cache no matter where the tool runs from.
        let index_db = cli
            .index_db
            .clone()
            .or_else(|| file.index_db.as_ref().map(expand_home))
            .unwrap_or_else(|| library.join(defaults::INDEX_DB_FILENAME));

        let extensions = cli
            .extensions
            .clone()
            .or(file.extensions)
            .unwrap_or_else(defaults::extensions);
        if extensions.is_empty() {
            bail!("At least one audio extension is required");
        }

        let threshold = cli
            .threshold
            .or(matching.threshold)
            .unwrap_or_else(defaults::threshold);
        if !(0.0..=100.0).contains(&threshold) {
            bail!("threshold must be between 0 and 100, got {}", threshold);
        }

        let live_penalty = cli
            .live_penalty
            .or(matching.live_penalty)
            .unwrap_or_else(defaults::live_penalty);
        if !(0.0..=1.0).contains(&live_penalty) {
            bail!("live_penalty must be between 0.0 and 1.0, got {}", live_penalty);
        }

        let artist_weight = matching.artist_weight.unwrap_or_else(defaults::artist_weight);
        let title_weight = matching.title_weight.unwrap_or_else(defaults::title_weight);
        if artist_weight < 0.0 || title_weight < 0.0 || artist_weight + title_weight <= 0.0 {
            bail!(
                "artist_weight and title_weight must be non-negative and sum to more than zero"
            );
        }

        let leader_gap = matching.leader_gap.unwrap_or_else(defaults::leader_gap);
        if leader_gap < 0.0 {
            bail!("leader_gap must be non-negative, got {}", leader_gap);
        }

        let strip_keywords = cli
            .strip_keywords
            .clone()
            .or(matching.strip_keywords)
            .unwrap_or_else(defaults::strip_keywords);
        let live_album_keywords = cli
            .live_album_keywords
            .clone()
            .or(matching.live_album_keywords)
            .unwrap_or_else(defaults::live_album_keywords);

        Ok(Self {
            library,
            output_dir,
            missing_dir,
            index_db,
            extensions,
            match_params: MatchParams {
                threshold,
                artist_weight,
                title_weight,
                live_penalty,
                leader_gap,
            },
            strip_keywords,
            live_album_keywords,
            force_rescan: cli.force_rescan,
            interactive: cli.interactive,
        })
    }
}

fn expand_home(s: &impl AsRef<str>) -> PathBuf {
    expand_home_path(&PathBuf::from(s.as_ref()))
}

/// Expand a leading `~` against $HOME; shells do this for CLI paths but
/// not for values read from the config file.
fn expand_home_path(path: &PathBuf) -> PathBuf {
    let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) else {
        return path.clone();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.clone(),
    }
}
