use anyhow::{Context, Result};
use clap::Parser;
use playlist_maker::config::{AppConfig, CliConfig, FileConfig};
use playlist_maker::library::{self, LibraryScanner, LoftyReader};
use playlist_maker::normalize::Normalizer;
use playlist_maker::playlist::{self, PlaylistPipeline, ResolutionStrategy};
use playlist_maker::prompt::PromptDecisionProvider;
use playlist_maker::resolve::Resolution;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Generate M3U playlists by matching "Artist - Track" lines against a
/// local music library.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Input text file, one "Artist - Track" per line.
    #[clap(value_parser = parse_path)]
    pub playlist_file: PathBuf,

    /// Path to a TOML config file.
    #[clap(short, long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Music library root to scan.
    #[clap(short, long, value_parser = parse_path)]
    pub library: Option<PathBuf>,

    /// Output directory for the generated M3U.
    #[clap(short, long, value_parser = parse_path)]
    pub output_dir: Option<PathBuf>,

    /// Directory for the missing-tracks report.
    #[clap(long, value_parser = parse_path)]
    pub missing_dir: Option<PathBuf>,

    /// Location of the library index database.
    #[clap(long, value_parser = parse_path)]
    pub index_db: Option<PathBuf>,

    /// Minimum match score, 0-100.
    #[clap(short, long)]
    pub threshold: Option<f64>,

    /// Penalty for live/studio mismatches, 0.0 (none) to 1.0 (disqualify).
    #[clap(long)]
    pub live_penalty: Option<f64>,

    /// Audio file extensions to index.
    #[clap(short, long, num_args = 1..)]
    pub extensions: Option<Vec<String>>,

    /// Keywords that strip parenthetical content before matching.
    #[clap(long, num_args = 1..)]
    pub strip_keywords: Option<Vec<String>>,

    /// Regex patterns marking album titles as live recordings.
    #[clap(long, num_args = 1..)]
    pub live_album_keywords: Option<Vec<String>>,

    /// Discard the index and re-extract every file.
    #[clap(long)]
    pub force_rescan: bool,

    /// Prompt for a decision on ambiguous and unmatched lines.
    #[clap(short, long)]
    pub interactive: bool,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        library: cli_args.library.clone(),
        output_dir: cli_args.output_dir.clone(),
        missing_dir: cli_args.missing_dir.clone(),
        index_db: cli_args.index_db.clone(),
        extensions: cli_args.extensions.clone(),
        threshold: cli_args.threshold,
        live_penalty: cli_args.live_penalty,
        strip_keywords: cli_args.strip_keywords.clone(),
        live_album_keywords: cli_args.live_album_keywords.clone(),
        force_rescan: cli_args.force_rescan,
        interactive: cli_args.interactive,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupt received, finishing current line");
            cancel.store(true, Ordering::SeqCst);
        })
        .context("Failed to install interrupt handler")?;
    }

    let normalizer = Normalizer::new(&config.strip_keywords, &config.live_album_keywords)
        .context("Invalid keyword pattern in configuration")?;

    let mut store = library::open_or_rebuild_index(&config.index_db)?;
    let reader = LoftyReader;
    let scanner = LibraryScanner::new(&reader, &normalizer, &config.extensions);
    info!(library = %config.library.display(), "Scanning music library");
    let (snapshot, stats) = scanner.scan(&config.library, &mut store, config.force_rescan)?;
    info!(
        tracks = snapshot.len(),
        added = stats.added,
        updated = stats.updated,
        removed = stats.removed,
        unchanged = stats.unchanged,
        failed = stats.failed,
        "Library ready"
    );

    let content = std::fs::read_to_string(&cli_args.playlist_file)
        .with_context(|| format!("Failed to read input file: {:?}", cli_args.playlist_file))?;
    let lines = playlist::parse_input(&content);
    info!(lines = lines.len(), "Resolving playlist");

    let pipeline = PlaylistPipeline::new(&normalizer, &snapshot, config.match_params);
    let mut prompt;
    let strategy = if config.interactive {
        prompt = PromptDecisionProvider::new()?;
        ResolutionStrategy::Interactive(&mut prompt)
    } else {
        ResolutionStrategy::Automatic
    };
    let outcomes = pipeline.run(lines, strategy, &cancel);

    let stem = cli_args
        .playlist_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("playlist");
    let m3u_path = config.output_dir.join(format!("{stem}.m3u"));
    playlist::write_m3u(&m3u_path, &outcomes, &config.library)
        .with_context(|| format!("Failed to write playlist: {:?}", m3u_path))?;

    let found = outcomes
        .iter()
        .filter(|o| matches!(o.resolution, Resolution::Selected(_)))
        .count();
    info!(
        playlist = %m3u_path.display(),
        found,
        total = outcomes.len(),
        "Playlist written"
    );

    if let Some(report) = playlist::write_missing_report(&config.missing_dir, stem, &outcomes)? {
        info!(report = %report.display(), missing = outcomes.len() - found, "Missing tracks listed");
    }

    Ok(())
}
