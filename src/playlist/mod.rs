//! Input parsing, the per-line resolution pipeline, and output writing.

use crate::library::LibrarySnapshot;
use crate::matching::{MatchOutcome, MatchParams, MatchingEngine};
use crate::normalize::Normalizer;
use crate::resolve::{
    self, DecisionProvider, Resolution, SkipReason,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// One line from the input playlist. `query` is `None` for lines that did
/// not parse; they flow through the pipeline as invalid-input skips so the
/// final report stays aligned with the input.
#[derive(Debug, Clone)]
pub struct QueryLine {
    pub number: usize,
    pub raw: String,
    pub query: Option<(String, String)>,
}

/// Parse "Artist - Title" lines. Blank lines and `#` comments are dropped;
/// anything else that lacks a separator is kept as an unparsed line.
pub fn parse_input(content: &str) -> Vec<QueryLine> {
    let mut lines = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let query = split_query(line);
        if query.is_none() {
            warn!(line = index + 1, text = line, "Skipping malformed playlist line");
        }
        lines.push(QueryLine {
            number: index + 1,
            raw: line.to_string(),
            query,
        });
    }
    lines
}

/// Split on the first spaced dash. Typed hyphens, en dashes and em dashes
/// all count; a bare dash inside a name ("AC-DC") does not.
fn split_query(line: &str) -> Option<(String, String)> {
    for separator in [" - ", " \u{2013} ", " \u{2014} "] {
        if let Some((artist, title)) = line.split_once(separator) {
            let artist = artist.trim();
            let title = title.trim();
            if !artist.is_empty() && !title.is_empty() {
                return Some((artist.to_string(), title.to_string()));
            }
            return None;
        }
    }
    None
}

/// Final state of one input line after matching and resolution.
#[derive(Debug, Clone)]
pub struct LineOutcome {
    pub line: QueryLine,
    pub resolution: Resolution,
}

/// How ambiguous and unmatched lines get settled. Automatic resolution is
/// a deliberate mode, selected up front, not a consequence of having no
/// provider wired in.
pub enum ResolutionStrategy<'p> {
    Interactive(&'p mut dyn DecisionProvider),
    Automatic,
}

pub struct PlaylistPipeline<'a> {
    normalizer: &'a Normalizer,
    snapshot: &'a LibrarySnapshot,
    params: MatchParams,
}

impl<'a> PlaylistPipeline<'a> {
    pub fn new(
        normalizer: &'a Normalizer,
        snapshot: &'a LibrarySnapshot,
        params: MatchParams,
    ) -> Self {
        Self {
            normalizer,
            snapshot,
            params,
        }
    }

    /// Resolve every line in input order. `cancel` is checked between
    /// lines; once set, remaining lines are left unprocessed and the
    /// results so far are returned.
    ///
    /// A decision-channel failure skips the line in flight, and every
    /// later line that would have needed a decision is skipped too;
    /// accepted lines still pass through. The run never substitutes an
    /// automatic pick for a decision the user was supposed to make.
    pub fn run(
        &self,
        lines: Vec<QueryLine>,
        mut strategy: ResolutionStrategy<'_>,
        cancel: &AtomicBool,
    ) -> Vec<LineOutcome> {
        let engine = MatchingEngine::new(self.snapshot, self.params);
        let mut outcomes = Vec::with_capacity(lines.len());
        let mut decisions_unavailable = false;

        for line in lines {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancelled, stopping before line {}", line.number);
                break;
            }

            let Some((artist, title)) = line.query.clone() else {
                outcomes.push(LineOutcome {
                    line,
                    resolution: Resolution::Skipped(SkipReason::InvalidInput),
                });
                continue;
            };

            let query = self.normalizer.normalize_query(&artist, &title);
            let outcome = engine.match_query(&query);
            let unmatched_reason = resolve::unmatched_reason(
                &query.artist,
                &query.title,
                self.snapshot.is_empty(),
            );

            let resolution = match (&mut strategy, &outcome) {
                (_, MatchOutcome::Accepted(_)) | (ResolutionStrategy::Automatic, _) => {
                    resolve::resolve_auto(&outcome, unmatched_reason)
                }
                (ResolutionStrategy::Interactive(_), _) if decisions_unavailable => {
                    Resolution::Skipped(SkipReason::UserSkipped)
                }
                (ResolutionStrategy::Interactive(provider), _) => {
                    let pool: Vec<_> = self
                        .snapshot
                        .tracks()
                        .iter()
                        .filter(|t| !query.artist.is_empty() && t.norm_artist == query.artist)
                        .collect();
                    match resolve::resolve(&outcome, &artist, &title, &pool, &mut **provider) {
                        Ok(resolution) => resolution,
                        Err(e) => {
                            warn!(error = %e, "Decision channel failed, skipping undecided lines");
                            decisions_unavailable = true;
                            Resolution::Skipped(SkipReason::UserSkipped)
                        }
                    }
                }
            };

            outcomes.push(LineOutcome { line, resolution });
        }
        outcomes
    }
}

/// Write the playlist in extended M3U format. Paths inside `library_root`
/// are written relative to it so the file survives a library move; anything
/// else keeps its absolute path.
pub fn write_m3u(
    output_path: &Path,
    outcomes: &[LineOutcome],
    library_root: &Path,
) -> std::io::Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(output_path)?;
    writeln!(file, "#EXTM3U")?;
    for outcome in outcomes {
        let Resolution::Selected(record) = &outcome.resolution else {
            continue;
        };
        let duration = record
            .duration_secs
            .map(|d| d as i64)
            .unwrap_or(-1);
        writeln!(file, "#EXTINF:{},{} - {}", duration, record.artist, record.title)?;
        let path = record
            .path
            .strip_prefix(library_root)
            .unwrap_or(&record.path);
        writeln!(file, "{}", path.display())?;
    }
    Ok(())
}

/// Write the companion report of lines that produced no track, one per
/// line with its reason tag. Returns the path written, or `None` when
/// every line resolved.
pub fn write_missing_report(
    missing_dir: &Path,
    playlist_stem: &str,
    outcomes: &[LineOutcome],
) -> std::io::Result<Option<PathBuf>> {
    let skipped: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match &o.resolution {
            Resolution::Skipped(reason) => Some((o, *reason)),
            Resolution::Selected(_) => None,
        })
        .collect();
    if skipped.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(missing_dir)?;
    let report_path = missing_dir.join(format!("{playlist_stem}-missing-tracks.txt"));
    let mut file = std::fs::File::create(&report_path)?;
    writeln!(file, "# {} of {} input lines had no match:", skipped.len(), outcomes.len())?;
    for (outcome, reason) in skipped {
        writeln!(
            file,
            "{} (line {}, {})",
            outcome.line.raw,
            outcome.line.number,
            reason.tag()
        )?;
    }
    Ok(Some(report_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use crate::library::{IndexedTrack, TrackRecord};
    use crate::resolve::{Decision, DecisionError, DecisionRequest};

    fn normalizer() -> Normalizer {
        Normalizer::new(&defaults::strip_keywords(), &defaults::live_album_keywords()).unwrap()
    }

    fn track(path: &str, artist: &str, title: &str, is_live: bool) -> TrackRecord {
        TrackRecord {
            path: PathBuf::from(path),
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            duration_secs: Some(240),
            is_live,
            mtime: 0,
        }
    }

    fn snapshot(records: Vec<TrackRecord>) -> LibrarySnapshot {
        let n = normalizer();
        LibrarySnapshot::new(
            records
                .into_iter()
                .map(|r| IndexedTrack::from_record(r, &n))
                .collect(),
        )
    }

    fn selected_path(outcome: &LineOutcome) -> &Path {
        match &outcome.resolution {
            Resolution::Selected(r) => &r.path,
            other => panic!("expected Selected, got {other:?}"),
        }
    }

    // ==========================================================================
    // Input parsing
    // ==========================================================================

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let lines = parse_input("# my playlist\n\nRadiohead - Karma Police\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 3);
        assert_eq!(
            lines[0].query,
            Some(("Radiohead".to_string(), "Karma Police".to_string()))
        );
    }

    #[test]
    fn test_parse_tolerates_dash_variants() {
        let lines = parse_input("Radiohead \u{2013} Karma Police\nRadiohead \u{2014} Creep\n");
        assert_eq!(lines[0].query.as_ref().unwrap().1, "Karma Police");
        assert_eq!(lines[1].query.as_ref().unwrap().1, "Creep");
    }

    #[test]
    fn test_parse_splits_on_first_separator_only() {
        let lines = parse_input("Nirvana - Something - In The Way\n");
        assert_eq!(
            lines[0].query,
            Some(("Nirvana".to_string(), "Something - In The Way".to_string()))
        );
    }

    #[test]
    fn test_malformed_lines_are_kept_as_unparsed() {
        let lines = parse_input("just a title\nRadiohead -\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].query.is_none());
        assert!(lines[1].query.is_none());
    }

    // ==========================================================================
    // Pipeline
    // ==========================================================================

    #[test]
    fn test_pipeline_resolves_lines_in_order() {
        let lib = snapshot(vec![
            track("/m/karma.mp3", "Radiohead", "Karma Police", false),
            track("/m/creep.mp3", "Radiohead", "Creep", false),
        ]);
        let n = normalizer();
        let pipeline = PlaylistPipeline::new(&n, &lib, MatchParams::default());

        let lines = parse_input(
            "Radiohead - Creep\nbad line\nRadiohead - Karma Police\nUnknown - Nothing\n",
        );
        let outcomes = pipeline.run(lines, ResolutionStrategy::Automatic, &AtomicBool::new(false));

        assert_eq!(outcomes.len(), 4);
        assert_eq!(selected_path(&outcomes[0]), Path::new("/m/creep.mp3"));
        assert!(matches!(
            outcomes[1].resolution,
            Resolution::Skipped(SkipReason::InvalidInput)
        ));
        assert_eq!(selected_path(&outcomes[2]), Path::new("/m/karma.mp3"));
        assert!(matches!(
            outcomes[3].resolution,
            Resolution::Skipped(SkipReason::BelowThreshold)
        ));
    }

    #[test]
    fn test_live_bias_end_to_end() {
        let lib = snapshot(vec![
            track("/m/karma.mp3", "Radiohead", "Karma Police", false),
            track("/m/karma_live.mp3", "Radiohead", "Karma Police (Live)", true),
        ]);
        let n = normalizer();
        let pipeline = PlaylistPipeline::new(&n, &lib, MatchParams::default());

        let lines = parse_input("Radiohead - Karma Police\nRadiohead - Karma Police (Live)\n");
        let outcomes = pipeline.run(lines, ResolutionStrategy::Automatic, &AtomicBool::new(false));

        assert_eq!(selected_path(&outcomes[0]), Path::new("/m/karma.mp3"));
        assert_eq!(selected_path(&outcomes[1]), Path::new("/m/karma_live.mp3"));
    }

    #[test]
    fn test_cancellation_stops_between_lines() {
        let lib = snapshot(vec![track("/m/karma.mp3", "Radiohead", "Karma Police", false)]);
        let n = normalizer();
        let pipeline = PlaylistPipeline::new(&n, &lib, MatchParams::default());

        let cancel = AtomicBool::new(true);
        let lines = parse_input("Radiohead - Karma Police\n");
        let outcomes = pipeline.run(lines, ResolutionStrategy::Automatic, &cancel);
        assert!(outcomes.is_empty());
    }

    struct FailingProvider;

    impl DecisionProvider for FailingProvider {
        fn decide(&mut self, _request: &DecisionRequest) -> Result<Decision, DecisionError> {
            Err(DecisionError::Cancelled)
        }
    }

    #[test]
    fn test_decision_failure_skips_later_undecided_lines() {
        // Two close artists make the "A Forest" lines ambiguous.
        let lib = snapshot(vec![
            track("/m/a.mp3", "The Cure", "A Forest", false),
            track("/m/b.mp3", "Curve", "A Forest", false),
            track("/m/karma.mp3", "Radiohead", "Karma Police", false),
        ]);
        let n = normalizer();
        let pipeline = PlaylistPipeline::new(&n, &lib, MatchParams::default());

        let mut provider = FailingProvider;
        let lines = parse_input(
            "The Cure - A Forest\nThe Cure - A Forest\nRadiohead - Karma Police\n",
        );
        let outcomes = pipeline.run(
            lines,
            ResolutionStrategy::Interactive(&mut provider),
            &AtomicBool::new(false),
        );

        // The line in flight and every later ambiguous line are skipped; no
        // top candidate is substituted for the decision the user never made.
        assert!(matches!(
            outcomes[0].resolution,
            Resolution::Skipped(SkipReason::UserSkipped)
        ));
        assert!(matches!(
            outcomes[1].resolution,
            Resolution::Skipped(SkipReason::UserSkipped)
        ));
        // Unambiguous matches still pass through.
        assert_eq!(selected_path(&outcomes[2]), Path::new("/m/karma.mp3"));
    }

    struct RandomPickProvider;

    impl DecisionProvider for RandomPickProvider {
        fn decide(&mut self, request: &DecisionRequest) -> Result<Decision, DecisionError> {
            assert!(request.candidates.is_empty());
            assert!(request.artist_pool_size > 0);
            Ok(Decision::RandomByArtist)
        }
    }

    #[test]
    fn test_interactive_random_by_artist_uses_pool() {
        let lib = snapshot(vec![
            track("/m/airbag.mp3", "Radiohead", "Airbag", false),
            track("/m/lucky.mp3", "Radiohead", "Lucky", false),
            track("/m/other.mp3", "Portishead", "Roads", false),
        ]);
        let n = normalizer();
        let pipeline = PlaylistPipeline::new(&n, &lib, MatchParams::default());

        let mut provider = RandomPickProvider;
        let lines = parse_input("Radiohead - Some Song They Do Not Have\n");
        let outcomes = pipeline.run(
            lines,
            ResolutionStrategy::Interactive(&mut provider),
            &AtomicBool::new(false),
        );

        let path = selected_path(&outcomes[0]);
        assert!(path == Path::new("/m/airbag.mp3") || path == Path::new("/m/lucky.mp3"));
    }

    // ==========================================================================
    // Output files
    // ==========================================================================

    #[test]
    fn test_m3u_contains_header_extinf_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![
            LineOutcome {
                line: QueryLine {
                    number: 1,
                    raw: "Radiohead - Karma Police".to_string(),
                    query: None,
                },
                resolution: Resolution::Selected(track(
                    "/music/r/karma.mp3",
                    "Radiohead",
                    "Karma Police",
                    false,
                )),
            },
            LineOutcome {
                line: QueryLine {
                    number: 2,
                    raw: "Elsewhere - Track".to_string(),
                    query: None,
                },
                resolution: Resolution::Selected(track(
                    "/other/track.mp3",
                    "Elsewhere",
                    "Track",
                    false,
                )),
            },
        ];

        let m3u = dir.path().join("out/list.m3u");
        write_m3u(&m3u, &outcomes, Path::new("/music")).unwrap();
        let content = std::fs::read_to_string(&m3u).unwrap();

        assert!(content.starts_with("#EXTM3U\n"));
        assert!(content.contains("#EXTINF:240,Radiohead - Karma Police\nr/karma.mp3\n"));
        // Outside the library root, the absolute path is kept.
        assert!(content.contains("#EXTINF:240,Elsewhere - Track\n/other/track.mp3\n"));
    }

    #[test]
    fn test_missing_report_lists_reason_tags() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![
            LineOutcome {
                line: QueryLine {
                    number: 4,
                    raw: "Unknown - Nothing".to_string(),
                    query: None,
                },
                resolution: Resolution::Skipped(SkipReason::BelowThreshold),
            },
            LineOutcome {
                line: QueryLine {
                    number: 7,
                    raw: "garbage line".to_string(),
                    query: None,
                },
                resolution: Resolution::Skipped(SkipReason::InvalidInput),
            },
        ];

        let path = write_missing_report(dir.path(), "list", &outcomes)
            .unwrap()
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Unknown - Nothing (line 4, below-threshold)"));
        assert!(content.contains("garbage line (line 7, invalid-input)"));
    }

    #[test]
    fn test_missing_report_omitted_when_everything_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![LineOutcome {
            line: QueryLine {
                number: 1,
                raw: "Radiohead - Karma Police".to_string(),
                query: None,
            },
            resolution: Resolution::Selected(track("/m/karma.mp3", "Radiohead", "Karma Police", false)),
        }];

        assert!(write_missing_report(dir.path(), "list", &outcomes)
            .unwrap()
            .is_none());
    }
}
