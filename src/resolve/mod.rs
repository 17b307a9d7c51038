//! Folding match outcomes into final per-line results.
//!
//! The resolver owns no UI. Interactive callers plug in a
//! [`DecisionProvider`]; the resolver builds the request, applies the one
//! decision that comes back, and never guesses on the caller's behalf.
//! Non-interactive resolution is its own explicit code path, not a
//! missing-provider fallback.

use crate::library::{IndexedTrack, TrackRecord};
use crate::matching::{MatchCandidate, MatchOutcome};
use rand::Rng;
use thiserror::Error;

/// Why a query line produced no track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Line could not be parsed into artist and title.
    InvalidInput,
    /// Nothing to score against: empty library or empty query halves.
    Unmatched,
    /// Candidates existed but none cleared the acceptance bar.
    BelowThreshold,
    /// The user (or a failed decision channel) declined the line.
    UserSkipped,
}

impl SkipReason {
    /// Stable tag carried into reports.
    pub fn tag(&self) -> &'static str {
        match self {
            SkipReason::InvalidInput => "invalid-input",
            SkipReason::Unmatched => "unmatched",
            SkipReason::BelowThreshold => "below-threshold",
            SkipReason::UserSkipped => "user-skipped",
        }
    }
}

/// Final result for one query line.
#[derive(Debug, Clone)]
pub enum Resolution {
    Selected(TrackRecord),
    Skipped(SkipReason),
}

/// Everything a decision channel needs to present the choice: the query as
/// the user wrote it, the ranked candidates (empty for an unmatched line),
/// and whether the random-by-artist escape has anything to draw from.
#[derive(Debug)]
pub struct DecisionRequest<'a> {
    pub artist: &'a str,
    pub title: &'a str,
    pub candidates: &'a [MatchCandidate],
    pub artist_pool_size: usize,
}

/// The single choice made for a [`DecisionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Zero-based index into the request's candidate list.
    Candidate(usize),
    Skip,
    /// Draw uniformly from the tracks sharing the query's normalized artist.
    RandomByArtist,
}

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision channel closed: {0}")]
    ChannelClosed(String),
    #[error("decision cancelled")]
    Cancelled,
}

/// A capability that suspends the caller and returns exactly one decision.
pub trait DecisionProvider {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Decision, DecisionError>;
}

/// Interactive resolution: accepted outcomes pass through, everything else
/// is put to the decision provider. A provider failure surfaces to the
/// caller; the line in flight must then be treated as skipped.
pub fn resolve(
    outcome: &MatchOutcome,
    artist: &str,
    title: &str,
    artist_pool: &[&IndexedTrack],
    provider: &mut dyn DecisionProvider,
) -> Result<Resolution, DecisionError> {
    let candidates: &[MatchCandidate] = match outcome {
        MatchOutcome::Accepted(candidate) => {
            return Ok(Resolution::Selected(candidate.record.clone()))
        }
        MatchOutcome::Ambiguous(candidates) => candidates,
        MatchOutcome::Unmatched => &[],
    };

    let request = DecisionRequest {
        artist,
        title,
        candidates,
        artist_pool_size: artist_pool.len(),
    };
    let decision = provider.decide(&request)?;
    Ok(apply_decision(decision, candidates, artist_pool))
}

/// Non-interactive resolution: ambiguity resolves to the top-ranked
/// candidate, an unmatched line to a tagged skip.
pub fn resolve_auto(outcome: &MatchOutcome, unmatched_reason: SkipReason) -> Resolution {
    match outcome {
        MatchOutcome::Accepted(candidate) => Resolution::Selected(candidate.record.clone()),
        MatchOutcome::Ambiguous(candidates) => {
            Resolution::Selected(candidates[0].record.clone())
        }
        MatchOutcome::Unmatched => Resolution::Skipped(unmatched_reason),
    }
}

/// Reason tag for an unmatched outcome: `unmatched` when there was nothing
/// meaningful to score, `below-threshold` when real candidates all fell
/// short.
pub fn unmatched_reason(
    norm_artist: &str,
    norm_title: &str,
    library_is_empty: bool,
) -> SkipReason {
    if library_is_empty || norm_artist.is_empty() || norm_title.is_empty() {
        SkipReason::Unmatched
    } else {
        SkipReason::BelowThreshold
    }
}

fn apply_decision(
    decision: Decision,
    candidates: &[MatchCandidate],
    artist_pool: &[&IndexedTrack],
) -> Resolution {
    match decision {
        Decision::Candidate(index) => match candidates.get(index) {
            Some(candidate) => Resolution::Selected(candidate.record.clone()),
            // Providers validate input, so an out-of-range index means the
            // channel misbehaved; treat it as a skip rather than a panic.
            None => Resolution::Skipped(SkipReason::UserSkipped),
        },
        Decision::Skip => Resolution::Skipped(SkipReason::UserSkipped),
        Decision::RandomByArtist => {
            if artist_pool.is_empty() {
                return Resolution::Skipped(SkipReason::UserSkipped);
            }
            let pick = rand::rng().random_range(0..artist_pool.len());
            Resolution::Selected(artist_pool[pick].record.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use crate::normalize::Normalizer;
    use std::path::PathBuf;

    struct ScriptedProvider {
        decisions: Vec<Result<Decision, DecisionError>>,
        requests_seen: usize,
    }

    impl ScriptedProvider {
        fn new(decisions: Vec<Result<Decision, DecisionError>>) -> Self {
            Self {
                decisions,
                requests_seen: 0,
            }
        }
    }

    impl DecisionProvider for ScriptedProvider {
        fn decide(&mut self, _request: &DecisionRequest) -> Result<Decision, DecisionError> {
            self.requests_seen += 1;
            self.decisions.remove(0)
        }
    }

    fn record(path: &str, artist: &str, title: &str) -> TrackRecord {
        TrackRecord {
            path: PathBuf::from(path),
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            duration_secs: None,
            is_live: false,
            mtime: 0,
        }
    }

    fn candidate(path: &str, title: &str, adjusted: f64) -> MatchCandidate {
        MatchCandidate::for_tests(record(path, "Radiohead", title), adjusted)
    }

    fn indexed(path: &str, artist: &str, title: &str) -> IndexedTrack {
        let n = Normalizer::new(&defaults::strip_keywords(), &defaults::live_album_keywords())
            .unwrap();
        IndexedTrack::from_record(record(path, artist, title), &n)
    }

    // ==========================================================================
    // Interactive resolution
    // ==========================================================================

    #[test]
    fn test_accepted_passes_through_without_consulting_provider() {
        let outcome = MatchOutcome::Accepted(candidate("/m/a.mp3", "Karma Police", 100.0));
        let mut provider = ScriptedProvider::new(vec![]);

        let resolution =
            resolve(&outcome, "Radiohead", "Karma Police", &[], &mut provider).unwrap();
        assert!(matches!(resolution, Resolution::Selected(r) if r.path == PathBuf::from("/m/a.mp3")));
        assert_eq!(provider.requests_seen, 0);
    }

    #[test]
    fn test_candidate_choice_selects_that_path() {
        let outcome = MatchOutcome::Ambiguous(vec![
            candidate("/m/a.mp3", "A Forest", 92.0),
            candidate("/m/b.mp3", "A Forest", 90.0),
        ]);
        let mut provider = ScriptedProvider::new(vec![Ok(Decision::Candidate(1))]);

        let resolution = resolve(&outcome, "The Cure", "A Forest", &[], &mut provider).unwrap();
        assert!(matches!(resolution, Resolution::Selected(r) if r.path == PathBuf::from("/m/b.mp3")));
    }

    #[test]
    fn test_skip_decision_tags_user_skipped() {
        let outcome = MatchOutcome::Ambiguous(vec![candidate("/m/a.mp3", "A Forest", 92.0)]);
        let mut provider = ScriptedProvider::new(vec![Ok(Decision::Skip)]);

        let resolution = resolve(&outcome, "The Cure", "A Forest", &[], &mut provider).unwrap();
        assert!(matches!(
            resolution,
            Resolution::Skipped(SkipReason::UserSkipped)
        ));
    }

    #[test]
    fn test_unmatched_still_offers_a_decision() {
        let outcome = MatchOutcome::Unmatched;
        let pool = [
            indexed("/m/a.mp3", "Radiohead", "Airbag"),
            indexed("/m/b.mp3", "Radiohead", "Lucky"),
        ];
        let pool_refs: Vec<&IndexedTrack> = pool.iter().collect();
        let mut provider = ScriptedProvider::new(vec![Ok(Decision::RandomByArtist)]);

        let resolution = resolve(
            &outcome,
            "Radiohead",
            "Karma Police",
            &pool_refs,
            &mut provider,
        )
        .unwrap();
        match resolution {
            Resolution::Selected(r) => {
                assert!(r.path == PathBuf::from("/m/a.mp3") || r.path == PathBuf::from("/m/b.mp3"))
            }
            other => panic!("expected Selected, got {other:?}"),
        }
        assert_eq!(provider.requests_seen, 1);
    }

    #[test]
    fn test_random_by_artist_with_empty_pool_degrades_to_skip() {
        let outcome = MatchOutcome::Unmatched;
        let mut provider = ScriptedProvider::new(vec![Ok(Decision::RandomByArtist)]);

        let resolution =
            resolve(&outcome, "Radiohead", "Karma Police", &[], &mut provider).unwrap();
        assert!(matches!(
            resolution,
            Resolution::Skipped(SkipReason::UserSkipped)
        ));
    }

    #[test]
    fn test_out_of_range_candidate_degrades_to_skip() {
        let outcome = MatchOutcome::Ambiguous(vec![candidate("/m/a.mp3", "A Forest", 92.0)]);
        let mut provider = ScriptedProvider::new(vec![Ok(Decision::Candidate(7))]);

        let resolution = resolve(&outcome, "The Cure", "A Forest", &[], &mut provider).unwrap();
        assert!(matches!(
            resolution,
            Resolution::Skipped(SkipReason::UserSkipped)
        ));
    }

    #[test]
    fn test_provider_failure_propagates() {
        let outcome = MatchOutcome::Ambiguous(vec![candidate("/m/a.mp3", "A Forest", 92.0)]);
        let mut provider = ScriptedProvider::new(vec![Err(DecisionError::Cancelled)]);

        assert!(resolve(&outcome, "The Cure", "A Forest", &[], &mut provider).is_err());
    }

    // ==========================================================================
    // Non-interactive resolution
    // ==========================================================================

    #[test]
    fn test_auto_resolves_ambiguous_to_top_candidate() {
        let outcome = MatchOutcome::Ambiguous(vec![
            candidate("/m/a.mp3", "A Forest", 92.0),
            candidate("/m/b.mp3", "A Forest", 90.0),
        ]);
        let resolution = resolve_auto(&outcome, SkipReason::BelowThreshold);
        assert!(matches!(resolution, Resolution::Selected(r) if r.path == PathBuf::from("/m/a.mp3")));
    }

    #[test]
    fn test_auto_resolves_unmatched_to_tagged_skip() {
        let resolution = resolve_auto(&MatchOutcome::Unmatched, SkipReason::BelowThreshold);
        assert!(matches!(
            resolution,
            Resolution::Skipped(SkipReason::BelowThreshold)
        ));
    }

    #[test]
    fn test_unmatched_reason_distinguishes_empty_inputs() {
        assert_eq!(
            unmatched_reason("radiohead", "karma police", true),
            SkipReason::Unmatched
        );
        assert_eq!(
            unmatched_reason("", "karma police", false),
            SkipReason::Unmatched
        );
        assert_eq!(
            unmatched_reason("radiohead", "karma police", false),
            SkipReason::BelowThreshold
        );
    }

    #[test]
    fn test_skip_reason_tags_are_stable() {
        assert_eq!(SkipReason::InvalidInput.tag(), "invalid-input");
        assert_eq!(SkipReason::Unmatched.tag(), "unmatched");
        assert_eq!(SkipReason::BelowThreshold.tag(), "below-threshold");
        assert_eq!(SkipReason::UserSkipped.tag(), "user-skipped");
    }
}
