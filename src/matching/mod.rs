//! Fuzzy matching of query lines against the library snapshot.
//!
//! Scoring is a weighted blend of artist and title similarity over
//! normalized forms, with a multiplicative penalty when a track's live
//! flag disagrees with the query's live preference. Acceptance requires
//! both clearing the score threshold and a clear lead over the runner-up;
//! everything else is surfaced for disambiguation or reported unmatched.

mod similarity;

pub use similarity::{ratio, token_set_ratio};

use crate::library::{LibrarySnapshot, TrackRecord};
use crate::normalize::NormalizedQuery;

/// Upper bound on candidates surfaced in an ambiguous outcome. Anything
/// past this is noise no one will pick from a prompt.
pub const MAX_PRESENTED_CANDIDATES: usize = 10;

/// Scoring knobs, all overridable through configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    /// Minimum adjusted score (0-100) for a track to be considered at all.
    pub threshold: f64,
    /// Weight of artist similarity in the blended score.
    pub artist_weight: f64,
    /// Weight of title similarity in the blended score.
    pub title_weight: f64,
    /// Penalty in [0, 1] for tracks whose live flag disagrees with the
    /// query's preference; the score is multiplied by `1 - live_penalty`,
    /// so 0 means no penalty and 1 disqualifies the track.
    pub live_penalty: f64,
    /// Minimum lead over the runner-up for automatic acceptance.
    pub leader_gap: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            threshold: 75.0,
            artist_weight: 0.4,
            title_weight: 0.6,
            live_penalty: 0.75,
            leader_gap: 10.0,
        }
    }
}

/// One scored library track.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub record: TrackRecord,
    /// Blended artist/title similarity before any live adjustment.
    pub score: f64,
    /// Score after the live penalty, the value thresholds apply to.
    pub adjusted_score: f64,
    /// Track live flag agrees with the query's preference.
    pub live_match: bool,
    had_stripped_parenthetical: bool,
    norm_title_len: usize,
}

impl MatchCandidate {
    #[cfg(test)]
    pub(crate) fn for_tests(record: TrackRecord, adjusted_score: f64) -> Self {
        Self {
            norm_title_len: record.title.len(),
            record,
            score: adjusted_score,
            adjusted_score,
            live_match: true,
            had_stripped_parenthetical: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// A single track cleared the threshold with a decisive lead.
    Accepted(MatchCandidate),
    /// Multiple tracks cleared the threshold without a decisive leader,
    /// best first, capped at [`MAX_PRESENTED_CANDIDATES`].
    Ambiguous(Vec<MatchCandidate>),
    /// Nothing cleared the threshold, or the query was unusable.
    Unmatched,
}

pub struct MatchingEngine<'a> {
    snapshot: &'a LibrarySnapshot,
    params: MatchParams,
}

impl<'a> MatchingEngine<'a> {
    pub fn new(snapshot: &'a LibrarySnapshot, params: MatchParams) -> Self {
        Self { snapshot, params }
    }

    /// Score every library track against `query` and classify the result.
    pub fn match_query(&self, query: &NormalizedQuery) -> MatchOutcome {
        if query.artist.is_empty() || query.title.is_empty() {
            return MatchOutcome::Unmatched;
        }

        let mut candidates = self.collect_candidates(query, true);

        // A live request with no live track above threshold falls back to
        // studio versions, un-penalized, rather than failing the line.
        if query.wants_live && !candidates.iter().any(|c| c.record.is_live) {
            candidates = self.collect_candidates(query, false);
        }

        if candidates.is_empty() {
            return MatchOutcome::Unmatched;
        }

        candidates.sort_by(|a, b| {
            b.adjusted_score
                .total_cmp(&a.adjusted_score)
                .then_with(|| b.live_match.cmp(&a.live_match))
                .then_with(|| {
                    title_len_delta(a, query)
                        .cmp(&title_len_delta(b, query))
                })
                .then_with(|| a.had_stripped_parenthetical.cmp(&b.had_stripped_parenthetical))
                .then_with(|| a.record.path.cmp(&b.record.path))
        });

        if candidates.len() == 1 {
            return MatchOutcome::Accepted(candidates.remove(0));
        }
        if candidates[0].adjusted_score - candidates[1].adjusted_score >= self.params.leader_gap {
            return MatchOutcome::Accepted(candidates.remove(0));
        }

        candidates.truncate(MAX_PRESENTED_CANDIDATES);
        MatchOutcome::Ambiguous(candidates)
    }

    fn collect_candidates(
        &self,
        query: &NormalizedQuery,
        apply_live_penalty: bool,
    ) -> Vec<MatchCandidate> {
        // Normalizing by the weight sum keeps the blend in [0, 100] for any
        // non-degenerate weight pair, so the threshold keeps its meaning.
        let weight_sum = self.params.artist_weight + self.params.title_weight;
        self.snapshot
            .tracks()
            .iter()
            .filter_map(|track| {
                let artist_sim = ratio(&query.artist, &track.norm_artist);
                // Filenames often carry the truth when tags are sloppy, so
                // the title side takes whichever source agrees better.
                let title_sim = ratio(&query.title, &track.norm_title)
                    .max(token_set_ratio(&query.title, &track.norm_stem));
                let score = (self.params.artist_weight * artist_sim
                    + self.params.title_weight * title_sim)
                    / weight_sum;

                let live_match = track.record.is_live == query.wants_live;
                let adjusted_score = if live_match || !apply_live_penalty {
                    score
                } else {
                    score * (1.0 - self.params.live_penalty)
                };

                if adjusted_score < self.params.threshold {
                    return None;
                }
                Some(MatchCandidate {
                    record: track.record.clone(),
                    score,
                    adjusted_score,
                    live_match,
                    had_stripped_parenthetical: track.had_stripped_parenthetical,
                    norm_title_len: track.norm_title.len(),
                })
            })
            .collect()
    }
}

fn title_len_delta(candidate: &MatchCandidate, query: &NormalizedQuery) -> usize {
    candidate.norm_title_len.abs_diff(query.title.len())
}
