//! Text normalization for matching.
//!
//! Normalized forms are used only for comparison, never for display. The
//! same pipeline is applied to library metadata at index time and to query
//! lines at match time, so both sides collapse to the same canonical shape.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Literal `(live)` marker, tolerant of inner whitespace/punctuation:
    /// "(live)", "( Live )", "(live!)".
    static ref LIVE_PAREN: Regex = Regex::new(r"(?i)\(\s*live[\s\W]*\)").unwrap();
    static ref LEADING_ARTICLE: Regex = Regex::new(r"(?i)^(?:the|a|an)\s+").unwrap();
    static ref CONJUNCTION: Regex = Regex::new(r"(?i)\s*[&/]\s*|\s+and\s+").unwrap();
    static ref TRACK_NUMBER_PREFIX: Regex = Regex::new(r"^\s*\d{1,3}[\s.\-]+\s*").unwrap();
    static ref PARENTHETICAL: Regex = Regex::new(r"\(([^)]*)\)").unwrap();
    static ref LIVE_CONTENT: Regex = Regex::new(r"(?i)^live[\s\W]*$").unwrap();
    static ref FEAT_CONTENT: Regex = Regex::new(r"(?i)^(?:feat|ft|featuring|with)\.?\s+").unwrap();
    /// Unbracketed featuring clause, runs to end of string.
    static ref FEAT_TAIL: Regex = Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+.*$").unwrap();
    static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Strip diacritics via NFKD decomposition: "Beyoncé" -> "Beyonce".
fn fold_to_ascii(s: &str) -> String {
    s.nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

/// Result of normalizing one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Canonical comparison form: lowercase, accent-folded, conjunctions
    /// unified, feat clauses and parentheticals handled, alnum+space only.
    pub text: String,
    /// True when the original string carried a literal `(live)` marker,
    /// regardless of whether the marker text survived normalization.
    pub is_live: bool,
    /// True when a configured strip keyword removed parenthetical content.
    /// Exposed for scoring tie-breaks only.
    pub had_stripped_parenthetical: bool,
}

/// Normalized form of one "Artist - Track" query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub artist: String,
    pub title: String,
    /// Live marker present in either portion of the raw query.
    pub wants_live: bool,
}

/// Stateless text canonicalizer. Holds only the compiled keyword patterns
/// supplied through configuration.
pub struct Normalizer {
    strip_keywords: Vec<Regex>,
    live_album_keywords: Vec<Regex>,
}

impl Normalizer {
    /// Compile the configured keyword patterns. Each pattern is matched
    /// case-insensitively; invalid patterns are reported with their source.
    pub fn new(
        strip_keywords: &[String],
        live_album_keywords: &[String],
    ) -> Result<Self, regex::Error> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            strip_keywords: compile(strip_keywords)?,
            live_album_keywords: compile(live_album_keywords)?,
        })
    }

    /// Normalize a single artist/title/filename string for matching and
    /// detect the literal `(live)` marker in the original text.
    ///
    /// Deterministic and idempotent: normalizing an already-normalized
    /// string returns the same text.
    pub fn normalize(&self, raw: &str) -> Normalized {
        let is_live = LIVE_PAREN.is_match(raw);

        let mut s = fold_to_ascii(raw).to_lowercase();
        s = LEADING_ARTICLE.replace(&s, "").trim().to_string();
        s = CONJUNCTION.replace_all(&s, " ").to_string();
        s = TRACK_NUMBER_PREFIX.replace(&s, "").trim().to_string();

        let mut had_stripped_parenthetical = false;
        s = PARENTHETICAL
            .replace_all(&s, |caps: &regex::Captures| {
                let content = caps[1].trim();
                if LIVE_CONTENT.is_match(content) {
                    // Keep a bare live token so "Song (Live)" and a library
                    // title "Song live" still compare close.
                    return " live ".to_string();
                }
                if FEAT_CONTENT.is_match(content) {
                    // Featuring artists do not participate in matching.
                    return String::new();
                }
                if self.strip_keywords.iter().any(|re| re.is_match(content)) {
                    had_stripped_parenthetical = true;
                }
                String::new()
            })
            .to_string();

        s = FEAT_TAIL.replace(&s, "").to_string();
        s = s
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        s = MULTI_SPACE.replace_all(&s, " ").trim().to_string();

        Normalized {
            text: s,
            is_live,
            had_stripped_parenthetical,
        }
    }

    /// Normalize both halves of a query line and derive the live preference.
    pub fn normalize_query(&self, raw_artist: &str, raw_title: &str) -> NormalizedQuery {
        let artist = self.normalize(raw_artist);
        let title = self.normalize(raw_title);
        NormalizedQuery {
            wants_live: artist.is_live || title.is_live,
            artist: artist.text,
            title: title.text,
        }
    }

    /// Album-level live detection: a configured keyword pattern in the
    /// normalized album title, or the literal `(live)` format in the raw one.
    pub fn is_live_album(&self, album_title: &str) -> bool {
        if album_title.is_empty() {
            return false;
        }
        let normalized = self.normalize(album_title);
        normalized.is_live
            || self
                .live_album_keywords
                .iter()
                .any(|re| re.is_match(&normalized.text))
    }

    /// Track-level live detection across all the places the marker can
    /// appear: title, filename stem, or a live-flagged album.
    pub fn is_live_track(&self, title: &str, filename_stem: &str, album: Option<&str>) -> bool {
        self.normalize(title).is_live
            || self.normalize(filename_stem).is_live
            || album.map(|a| self.is_live_album(a)).unwrap_or(false)
    }
}
