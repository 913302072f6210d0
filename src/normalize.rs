//! Text normalization shared by the scorers and strategies.
//!
//! Everything here is pure: tokenization for similarity scoring, ASCII
//! folding, and helpers that pull matchable text out of file names.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Letter-led token: a letter followed by letters, digits or hyphens.
/// Applied after ASCII folding, so only ASCII classes are needed.
pub static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z][a-z0-9-]*").unwrap());

/// Matches track number prefixes like "03 - ", "Track 5 - ", "01. ", etc.
pub static TRACK_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:track\s*)?\d{1,4}\s*[-–—._]\s*").unwrap());

/// Matches disc-track prefixes like "1-03 ", "2.11 - ".
pub static DISC_TRACK_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[-.]\d{1,3}(?:\s*[-–—._]\s*|\s+)").unwrap());

/// Matches track number prefix without separator: "16 Eleanor Rigby" → "Eleanor Rigby"
pub static TRACK_NUMBER_SPACE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:0[1-9]|[1-9]\d?)\s+").unwrap());

/// Matches track number in brackets: "[01] Song", "[12] Title"
pub static TRACK_NUMBER_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\d{1,3}\]\s*").unwrap());

/// Matches audio file extensions
pub static FILE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(flac|mp3|wav|m4a|ogg|oga|opus|aac|wma|aiff?|ape|wv|alac|dsf)$").unwrap()
});

/// Leading digits of a file name, used for filesystem ordering.
pub static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)").unwrap());

// ============================================================================
// ASCII FOLDING
// ============================================================================

pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold to lowercase ASCII: strip diacritics, then transliterate the rest.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

// ============================================================================
// TOKENIZATION
// ============================================================================

/// Deduplicated, case-folded token set of `text`.
///
/// Tokens are letter-led runs of letters, digits and internal hyphens.
/// Pure-digit runs never start a token, so "BWV 846" yields only `bwv`.
pub fn tokenize(text: &str) -> FxHashSet<String> {
    let folded = fold_to_ascii(text);
    TOKEN
        .find_iter(&folded)
        .map(|m| m.as_str().trim_matches('-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// FILE NAMES
// ============================================================================

/// Matchable title text derived from a file path: the file name without its
/// audio extension and without any leading disc/track numbering.
///
/// "/rips/1-03 - Gigue.flac" → "Gigue"
pub fn title_from_file_name(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let mut s = FILE_EXTENSION.replace(name, "").into_owned();

    s = TRACK_NUMBER_BRACKET.replace(&s, "").into_owned();
    s = DISC_TRACK_PREFIX.replace(&s, "").into_owned();
    s = TRACK_NUMBER_PREFIX.replace(&s, "").into_owned();
    s = TRACK_NUMBER_SPACE_PREFIX.replace(&s, "").into_owned();

    s.replace('_', " ").trim().to_string()
}

/// Leading numeric prefix of a file name ("07 Finale.flac" → 7).
/// Returns `None` for names that do not start with a digit or whose prefix
/// does not fit in a `u64`.
pub fn leading_number(name: &str) -> Option<u64> {
    LEADING_NUMBER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ============================================================================
// TESTS
// ============================================================================
