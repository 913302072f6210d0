//! Scoring functions for album reconciliation.
//!
//! This module contains:
//! - Token-overlap (Jaccard) similarity
//! - Duration closeness
//! - The multi-factor match confidence evaluator

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::catalog::CatalogPatterns;
use crate::models::{ConfidenceLevel, LocalTrack, RemoteTrack};
use crate::normalize::tokenize;

// ============================================================================
// Weights
// ============================================================================

/// Maximum points from title similarity
pub const TITLE_WEIGHT: f64 = 50.0;

/// Maximum points from duration proximity
pub const DURATION_WEIGHT: f64 = 20.0;

/// Flat points when both sides share a catalog number
pub const CATALOG_BONUS: f64 = 30.0;

/// Durations within this fraction of the remote duration count as close
pub const DURATION_TOLERANCE: f64 = 0.10;

// ============================================================================
// Similarity
// ============================================================================

/// Token-overlap similarity between two strings (0.0 to 1.0).
///
/// Both sides without tokens are identical (1.0); exactly one side without
/// tokens scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

/// Jaccard index of two pre-tokenized sets.
pub fn jaccard(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    intersection as f64 / union as f64
}

// ============================================================================
// Duration
// ============================================================================

/// Closeness of a local duration to a remote one (0.0 to 1.0).
///
/// Linear from 1.0 at equal durations down to 0.0 at 10% of the remote
/// duration; 0.0 beyond that or when either duration is unknown (0).
pub fn duration_closeness(remote_ms: u64, local_ms: u64) -> f64 {
    if remote_ms == 0 || local_ms == 0 {
        return 0.0;
    }
    let diff = remote_ms.abs_diff(local_ms) as f64;
    let tolerance = duration_tolerance(remote_ms);
    if diff <= tolerance {
        1.0 - diff / tolerance
    } else {
        0.0
    }
}

/// Whether both durations are known and within tolerance of each other.
pub fn within_duration_tolerance(remote_ms: u64, local_ms: u64) -> bool {
    remote_ms > 0
        && local_ms > 0
        && remote_ms.abs_diff(local_ms) as f64 <= duration_tolerance(remote_ms)
}

fn duration_tolerance(remote_ms: u64) -> f64 {
    remote_ms.max(1) as f64 * DURATION_TOLERANCE
}

// ============================================================================
// Match Confidence
// ============================================================================

/// Per-component breakdown of a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceFactors {
    pub title_similarity: f64,
    pub title: f64,
    pub duration: f64,
    pub catalog: f64,
    pub remote_catalog: Option<String>,
    pub local_catalog: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchConfidence {
    pub score: f64, // 0-100
    pub level: ConfidenceLevel,
    pub factors: ConfidenceFactors,
}

/// Confidence that `local` is the file for `remote`.
///
/// - title: similarity(remote name, local title) × 50
/// - duration: up to 20, linear within 10% of the remote duration
/// - catalog: flat 30 when both titles carry the same catalog number
///
/// Level: Low < 45 ≤ Medium < 65 ≤ High.
pub fn confidence(
    remote: &RemoteTrack,
    local: &LocalTrack,
    catalog: &CatalogPatterns,
) -> MatchConfidence {
    let title_similarity = similarity(&remote.name, &local.title);
    let title = title_similarity * TITLE_WEIGHT;
    let duration = duration_closeness(remote.duration_ms, local.duration_ms) * DURATION_WEIGHT;

    let remote_catalog = catalog.extract(&remote.name);
    let local_catalog = catalog.extract(&local.title);
    let catalog_points = match (&remote_catalog, &local_catalog) {
        (Some(r), Some(l)) if r == l => CATALOG_BONUS,
        _ => 0.0,
    };

    let score = (title + duration + catalog_points).clamp(0.0, 100.0);

    MatchConfidence {
        score,
        level: ConfidenceLevel::from_score(score),
        factors: ConfidenceFactors {
            title_similarity,
            title,
            duration,
            catalog: catalog_points,
            remote_catalog,
            local_catalog,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_similarity_reflexive() {
        for s in ["", "Aria", "Prelude BWV 846", "1999", "Café del Mar", "---"] {
            assert!((similarity(s, s) - 1.0).abs() < EPS, "similarity({s:?}, {s:?}) != 1");
        }
    }

    #[test]
    fn test_similarity_symmetric() {
        let samples = ["Aria", "Aria da capo", "Prelude BWV 846", "", "Allegro BWV 846"];
        for a in samples {
            for b in samples {
                assert!((similarity(a, b) - similarity(b, a)).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_similarity_empty_cases() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn test_similarity_partial_overlap() {
        // {allegro, bwv} vs {prelude, bwv}: 1 shared of 3
        let sim = similarity("Allegro BWV 846", "Prelude BWV 846");
        assert!((sim - 1.0 / 3.0).abs() < EPS);
        assert_eq!(similarity("Aria", "Gigue"), 0.0);
        assert_eq!(similarity("The Aria", "aria the"), 1.0);
    }

    #[test]
    fn test_duration_closeness() {
        assert_eq!(duration_closeness(100_000, 100_000), 1.0);
        assert!((duration_closeness(100_000, 105_000) - 0.5).abs() < EPS);
        assert_eq!(duration_closeness(100_000, 110_000), 0.0);
        assert_eq!(duration_closeness(100_000, 111_000), 0.0);
        assert_eq!(duration_closeness(0, 100_000), 0.0);
        assert_eq!(duration_closeness(100_000, 0), 0.0);
    }

    #[test]
    fn test_within_duration_tolerance() {
        assert!(within_duration_tolerance(100_000, 110_000));
        assert!(!within_duration_tolerance(100_000, 110_001));
        assert!(!within_duration_tolerance(0, 0));
    }

    #[test]
    fn test_untagged_durations_add_nothing() {
        assert_eq!(duration_closeness(0, 0), 0.0);

        let remote = RemoteTrack::new("r1", "Aria");
        let local = LocalTrack::new("a.flac", "Aria");
        let result = confidence(&remote, &local, &CatalogPatterns::builtin());
        assert_eq!(result.factors.duration, 0.0);
        assert!((result.score - 50.0).abs() < EPS);
        assert_eq!(result.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_confidence_exact_match_is_high() {
        let remote = RemoteTrack::new("r1", "Aria").with_track(1).with_duration(121_000);
        let local = LocalTrack::new("01 Aria.flac", "Aria").with_track(1).with_duration(120_000);
        let result = confidence(&remote, &local, &CatalogPatterns::builtin());

        assert_eq!(result.factors.title, 50.0);
        assert!(result.factors.duration > 18.0 && result.factors.duration < 20.0);
        assert_eq!(result.factors.catalog, 0.0);
        assert!(result.score >= 65.0);
        assert_eq!(result.level, ConfidenceLevel::High);
    }

    #[test]
    fn test_confidence_catalog_bonus() {
        let remote = RemoteTrack::new("r1", "Prelude BWV 846");
        let local = LocalTrack::new("x.flac", "Allegro BWV 846");
        let result = confidence(&remote, &local, &CatalogPatterns::builtin());

        assert_eq!(result.factors.catalog, CATALOG_BONUS);
        assert_eq!(result.factors.remote_catalog.as_deref(), Some("BWV 846"));
        assert!((result.score - (50.0 / 3.0 + 30.0)).abs() < 1e-6);
        assert_eq!(result.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_confidence_without_catalog_patterns() {
        let remote = RemoteTrack::new("r1", "Prelude BWV 846");
        let local = LocalTrack::new("x.flac", "Allegro BWV 846");
        let result = confidence(&remote, &local, &CatalogPatterns::empty());
        assert_eq!(result.factors.catalog, 0.0);
        assert_eq!(result.level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_confidence_monotonic_in_title_similarity() {
        let catalog = CatalogPatterns::builtin();
        let remote = RemoteTrack::new("r", "Partita No 2 Chaconne").with_duration(800_000);
        let titles = ["Gigue", "Chaconne", "Partita Chaconne", "Partita No 2 Chaconne"];

        let mut last = (-1.0, -1.0);
        for title in titles {
            let local = LocalTrack::new("f.flac", title).with_duration(790_000);
            let result = confidence(&remote, &local, &catalog);
            assert!(result.factors.title_similarity >= last.0);
            assert!(result.score >= last.1);
            last = (result.factors.title_similarity, result.score);
        }
    }

    #[test]
    fn test_confidence_unknown_fields_contribute_zero() {
        let remote = RemoteTrack::new("r", "");
        let local = LocalTrack::new("f.flac", "Aria");
        let result = confidence(&remote, &local, &CatalogPatterns::builtin());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.level, ConfidenceLevel::Low);
    }
}
