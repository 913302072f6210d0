//! Pairing strategies.
//!
//! Every strategy maps `(local, remote, direction)` to a list of [`Pair`]s
//! in which each element appears exactly once, either matched or alone.
//! Position-based strategies (Order, Filesystem, TrackNumber) honor the
//! direction; score-based ones (Name, Title, Duration, Hybrid) go through
//! the shared greedy assignment in [`crate::greedy`].

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

use crate::catalog::CatalogPatterns;
use crate::error::{ConfigError, Result};
use crate::greedy::{assign, collect_edges};
use crate::models::{
    distinct_discs, ConfidenceLevel, Direction, LocalTrack, Link, MatchStrategy, Pair, RemoteTrack,
};
use crate::normalize::{leading_number, title_from_file_name, tokenize};
use crate::refine::ManualRefiner;
use crate::scoring::{confidence, duration_closeness, jaccard, within_duration_tolerance};

// ============================================================================
// Thresholds
// ============================================================================

/// Minimum raw similarity for a Name edge
pub const NAME_MIN_SIMILARITY: f64 = 0.5;

/// Minimum (catalog-boosted) similarity for a Title edge
pub const TITLE_MIN_SIMILARITY: f64 = 0.4;

/// Similarity bonus when both titles share a catalog number
pub const TITLE_CATALOG_BONUS: f64 = 0.3;

/// Minimum combined score (0-100) for Name and Title edges
pub const TEXT_MIN_SCORE: f64 = 40.0;

/// Minimum score (0-100) for a Hybrid edge
pub const HYBRID_MIN_SCORE: f64 = 20.0;

// ============================================================================
// Reconciler
// ============================================================================

/// Runs strategies against one album's local and remote tracklists.
///
/// Holds only configuration, so one instance can serve any number of
/// albums, concurrently.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    catalog: CatalogPatterns,
}

impl Reconciler {
    pub fn new(catalog: CatalogPatterns) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogPatterns {
        &self.catalog
    }

    /// Run an automatic strategy. `Manual` is a configuration error here;
    /// use [`Reconciler::refine`] for it.
    pub fn run<'a>(
        &self,
        strategy: MatchStrategy,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
        direction: Direction,
    ) -> Result<Vec<Pair<'a>>> {
        let links = self
            .links(strategy, local, remote, direction)
            .ok_or(ConfigError::ManualRequiresRefiner)?;
        Ok(self.resolve(links, local, remote))
    }

    /// Hand `seed` to a manual refiner and score whatever it returns.
    pub fn refine<'a>(
        &self,
        refiner: &mut dyn ManualRefiner,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
        seed: Vec<Pair<'a>>,
        direction: Direction,
    ) -> Result<Vec<Pair<'a>>> {
        let refined = refiner.refine(local, remote, seed, direction)?;
        Ok(self.rescore(refined))
    }

    /// Recompute confidence for every pair with both sides present.
    pub fn rescore<'a>(&self, mut pairs: Vec<Pair<'a>>) -> Vec<Pair<'a>> {
        for pair in pairs.iter_mut() {
            match (pair.local, pair.remote) {
                (Some(local), Some(remote)) => {
                    let result = confidence(remote, local, &self.catalog);
                    pair.confidence = result.score;
                    pair.level = result.level;
                }
                _ => {
                    pair.confidence = 0.0;
                    pair.level = ConfidenceLevel::Low;
                }
            }
        }
        pairs
    }

    pub(crate) fn links(
        &self,
        strategy: MatchStrategy,
        local: &[LocalTrack],
        remote: &[RemoteTrack],
        direction: Direction,
    ) -> Option<Vec<Link>> {
        let links = match strategy {
            MatchStrategy::Order => order(local.len(), remote.len(), direction),
            MatchStrategy::Filesystem => filesystem(local, remote, direction),
            MatchStrategy::TrackNumber => track_number(local, remote, direction),
            MatchStrategy::Name => name(local, remote),
            MatchStrategy::Title => self.title(local, remote),
            MatchStrategy::Duration => duration(local, remote),
            MatchStrategy::Hybrid => hybrid(local, remote),
            MatchStrategy::Manual => return None,
        };
        debug!(
            strategy = %strategy,
            direction = %direction,
            pairs = links.len(),
            "strategy finished"
        );
        Some(links)
    }

    pub(crate) fn resolve<'a>(
        &self,
        links: Vec<Link>,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
    ) -> Vec<Pair<'a>> {
        let pairs = links
            .into_iter()
            .filter_map(|link| match (link.local, link.remote) {
                (Some(l), Some(r)) => Some(Pair::matched(&local[l], &remote[r])),
                (Some(l), None) => Some(Pair::local_only(&local[l])),
                (None, Some(r)) => Some(Pair::remote_only(&remote[r])),
                (None, None) => None,
            })
            .collect();
        self.rescore(pairs)
    }

    fn title(&self, local: &[LocalTrack], remote: &[RemoteTrack]) -> Vec<Link> {
        let local_tokens: Vec<_> = local.iter().map(|t| tokenize(&t.title)).collect();
        let remote_tokens: Vec<_> = remote.iter().map(|t| tokenize(&t.name)).collect();
        let local_catalog: Vec<_> = local.iter().map(|t| self.catalog.extract(&t.title)).collect();
        let remote_catalog: Vec<_> = remote.iter().map(|t| self.catalog.extract(&t.name)).collect();

        let edges = collect_edges(local.len(), remote.len(), |l, r| {
            let mut sim = jaccard(&remote_tokens[r], &local_tokens[l]);
            if let (Some(a), Some(b)) = (&remote_catalog[r], &local_catalog[l]) {
                if a == b {
                    sim = (sim + TITLE_CATALOG_BONUS).min(1.0);
                }
            }
            text_edge_score(
                sim,
                TITLE_MIN_SIMILARITY,
                remote[r].duration_ms,
                local[l].duration_ms,
            )
        });
        assign(local.len(), remote.len(), edges)
    }
}

// ============================================================================
// Position-based strategies
// ============================================================================

/// Pair two already-ordered index lists position by position.
///
/// The driving list is enumerated first (with `None` on the other side once
/// it runs out); the other list's surplus trails.
fn pair_by_position(local_order: &[usize], remote_order: &[usize], direction: Direction) -> Vec<Link> {
    let mut links = Vec::with_capacity(local_order.len().max(remote_order.len()));
    match direction {
        Direction::Forward => {
            for (i, &l) in local_order.iter().enumerate() {
                links.push(Link {
                    local: Some(l),
                    remote: remote_order.get(i).copied(),
                });
            }
            links.extend(remote_order.iter().skip(local_order.len()).map(|&r| Link::remote(r)));
        }
        Direction::Reverse => {
            for (i, &r) in remote_order.iter().enumerate() {
                links.push(Link {
                    local: local_order.get(i).copied(),
                    remote: Some(r),
                });
            }
            links.extend(local_order.iter().skip(remote_order.len()).map(|&l| Link::local(l)));
        }
    }
    links
}

fn order(local_len: usize, remote_len: usize, direction: Direction) -> Vec<Link> {
    let local_order: Vec<usize> = (0..local_len).collect();
    let remote_order: Vec<usize> = (0..remote_len).collect();
    pair_by_position(&local_order, &remote_order, direction)
}

/// Local indices sorted by the numeric prefix of their file names; names
/// without one sort last, by name.
fn filesystem_order(local: &[LocalTrack]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..local.len()).collect();
    indices.sort_by_cached_key(|&i| {
        let name = local[i].file_name();
        let number = leading_number(name);
        (number.is_none(), number.unwrap_or(0), name.to_lowercase())
    });
    indices
}

/// Remote indices sorted by (disc, track).
fn album_order(remote: &[RemoteTrack]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..remote.len()).collect();
    indices.sort_by_key(|&i| (remote[i].disc_number, remote[i].track_number));
    indices
}

fn filesystem(local: &[LocalTrack], remote: &[RemoteTrack], direction: Direction) -> Vec<Link> {
    pair_by_position(&filesystem_order(local), &album_order(remote), direction)
}

fn track_number(local: &[LocalTrack], remote: &[RemoteTrack], direction: Direction) -> Vec<Link> {
    if !local.iter().any(|t| t.track_number > 0) {
        debug!("no local track numbers, falling back to filesystem order");
        return filesystem(local, remote, direction);
    }

    let use_disc = local.iter().any(|t| t.disc_number.is_some()) && distinct_discs(remote) > 1;
    let local_key = |t: &LocalTrack| (if use_disc { t.disc() } else { 0 }, t.track_number);
    let remote_key = |t: &RemoteTrack| (if use_disc { t.disc_number } else { 0 }, t.track_number);

    let local_keys: Vec<(u32, u32)> = local.iter().map(local_key).collect();
    let remote_keys: Vec<(u32, u32)> = remote.iter().map(remote_key).collect();

    match direction {
        Direction::Forward => {
            let lookup = |l: usize, r: usize| Link::both(l, r);
            first_match_by_key(&local_keys, &remote_keys, lookup, Link::local, Link::remote)
        }
        Direction::Reverse => {
            let lookup = |r: usize, l: usize| Link::both(l, r);
            first_match_by_key(&remote_keys, &local_keys, lookup, Link::remote, Link::local)
        }
    }
}

/// For each driver element in order, take the first still-unused element of
/// the other side with an equal key. Keys with track number 0 never match.
/// Unused elements of the other side trail.
fn first_match_by_key(
    driver_keys: &[(u32, u32)],
    other_keys: &[(u32, u32)],
    matched: impl Fn(usize, usize) -> Link,
    driver_alone: impl Fn(usize) -> Link,
    other_alone: impl Fn(usize) -> Link,
) -> Vec<Link> {
    let mut index: FxHashMap<(u32, u32), VecDeque<usize>> = FxHashMap::default();
    for (i, key) in other_keys.iter().enumerate() {
        if key.1 > 0 {
            index.entry(*key).or_default().push_back(i);
        }
    }

    let mut used: FxHashSet<usize> = FxHashSet::default();
    let mut links = Vec::with_capacity(driver_keys.len() + other_keys.len());

    for (d, key) in driver_keys.iter().enumerate() {
        let found = if key.1 > 0 {
            index.get_mut(key).and_then(VecDeque::pop_front)
        } else {
            None
        };
        match found {
            Some(o) => {
                used.insert(o);
                links.push(matched(d, o));
            }
            None => links.push(driver_alone(d)),
        }
    }

    links.extend((0..other_keys.len()).filter(|o| !used.contains(o)).map(other_alone));
    links
}

// ============================================================================
// Score-based strategies
// ============================================================================

/// Name/Title edge score: 0.8 × similarity + 0.2 × duration closeness,
/// scaled to 0-100. `None` when the similarity or the score is too low.
fn text_edge_score(sim: f64, min_similarity: f64, remote_ms: u64, local_ms: u64) -> Option<f64> {
    if sim < min_similarity {
        return None;
    }
    let score = (sim * 0.8 + duration_closeness(remote_ms, local_ms) * 0.2) * 100.0;
    (score >= TEXT_MIN_SCORE).then_some(score)
}

fn name(local: &[LocalTrack], remote: &[RemoteTrack]) -> Vec<Link> {
    let local_tokens: Vec<_> = local
        .iter()
        .map(|t| tokenize(&title_from_file_name(&t.file_path)))
        .collect();
    let remote_tokens: Vec<_> = remote.iter().map(|t| tokenize(&t.name)).collect();

    let edges = collect_edges(local.len(), remote.len(), |l, r| {
        let sim = jaccard(&remote_tokens[r], &local_tokens[l]);
        text_edge_score(
            sim,
            NAME_MIN_SIMILARITY,
            remote[r].duration_ms,
            local[l].duration_ms,
        )
    });
    assign(local.len(), remote.len(), edges)
}

fn duration(local: &[LocalTrack], remote: &[RemoteTrack]) -> Vec<Link> {
    let local_tokens: Vec<_> = local.iter().map(|t| tokenize(&t.title)).collect();
    let remote_tokens: Vec<_> = remote.iter().map(|t| tokenize(&t.name)).collect();

    let edges = collect_edges(local.len(), remote.len(), |l, r| {
        let (remote_ms, local_ms) = (remote[r].duration_ms, local[l].duration_ms);
        if !within_duration_tolerance(remote_ms, local_ms) {
            return None;
        }
        let sim = jaccard(&remote_tokens[r], &local_tokens[l]);
        Some((duration_closeness(remote_ms, local_ms) * 0.7 + sim * 0.3) * 100.0)
    });
    assign(local.len(), remote.len(), edges)
}

fn hybrid(local: &[LocalTrack], remote: &[RemoteTrack]) -> Vec<Link> {
    let single_disc = distinct_discs(remote) <= 1;
    let local_tokens: Vec<_> = local.iter().map(|t| tokenize(&t.title)).collect();
    let remote_tokens: Vec<_> = remote.iter().map(|t| tokenize(&t.name)).collect();

    let edges = collect_edges(local.len(), remote.len(), |l, r| {
        let (lt, rt) = (&local[l], &remote[r]);
        let position_match = lt.track_number > 0
            && lt.track_number == rt.track_number
            && (single_disc || lt.disc() == rt.disc_number);

        let mut score = if position_match { 50.0 } else { 0.0 };
        score += 30.0 * jaccard(&remote_tokens[r], &local_tokens[l]);
        score += 20.0 * duration_closeness(rt.duration_ms, lt.duration_ms);

        (score >= HYBRID_MIN_SCORE).then_some(score)
    });
    assign(local.len(), remote.len(), edges)
}

// ============================================================================
// TESTS
// ============================================================================
