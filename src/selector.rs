//! Best-strategy selection.
//!
//! Runs every automatic strategy on the same album and keeps the one whose
//! matched pairs carry the highest average confidence.

use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::models::{ConfidenceLevel, Direction, LocalTrack, MatchStrategy, Pair, RemoteTrack};
use crate::strategies::Reconciler;

/// Averages closer than this are treated as equal.
const AVERAGE_EPSILON: f64 = 1e-9;

/// Aggregate quality of one strategy's pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy: MatchStrategy,
    pub average_confidence: f64, // Over matched pairs only, 0 when none
    pub matched: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unmatched_local: usize,
    pub unmatched_remote: usize,
}

impl StrategySummary {
    pub fn from_pairs(strategy: MatchStrategy, pairs: &[Pair]) -> Self {
        let mut summary = Self {
            strategy,
            average_confidence: 0.0,
            matched: 0,
            high: 0,
            medium: 0,
            low: 0,
            unmatched_local: 0,
            unmatched_remote: 0,
        };

        let mut total = 0.0;
        for pair in pairs {
            match (pair.local, pair.remote) {
                (Some(_), Some(_)) => {
                    summary.matched += 1;
                    total += pair.confidence;
                    match pair.level {
                        ConfidenceLevel::High => summary.high += 1,
                        ConfidenceLevel::Medium => summary.medium += 1,
                        ConfidenceLevel::Low => summary.low += 1,
                    }
                }
                (Some(_), None) => summary.unmatched_local += 1,
                (None, Some(_)) => summary.unmatched_remote += 1,
                (None, None) => {}
            }
        }

        if summary.matched > 0 {
            summary.average_confidence = total / summary.matched as f64;
        }
        summary
    }

    /// Ordering where `Greater` means `self` is the better strategy:
    /// higher average, then more High pairs, then fewer Low pairs.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        let diff = self.average_confidence - other.average_confidence;
        let by_average = if diff.abs() <= AVERAGE_EPSILON {
            Ordering::Equal
        } else if diff > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        };

        by_average
            .then_with(|| self.high.cmp(&other.high))
            .then_with(|| other.low.cmp(&self.low))
    }
}

/// Index of the best summary; full ties keep the earliest entry.
/// `None` only for an empty slice.
pub fn pick_best(summaries: &[StrategySummary]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, summary) in summaries.iter().enumerate() {
        match best {
            Some(b) if summary.rank_cmp(&summaries[b]) != Ordering::Greater => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Outcome of a best-strategy run.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub winner: MatchStrategy,
    /// The winning strategy's pairs, ready for reuse.
    pub pairs: Vec<Pair<'a>>,
    /// One summary per automatic strategy, in canonical order.
    pub summaries: Vec<StrategySummary>,
}

impl Reconciler {
    /// Run every automatic strategy and keep the best one.
    ///
    /// With `parallel`, strategies run on the rayon pool; the result is the
    /// same either way.
    pub fn select_best<'a>(
        &self,
        local: &'a [LocalTrack],
        remote: &'a [RemoteTrack],
        direction: Direction,
        parallel: bool,
    ) -> Selection<'a> {
        let run = |strategy: &MatchStrategy| {
            let pairs = self
                .links(*strategy, local, remote, direction)
                .map(|links| self.resolve(links, local, remote))
                .unwrap_or_default();
            (*strategy, pairs)
        };

        let strategies: &[MatchStrategy] = &MatchStrategy::AUTOMATIC;
        let mut runs: Vec<(MatchStrategy, Vec<Pair<'a>>)> = if parallel {
            strategies.par_iter().map(run).collect()
        } else {
            strategies.iter().map(run).collect()
        };

        let summaries: Vec<StrategySummary> = runs
            .iter()
            .map(|(strategy, pairs)| StrategySummary::from_pairs(*strategy, pairs))
            .collect();

        for s in &summaries {
            debug!(
                strategy = %s.strategy,
                average = s.average_confidence,
                high = s.high,
                medium = s.medium,
                low = s.low,
                "strategy summary"
            );
        }

        // AUTOMATIC is never empty, so there is always a winner
        let best = pick_best(&summaries).unwrap_or(0);
        let (winner, pairs) = runs.swap_remove(best);

        info!(
            winner = %winner,
            average = summaries[best].average_confidence,
            local = local.len(),
            remote = remote.len(),
            "selected strategy"
        );

        Selection {
            winner,
            pairs,
            summaries,
        }
    }
}
