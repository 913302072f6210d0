//! Input and output documents for the command-line tool.
//!
//! Album files carry both tracklists as JSON; reports carry the pairing in a
//! reference-free shape that downstream tag writers can consume.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::{ConfidenceLevel, Direction, LocalTrack, MatchStrategy, Pair, RemoteTrack};
use crate::selector::StrategySummary;

// ============================================================================
// Album Input
// ============================================================================

/// One album to reconcile: `{ "local": [...], "remote": [...] }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlbumInput {
    #[serde(default)]
    pub local: Vec<LocalTrack>,
    #[serde(default)]
    pub remote: Vec<RemoteTrack>,
}

impl AlbumInput {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read album file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse album file {}", path.display()))
    }
}

// ============================================================================
// Album Report
// ============================================================================

/// Serializable form of a [`Pair`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairRecord {
    pub file_path: Option<String>,
    pub local_title: Option<String>,
    pub remote_id: Option<String>,
    pub remote_name: Option<String>,
    pub confidence: Option<f64>, // None when one side is missing
    pub level: Option<ConfidenceLevel>,
}

impl From<&Pair<'_>> for PairRecord {
    fn from(pair: &Pair<'_>) -> Self {
        let complete = pair.is_complete();
        Self {
            file_path: pair.local.map(|t| t.file_path.clone()),
            local_title: pair.local.map(|t| t.title.clone()),
            remote_id: pair.remote.map(|t| t.id.clone()),
            remote_name: pair.remote.map(|t| t.name.clone()),
            confidence: complete.then_some(pair.confidence),
            level: complete.then_some(pair.level),
        }
    }
}

/// Result of reconciling one album.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumReport {
    pub strategy: MatchStrategy,
    pub direction: Direction,
    /// True when the strategy was picked by the selector.
    pub auto_selected: bool,
    pub matched: usize,
    pub unmatched_local: usize,
    pub unmatched_remote: usize,
    pub average_confidence: f64,
    pub pairs: Vec<PairRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summaries: Vec<StrategySummary>,
}

impl AlbumReport {
    pub fn new(
        strategy: MatchStrategy,
        direction: Direction,
        pairs: &[Pair],
        summaries: Vec<StrategySummary>,
    ) -> Self {
        let summary = StrategySummary::from_pairs(strategy, pairs);
        Self {
            strategy,
            direction,
            auto_selected: !summaries.is_empty(),
            matched: summary.matched,
            unmatched_local: summary.unmatched_local,
            unmatched_remote: summary.unmatched_remote,
            average_confidence: summary.average_confidence,
            pairs: pairs.iter().map(PairRecord::from).collect(),
            summaries,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }
}

// ============================================================================
// Batch Statistics
// ============================================================================

/// Counters for a batch run over many albums.
#[derive(Default, Debug, Clone, Serialize)]
pub struct BatchStats {
    pub albums: usize,
    pub failed: usize,
    pub wins: BTreeMap<String, usize>, // strategy name -> albums won

    pub total_pairs: usize,
    pub matched: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unmatched_local: usize,
    pub unmatched_remote: usize,

    pub elapsed_seconds: f64,
}

impl BatchStats {
    pub fn record(&mut self, report: &AlbumReport) {
        self.albums += 1;
        *self.wins.entry(report.strategy.to_string()).or_default() += 1;

        self.total_pairs += report.pairs.len();
        self.matched += report.matched;
        self.unmatched_local += report.unmatched_local;
        self.unmatched_remote += report.unmatched_remote;
        for level in report.pairs.iter().filter_map(|p| p.level) {
            match level {
                ConfidenceLevel::High => self.high += 1,
                ConfidenceLevel::Medium => self.medium += 1,
                ConfidenceLevel::Low => self.low += 1,
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Percentage of matched pairs classified High.
    pub fn high_rate(&self) -> f64 {
        if self.matched == 0 {
            0.0
        } else {
            100.0 * self.high as f64 / self.matched as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
