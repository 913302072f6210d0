//! Core data models for album reconciliation.
//!
//! Track shapes handed over by the file-scanning and provider layers, the
//! pair shape produced by every strategy, and the strategy/direction enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

// ============================================================================
// Track Models
// ============================================================================

/// Track read from the tags of an audio file on disk.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LocalTrack {
    pub file_path: String, // Unique key
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub track_number: u32, // 0 = unknown
    #[serde(default)]
    pub disc_number: Option<u32>, // None = not tagged
    #[serde(default)]
    pub duration_ms: u64, // 0 = unknown
}

impl LocalTrack {
    pub fn new(file_path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_track(mut self, track_number: u32) -> Self {
        self.track_number = track_number;
        self
    }

    pub fn with_disc(mut self, disc_number: u32) -> Self {
        self.disc_number = Some(disc_number);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Disc number, reading an untagged disc as disc 1.
    pub fn disc(&self) -> u32 {
        self.disc_number.unwrap_or(1)
    }

    /// Final path component, with either `/` or `\` as separator, so
    /// tracks scanned on another platform sort the same way.
    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit(['/', '\\'])
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.file_path)
    }
}

fn default_disc() -> u32 {
    1
}

/// Track from a metadata provider, already normalized to the canonical shape.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RemoteTrack {
    pub id: String, // Provider-unique ID
    pub name: String,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default = "default_disc")]
    pub disc_number: u32,
    #[serde(default)]
    pub duration_ms: u64, // 0 = unknown
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            track_number: 0,
            disc_number: 1,
            duration_ms: 0,
        }
    }

    pub fn with_track(mut self, track_number: u32) -> Self {
        self.track_number = track_number;
        self
    }

    pub fn with_disc(mut self, disc_number: u32) -> Self {
        self.disc_number = disc_number;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Number of distinct disc numbers across the remote tracklist.
pub fn distinct_discs(remote: &[RemoteTrack]) -> usize {
    let mut discs: Vec<u32> = remote.iter().map(|t| t.disc_number).collect();
    discs.sort_unstable();
    discs.dedup();
    discs.len()
}

// ============================================================================
// Confidence
// ============================================================================

/// Coarse classification of a 0-100 confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const MEDIUM_THRESHOLD: f64 = 45.0;
    pub const HIGH_THRESHOLD: f64 = 65.0;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Pairs
// ============================================================================

/// One element of a reconciliation result.
///
/// At least one side is always present. `confidence` and `level` only carry
/// meaning when both sides are present; one-sided pairs report 0 / Low.
#[derive(Clone, Debug)]
pub struct Pair<'a> {
    pub local: Option<&'a LocalTrack>,
    pub remote: Option<&'a RemoteTrack>,
    pub confidence: f64,
    pub level: ConfidenceLevel,
}

impl<'a> Pair<'a> {
    pub fn matched(local: &'a LocalTrack, remote: &'a RemoteTrack) -> Self {
        Self::unscored(Some(local), Some(remote))
    }

    pub fn local_only(local: &'a LocalTrack) -> Self {
        Self::unscored(Some(local), None)
    }

    pub fn remote_only(remote: &'a RemoteTrack) -> Self {
        Self::unscored(None, Some(remote))
    }

    fn unscored(local: Option<&'a LocalTrack>, remote: Option<&'a RemoteTrack>) -> Self {
        debug_assert!(local.is_some() || remote.is_some());
        Self {
            local,
            remote,
            confidence: 0.0,
            level: ConfidenceLevel::Low,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.local.is_some() && self.remote.is_some()
    }
}

/// Index-based pairing used while a strategy runs, before references are
/// resolved into [`Pair`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub local: Option<usize>,
    pub remote: Option<usize>,
}

impl Link {
    pub fn both(local: usize, remote: usize) -> Self {
        Self {
            local: Some(local),
            remote: Some(remote),
        }
    }

    pub fn local(local: usize) -> Self {
        Self {
            local: Some(local),
            remote: None,
        }
    }

    pub fn remote(remote: usize) -> Self {
        Self {
            local: None,
            remote: Some(remote),
        }
    }
}

// ============================================================================
// Strategy / Direction
// ============================================================================

/// Pairing algorithm. `Manual` is the only one that is not automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    Order,
    Filesystem,
    Name,
    Title,
    TrackNumber,
    Duration,
    Hybrid,
    Manual,
}

impl MatchStrategy {
    /// Every automatic strategy, in the order used to break full ties.
    pub const AUTOMATIC: [MatchStrategy; 7] = [
        MatchStrategy::Order,
        MatchStrategy::Filesystem,
        MatchStrategy::Name,
        MatchStrategy::Title,
        MatchStrategy::TrackNumber,
        MatchStrategy::Duration,
        MatchStrategy::Hybrid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MatchStrategy::Order => "order",
            MatchStrategy::Filesystem => "filesystem",
            MatchStrategy::Name => "name",
            MatchStrategy::Title => "title",
            MatchStrategy::TrackNumber => "track-number",
            MatchStrategy::Duration => "duration",
            MatchStrategy::Hybrid => "hybrid",
            MatchStrategy::Manual => "manual",
        }
    }

    pub fn is_automatic(self) -> bool {
        self != MatchStrategy::Manual
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        match key.as_str() {
            "order" => Ok(MatchStrategy::Order),
            "filesystem" | "fs" => Ok(MatchStrategy::Filesystem),
            "name" => Ok(MatchStrategy::Name),
            "title" => Ok(MatchStrategy::Title),
            "tracknumber" | "track" => Ok(MatchStrategy::TrackNumber),
            "duration" => Ok(MatchStrategy::Duration),
            "hybrid" => Ok(MatchStrategy::Hybrid),
            "manual" => Ok(MatchStrategy::Manual),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Which collection drives enumeration for position-based strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local files drive; surplus remote tracks trail as leftovers.
    #[default]
    Forward,
    /// Remote tracks drive; surplus local files trail as leftovers.
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" => Ok(Direction::Forward),
            "reverse" | "rev" => Ok(Direction::Reverse),
            _ => Err(ConfigError::UnknownDirection(s.to_string())),
        }
    }
}
