//! Album track reconciliation - pairs local audio files with a remote
//! tracklist and scores every pairing.

pub mod catalog;
pub mod config;
pub mod error;
pub mod greedy;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod refine;
pub mod report;
pub mod safety;
pub mod scoring;
pub mod selector;
pub mod strategies;

pub use catalog::{CatalogPattern, CatalogPatterns};
pub use error::ConfigError;
pub use models::{ConfidenceLevel, Direction, LocalTrack, MatchStrategy, Pair, RemoteTrack};
pub use refine::{KeepSeed, ManualOverride, ManualRefiner, ScriptedRefiner};
pub use scoring::{confidence, similarity, MatchConfidence};
pub use selector::{Selection, StrategySummary};
pub use strategies::Reconciler;
