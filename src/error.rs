//! Configuration errors.
//!
//! Matching itself is total and never fails; the only propagated failures
//! are bad configuration values handed in by callers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Unknown match strategy: '{0}' (expected one of: order, filesystem, name, title, \
         track-number, duration, hybrid, manual)"
    )]
    UnknownStrategy(String),

    #[error("Unknown direction: '{0}' (expected 'forward' or 'reverse')")]
    UnknownDirection(String),

    #[error("Invalid catalog pattern '{label}': {source}")]
    InvalidCatalogPattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("Catalog pattern '{0}' must contain a capture group for the catalog number")]
    MissingCatalogCapture(String),

    #[error("Manual strategy needs a refiner; use Reconciler::refine")]
    ManualRequiresRefiner,

    #[error("Manual override references unknown local file: {0}")]
    UnknownLocalFile(String),

    #[error("Manual override references unknown remote track: {0}")]
    UnknownRemoteTrack(String),

    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
