//! Layered settings.
//!
//! Precedence (highest wins):
//! 1) Environment variables (prefix `ALBUM_RECONCILE__`, `__` as nested separator)
//! 2) Config file (TOML), when one is given or `ALBUM_RECONCILE_CONFIG` is set
//! 3) Struct defaults
//!
//! ```toml
//! [catalog]
//! builtin = true
//! patterns = [{ label = "Op", regex = '(?i)\bop\.?\s*(\d+)' }]
//!
//! [matching]
//! strategy = "auto"
//! direction = "forward"
//! parallel = true
//! ```

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::catalog::CatalogPatterns;
use crate::error::Result;
use crate::models::{Direction, MatchStrategy};

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "ALBUM_RECONCILE_CONFIG";

/// Prefix for per-key environment overrides.
pub const ENV_PREFIX: &str = "ALBUM_RECONCILE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub matching: MatchingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Keep the built-in BWV/HWV/RV/KV schemes.
    pub builtin: bool,
    /// Extra schemes, tried after the built-ins.
    pub patterns: Vec<PatternSetting>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            builtin: true,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternSetting {
    pub label: String,
    pub regex: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Strategy name, or "auto" to pick the best automatic strategy.
    pub strategy: String,
    pub direction: String,
    /// Run the selector's strategies on the rayon pool.
    pub parallel: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            strategy: "auto".to_string(),
            direction: "forward".to_string(),
            parallel: true,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file plus environment overrides.
    ///
    /// An explicit `path` must exist; a path taken from
    /// `ALBUM_RECONCILE_CONFIG` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        } else if let Some(path) = env_config_path() {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parse settings from TOML text alone, without environment overrides.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Toml))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Build the catalog pattern set, validating every configured regex.
    pub fn catalog_patterns(&self) -> Result<CatalogPatterns> {
        let mut patterns = if self.catalog.builtin {
            CatalogPatterns::builtin()
        } else {
            CatalogPatterns::empty()
        };
        for p in &self.catalog.patterns {
            patterns = patterns.with_pattern(&p.label, &p.regex)?;
        }
        Ok(patterns)
    }

    /// Configured strategy; `None` means "auto".
    pub fn strategy(&self) -> Result<Option<MatchStrategy>> {
        parse_strategy(&self.matching.strategy)
    }

    pub fn direction(&self) -> Result<Direction> {
        self.matching.direction.parse()
    }
}

/// Parse a strategy name where "auto" selects the best automatic strategy.
pub fn parse_strategy(name: &str) -> Result<Option<MatchStrategy>> {
    if name.trim().eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    name.parse().map(Some)
}

fn env_config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.catalog.builtin);
        assert_eq!(settings.strategy().unwrap(), None);
        assert_eq!(settings.direction().unwrap(), Direction::Forward);
        assert!(settings.matching.parallel);
        assert_eq!(settings.catalog_patterns().unwrap().len(), 4);
    }

    #[test]
    fn test_from_toml() {
        let settings = Settings::from_toml(
            r#"
            [catalog]
            builtin = false
            patterns = [{ label = "Op", regex = '(?i)\bop\.?\s*(\d+)' }]

            [matching]
            strategy = "hybrid"
            direction = "reverse"
            parallel = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.strategy().unwrap(), Some(MatchStrategy::Hybrid));
        assert_eq!(settings.direction().unwrap(), Direction::Reverse);
        assert!(!settings.matching.parallel);

        let catalog = settings.catalog_patterns().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.extract("Sonata Op. 110"), Some("OP 110".to_string()));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("[matching]\nstrategy = \"title\"\n").unwrap();
        assert_eq!(settings.strategy().unwrap(), Some(MatchStrategy::Title));
        assert!(settings.catalog.builtin);
        assert!(settings.matching.parallel);
    }

    #[test]
    fn test_unknown_strategy_is_error() {
        let settings = Settings::from_toml("[matching]\nstrategy = \"closest\"\n").unwrap();
        assert!(matches!(settings.strategy(), Err(ConfigError::UnknownStrategy(_))));
    }

    #[test]
    fn test_bad_catalog_regex_is_error() {
        let settings = Settings::from_toml(
            "[catalog]\npatterns = [{ label = \"D\", regex = \"D\\\\s*\\\\d+\" }]\n",
        )
        .unwrap();
        assert!(matches!(
            settings.catalog_patterns(),
            Err(ConfigError::MissingCatalogCapture(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconcile.toml");
        std::fs::write(&path, "[matching]\ndirection = \"reverse\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.direction().unwrap(), Direction::Reverse);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Settings::load(Some(&path)), Err(ConfigError::Settings(_))));
    }

    #[test]
    fn test_parse_strategy_auto() {
        assert_eq!(parse_strategy("AUTO").unwrap(), None);
        assert_eq!(parse_strategy("order").unwrap(), Some(MatchStrategy::Order));
        assert!(parse_strategy("best").is_err());
    }
}
