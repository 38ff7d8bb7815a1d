//! Configuration settings for concept-shift.

use crate::aggregation::AggregationParams;
use crate::alignment::ProjectionParams;
use crate::cleaning::cleaner_by_name;
use crate::error::{ConfigError, Result};
use crate::network::Granularity;
use crate::tracking::TrackParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    /// Tracking defaults for requests that omit a parameter.
    pub tracker: TrackParams,
    /// Aggregation defaults for requests that omit a parameter.
    pub aggregation: AggregationParams,
    pub projection: ProjectionParams,
    pub network: NetworkConfig,
    pub cleaning: CleaningConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("concept-shift.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("concept-shift/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;
        self.aggregation.validate()?;

        if self.models.files.trim().is_empty() {
            return Err(ConfigError::Invalid("models.files must not be empty".to_string()).into());
        }

        if let Some(name) = &self.cleaning.function {
            cleaner_by_name(name)?;
        }

        Ok(())
    }

    /// Model file pattern with `~` expanded.
    pub fn model_pattern(&self) -> String {
        shellexpand::tilde(&self.models.files).into_owned()
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Allow cross-origin requests.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors: true,
        }
    }
}

/// Embedding model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Glob pattern of word2vec files, one per time slice.
    pub files: String,
    /// Files use the binary word2vec format.
    pub binary: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            files: "word2vecModels/195[0-1]_????.w2v".to_string(),
            binary: true,
        }
    }
}

/// Network construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub granularity: Granularity,
}

/// Output cleaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Built-in cleaning function offered to requests.
    pub function: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::WeighFunction;
    use crate::alignment::ProjectionMethod;
    use crate::error::ShiftError;
    use crate::tracking::{Algorithm, BoostMethod};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert!(config.models.binary);
        assert_eq!(config.tracker.max_terms, 10);
        assert_eq!(config.tracker.word_boost, 1);
        assert_eq!(config.aggregation.years_in_interval, 5);
        assert_eq!(config.aggregation.weigh_function, WeighFunction::Gaussian);
        assert!(config.cleaning.function.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [server]
            port = 9090
            cors = false

            [models]
            files = "~/models/*.w2v"
            binary = false

            [tracker]
            max_terms = 20
            algorithm = "non-adaptive"
            boost_method = "max"

            [aggregation]
            weigh_function = "linear"
            wf_param = 0.2
            years_in_interval = 3

            [projection]
            method = "stress"

            [network]
            granularity = "slice"

            [cleaning]
            function = "alphanumeric"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert!(!config.server.cors);
        assert!(!config.models.binary);
        assert_eq!(config.tracker.max_terms, 20);
        assert_eq!(config.tracker.max_related_terms, 10);
        assert_eq!(config.tracker.algorithm, Algorithm::NonAdaptive);
        assert_eq!(config.tracker.boost_method, BoostMethod::MaxSimilarity);
        assert_eq!(config.aggregation.weigh_function, WeighFunction::Linear);
        assert_eq!(config.aggregation.words_per_year, 10);
        assert_eq!(config.projection.method, ProjectionMethod::Stress);
        assert_eq!(config.network.granularity, Granularity::Slice);
    }

    #[test]
    fn test_validate_zero_interval() {
        let toml = r#"
            [aggregation]
            years_in_interval = 0
        "#;

        let result = Config::from_str(toml);
        assert!(matches!(result, Err(ShiftError::Config(_))));
    }

    #[test]
    fn test_granularity_aliases() {
        let config = Config::from_str("[network]\ngranularity = \"Yearly\"\n").unwrap();
        assert_eq!(config.network.granularity, Granularity::Slice);
        let config = Config::from_str("[network]\ngranularity = \"aggregated\"\n").unwrap();
        assert_eq!(config.network.granularity, Granularity::Interval);
        assert!(Config::from_str("[network]\ngranularity = \"decade\"\n").is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(Config::from_str("[tracker]\nalgorithm = \"psychic\"\n").is_err());
        assert!(Config::from_str("[cleaning]\nfunction = \"nope\"\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("concept-shift.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();
        assert_eq!(Config::from_file(&path).unwrap().server.port, 8123);
        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
