//! Engine configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decision thresholds
    pub thresholds: Thresholds,

    /// Scoring formula weights
    pub weights: ScoreWeights,

    /// Session lifecycle limits
    pub sessions: SessionLimits,

    /// Text-generation backend settings
    pub generator: GeneratorConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .curricula.yml
        let local_config = PathBuf::from(".curricula.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/curricula/curricula.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("curricula").join("curricula.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Decision thresholds for strategy selection and quality gating
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum template-matching score to select Simple
    pub simple: f64,

    /// Minimum graph score to select Graph
    pub graph: f64,

    /// Minimum advanced score to select Advanced
    pub advanced: f64,

    /// Overall confidence below this triggers re-routing
    #[serde(rename = "overall-confidence")]
    pub overall_confidence: f64,

    /// Decision confidence below this routes through iterative refinement
    #[serde(rename = "refinement-path")]
    pub refinement_path: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            simple: 0.85,
            graph: 0.5,
            advanced: 0.6,
            overall_confidence: 0.8,
            refinement_path: 0.7,
        }
    }
}

/// Weights for the three suitability formulas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Template matching: [mean-similarity, top-margin]
    pub template: [f64; 2],

    /// Advanced: [length, entities, dispersion, specificity]
    pub advanced: [f64; 4],

    /// Graph: [relational-density, concept-density, relational-intent]
    pub graph: [f64; 3],
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            template: [0.8, 0.2],
            advanced: [0.3, 0.25, 0.25, 0.2],
            graph: [0.4, 0.4, 0.2],
        }
    }
}

/// Session lifecycle limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Maximum simultaneously processing sessions
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Maximum refinement iterations before fail-open acceptance
    #[serde(rename = "max-refinement-iterations")]
    pub max_refinement_iterations: u32,

    /// Session time-to-live in hours
    #[serde(rename = "ttl-hours")]
    pub ttl_hours: i64,

    /// Expiry sweep interval in seconds
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            max_refinement_iterations: 3,
            ttl_hours: 24,
            sweep_interval_secs: 3600,
        }
    }
}

/// Text-generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// API base URL (OpenAI-compatible)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout_ms: 120_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.thresholds.simple, 0.85);
        assert_eq!(config.thresholds.graph, 0.5);
        assert_eq!(config.thresholds.advanced, 0.6);
        assert_eq!(config.sessions.max_concurrent, 5);
        assert_eq!(config.sessions.max_refinement_iterations, 3);
        assert_eq!(config.sessions.ttl_hours, 24);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
thresholds:
  simple: 0.9
  graph: 0.45
  advanced: 0.65
  overall-confidence: 0.75

sessions:
  max-concurrent: 3
  max-refinement-iterations: 5
  ttl-hours: 12

generator:
  model: gpt-4o
  max-tokens: 4096
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.thresholds.simple, 0.9);
        assert_eq!(config.thresholds.overall_confidence, 0.75);
        assert_eq!(config.sessions.max_concurrent, 3);
        assert_eq!(config.sessions.ttl_hours, 12);
        assert_eq!(config.generator.model, "gpt-4o");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
thresholds:
  simple: 0.8
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.thresholds.simple, 0.8);

        // Defaults for unspecified
        assert_eq!(config.thresholds.graph, 0.5);
        assert_eq!(config.weights.template, [0.8, 0.2]);
        assert_eq!(config.sessions.max_concurrent, 5);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curricula.yml");
        std::fs::write(&path, "sessions:\n  max-concurrent: 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sessions.max_concurrent, 2);
    }
}
