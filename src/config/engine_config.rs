//! Engine Configuration - operator-tunable policy constants as TOML values
//!
//! Every policy constant of the scoring, training and validation core is a
//! field here. Each struct implements `Default` with values matching the
//! established behavior, so an absent config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming the config file path.
pub const CONFIG_ENV_VAR: &str = "HEALTHCAST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "healthcast.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$HEALTHCAST_CONFIG` env var
/// 2. `./healthcast.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rule-based scoring policy
    #[serde(default)]
    pub risk: RiskConfig,

    /// Accuracy comparison policy
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Shared training hyperparameters
    #[serde(default)]
    pub training: TrainingConfig,

    /// Per-scenario network shape and data gating
    #[serde(default)]
    pub scenarios: ScenariosConfig,

    /// Model artifact storage
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HEALTHCAST_CONFIG` environment variable
    /// 2. `./healthcast.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate all policy values for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!(field = %w.field, "{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// Risk Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Predictions with risk at or below this value are dropped from ranked lists.
    #[serde(default = "default_inclusion_threshold")]
    pub inclusion_threshold: f64,
}

fn default_inclusion_threshold() -> f64 {
    crate::risk::DEFAULT_INCLUSION_THRESHOLD
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            inclusion_threshold: default_inclusion_threshold(),
        }
    }
}

// ============================================================================
// Validation Config
// ============================================================================

/// Accuracy comparison policy, including the ground-truth doctor ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Accuracy-percentage-point margin within which the result is a tie.
    #[serde(default = "default_tie_tolerance")]
    pub tie_tolerance_pct: f64,

    /// Cases one doctor can handle; ground truth uses `ceil(total_cases / cases_per_doctor)`.
    #[serde(default = "default_cases_per_doctor")]
    pub cases_per_doctor: u32,

    /// Population floor ratio; ground truth is at least `ceil(population / population_per_doctor)`.
    #[serde(default = "default_population_per_doctor")]
    pub population_per_doctor: u64,

    /// Population unit the rule-based doctor estimate scales by.
    #[serde(default = "default_rule_population_unit")]
    pub rule_population_unit: u64,
}

fn default_tie_tolerance() -> f64 { defaults::TIE_TOLERANCE_PCT }
fn default_cases_per_doctor() -> u32 { defaults::CASES_PER_DOCTOR }
fn default_population_per_doctor() -> u64 { defaults::POPULATION_PER_DOCTOR }
fn default_rule_population_unit() -> u64 { defaults::RULE_POPULATION_UNIT }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tie_tolerance_pct: default_tie_tolerance(),
            cases_per_doctor: default_cases_per_doctor(),
            population_per_doctor: default_population_per_doctor(),
            rule_population_unit: default_rule_population_unit(),
        }
    }
}

// ============================================================================
// Training Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Fraction of examples held out from weight updates, in [0, 0.5).
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,

    /// Adam base learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Seed for weight init, shuffling and synthetic data.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Added to the standard deviation when normalizing.
    #[serde(default = "default_normalization_epsilon")]
    pub normalization_epsilon: f64,

    /// Global gradient-norm clip.
    #[serde(default = "default_max_grad_norm")]
    pub max_grad_norm: f64,
}

fn default_epochs() -> usize { defaults::EPOCHS }
fn default_batch_size() -> usize { defaults::BATCH_SIZE }
fn default_validation_split() -> f64 { defaults::VALIDATION_SPLIT }
fn default_learning_rate() -> f64 { defaults::LEARNING_RATE }
fn default_seed() -> u64 { defaults::SEED }
fn default_normalization_epsilon() -> f64 { defaults::NORMALIZATION_EPSILON }
fn default_max_grad_norm() -> f64 { defaults::MAX_GRAD_NORM }

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            validation_split: default_validation_split(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
            normalization_epsilon: default_normalization_epsilon(),
            max_grad_norm: default_max_grad_norm(),
        }
    }
}

// ============================================================================
// Scenario Config
// ============================================================================

/// Network shape and minimum-data gating for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Minimum example count; training below this fails with InsufficientData.
    pub min_samples: usize,

    /// Hidden layer widths, input side first.
    pub hidden: Vec<usize>,

    /// Synthetic examples generated when real records are insufficient (0 = never).
    #[serde(default)]
    pub synthetic_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenariosConfig {
    #[serde(default = "default_admission")]
    pub admission: ScenarioConfig,

    #[serde(default = "default_disease")]
    pub disease: ScenarioConfig,

    #[serde(default = "default_government")]
    pub government: ScenarioConfig,
}

fn default_admission() -> ScenarioConfig {
    ScenarioConfig {
        min_samples: defaults::ADMISSION_MIN_SAMPLES,
        hidden: vec![32, 16],
        synthetic_samples: 0,
    }
}

fn default_disease() -> ScenarioConfig {
    ScenarioConfig {
        min_samples: defaults::DISEASE_MIN_SAMPLES,
        hidden: vec![32, 16],
        synthetic_samples: defaults::DISEASE_SYNTHETIC_SAMPLES,
    }
}

fn default_government() -> ScenarioConfig {
    ScenarioConfig {
        min_samples: defaults::GOVERNMENT_MIN_SAMPLES,
        hidden: vec![16, 8],
        synthetic_samples: defaults::GOVERNMENT_SYNTHETIC_SAMPLES,
    }
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            admission: default_admission(),
            disease: default_disease(),
            government: default_government(),
        }
    }
}

// ============================================================================
// Storage Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory for trained model artifacts.
    #[serde(default = "default_model_db_path")]
    pub model_db_path: PathBuf,
}

fn default_model_db_path() -> PathBuf {
    PathBuf::from(defaults::MODEL_DB_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            model_db_path: default_model_db_path(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_established_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.risk.inclusion_threshold, 0.25);
        assert_eq!(config.validation.tie_tolerance_pct, 2.0);
        assert_eq!(config.validation.cases_per_doctor, 50);
        assert_eq!(config.validation.population_per_doctor, 1000);
        assert_eq!(config.scenarios.admission.min_samples, 30);
        assert_eq!(config.training.normalization_epsilon, 1e-7);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
[risk]
inclusion_threshold = 0.3

[scenarios.admission]
min_samples = 60
hidden = [64, 32, 16]
"#,
        )
        .unwrap();
        assert_eq!(config.risk.inclusion_threshold, 0.3);
        assert_eq!(config.scenarios.admission.min_samples, 60);
        assert_eq!(config.scenarios.admission.hidden, vec![64, 32, 16]);
        assert_eq!(config.scenarios.disease, default_disease());
        assert_eq!(config.validation.cases_per_doctor, 50);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.training.epochs, config.training.epochs);
        assert_eq!(parsed.storage.model_db_path, config.storage.model_db_path);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
[training]
validation_split = 0.9
batch_size = 0
"#,
        );
        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("validation_split")));
                assert!(errors.iter().any(|e| e.contains("batch_size")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthcast.toml");
        let mut config = EngineConfig::default();
        config.validation.tie_tolerance_pct = 5.0;
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.validation.tie_tolerance_pct, 5.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EngineConfig::load_from_file(Path::new("/nonexistent/healthcast.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }
}
