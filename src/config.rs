//! Configuration for the GHOST evaluator.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{GhostError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Number of leading records checked by the prediction format validation.
pub const DEFAULT_VALIDATION_SAMPLE: usize = 10;

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// How many leading records of a prediction file are format-checked.
    #[serde(default = "default_validation_sample")]
    pub validation_sample: usize,

    /// Print the abbreviated report by default.
    #[serde(default)]
    pub summary_only: bool,

    /// Directory where reports are additionally written as JSON (optional).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_validation_sample() -> usize {
    DEFAULT_VALIDATION_SAMPLE
}

fn default_image_extension() -> String {
    "jpg".to_string()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            validation_sample: default_validation_sample(),
            summary_only: false,
            output_dir: None,
        }
    }
}

/// Dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Extension appended to the image id to form the image file name.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            image_extension: default_image_extension(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
    /// Dataset settings
    pub dataset: DatasetConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    evaluation: Option<EvaluationFileSection>,
    dataset: Option<DatasetFileSection>,
}

#[derive(Debug, Deserialize)]
struct EvaluationFileSection {
    validation_sample: Option<usize>,
    summary_only: Option<bool>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DatasetFileSection {
    image_extension: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (GHOST_VALIDATION_SAMPLE, GHOST_SUMMARY_ONLY,
    ///    GHOST_OUTPUT_DIR, GHOST_IMAGE_EXTENSION)
    /// 2. Config file (~/.config/ghost-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Override values from the `GHOST_*` environment variables.
    fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    /// Override values from `GHOST_*` variables resolved through `lookup`.
    ///
    /// An unparseable `GHOST_VALIDATION_SAMPLE` and an empty `GHOST_OUTPUT_DIR`
    /// leave the current values in place.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(sample) = lookup("GHOST_VALIDATION_SAMPLE") {
            if let Ok(sample) = sample.trim().parse() {
                self.evaluation.validation_sample = sample;
            }
        }

        if let Some(summary) = lookup("GHOST_SUMMARY_ONLY") {
            self.evaluation.summary_only = parse_flag(&summary);
        }

        if let Some(dir) = lookup("GHOST_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.evaluation.output_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(extension) = lookup("GHOST_IMAGE_EXTENSION") {
            self.dataset.image_extension = extension;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| GhostError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(evaluation) = file_config.evaluation {
            if let Some(sample) = evaluation.validation_sample {
                config.evaluation.validation_sample = sample;
            }
            if let Some(summary_only) = evaluation.summary_only {
                config.evaluation.summary_only = summary_only;
            }
            if evaluation.output_dir.is_some() {
                config.evaluation.output_dir = evaluation.output_dir;
            }
        }

        if let Some(dataset) = file_config.dataset {
            if let Some(extension) = dataset.image_extension {
                config.dataset.image_extension = extension;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ghost-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate the loaded values.
    pub fn validate(&self) -> Result<()> {
        if self.evaluation.validation_sample == 0 {
            return Err(GhostError::Config(
                "validation_sample must be at least 1. Set GHOST_VALIDATION_SAMPLE or fix the config file."
                    .to_string(),
            ));
        }

        if self.dataset.image_extension.trim().is_empty() {
            return Err(GhostError::Config(
                "image_extension must not be empty.".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
