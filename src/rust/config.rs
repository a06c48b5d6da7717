use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classifier::{DEFAULT_LABEL_OUTPUT, DEFAULT_PROBABILITY_OUTPUT};
use crate::error::PredictorError;
use crate::features::DEFAULT_LABEL_COLUMN;
use crate::runtime::RuntimeConfig;

/// Settings of a predictor, usually read from a TOML file.
///
/// ```toml
/// reference_dataset = "social_media_viral_content_dataset.csv"
/// label_column = "is_viral"
///
/// [model]
/// path = "viral_classifier.onnx"
/// sha256 = "..."
///
/// [runtime]
/// intra_threads = 2
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictorConfig {
    pub reference_dataset: Option<PathBuf>,
    pub label_column: String,
    pub delimiter: char,
    /// Check the derived schema against the manual form layout, and fall
    /// back to that layout when the reference dataset is unavailable
    pub literal_schema: bool,
    pub model: ModelConfig,
    pub runtime: RuntimeSettings,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            reference_dataset: None,
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            delimiter: ',',
            literal_schema: true,
            model: ModelConfig::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
    /// Hex sha256 the artifact must match
    pub sha256: Option<String>,
    pub label_output: String,
    pub probability_output: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            sha256: None,
            label_output: DEFAULT_LABEL_OUTPUT.to_string(),
            probability_output: DEFAULT_PROBABILITY_OUTPUT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: u8,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            inter_threads: 0,
            intra_threads: 0,
            optimization_level: 3,
        }
    }
}

impl From<&RuntimeSettings> for RuntimeConfig {
    fn from(settings: &RuntimeSettings) -> Self {
        RuntimeConfig::with_level(settings.inter_threads, settings.intra_threads, settings.optimization_level)
    }
}

impl PredictorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PredictorError> {
        let config: Self = toml::from_str(text).map_err(|e| PredictorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| PredictorError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    fn validate(&self) -> Result<(), PredictorError> {
        if !self.delimiter.is_ascii() {
            return Err(PredictorError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        if self.label_column.is_empty() {
            return Err(PredictorError::Config("label_column cannot be empty".into()));
        }
        if self.runtime.optimization_level > 3 {
            return Err(PredictorError::Config(format!(
                "optimization_level must be between 0 and 3, got {}",
                self.runtime.optimization_level
            )));
        }
        Ok(())
    }
}
