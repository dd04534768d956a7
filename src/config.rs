//! Pipeline configuration.
//!
//! Every section has a [`Default`] carrying the constants the pipeline was
//! tuned with, so a config file only needs to name what it changes:
//!
//! ```json
//! { "acquisition": { "port": "/dev/ttyUSB0", "label": 2 } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Number of analog channels per sample (3 x 6 sensor grid).
pub const NUM_FEATURES: usize = 18;

/// Number of target classes.
pub const NUM_CLASSES: usize = 4;

/// Top-level configuration, one section per concern.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub acquisition: AcquisitionConfig,
    pub paths: ArtifactPaths,
    pub training: TrainingConfig,
    pub export: ExportConfig,
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.training.validate()?;
        Ok(config)
    }
}

/// Serial link and output settings for one acquisition run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Serial device (e.g. `/dev/ttyUSB0`, `COM5`).
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; a timeout yields an empty read, not an error.
    pub timeout_ms: u64,
    /// Class id written in column 0 of every row of this run.
    pub label: u8,
    /// Sample count that triggers the one-time "target reached" notice.
    pub target_samples: u64,
    /// Raw CSV the run appends to.
    pub output: PathBuf,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            label: 0,
            target_samples: 250,
            output: PathBuf::from("raw_data/raw.csv"),
        }
    }
}

/// Locations of every persisted artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub raw_csv: PathBuf,
    pub labels: PathBuf,
    pub features: PathBuf,
    pub scaler: PathBuf,
    pub inspection_csv: PathBuf,
    pub model: PathBuf,
    pub folded: PathBuf,
    pub header: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            raw_csv: PathBuf::from("raw_data/raw.csv"),
            labels: PathBuf::from("analysis_data/labels.bin"),
            features: PathBuf::from("analysis_data/x_std.bin"),
            scaler: PathBuf::from("analysis_data/scaler_params.json"),
            inspection_csv: PathBuf::from("analysis_data/normalized_from_raw.csv"),
            model: PathBuf::from("model/model.json"),
            folded: PathBuf::from("model/folded.json"),
            header: PathBuf::from("model/logistic_params_raw.h"),
        }
    }
}

/// Hyperparameters for the split and the logistic-regression fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of each class held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
    pub n_classes: usize,
    pub max_iter: usize,
    /// Early stop when the largest gradient component falls below this.
    pub tol: f64,
    pub learning_rate: f64,
    /// Inverse L2 strength (larger = weaker penalty).
    pub inverse_regularization: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: 42,
            n_classes: NUM_CLASSES,
            max_iter: 2000,
            tol: 1e-4,
            learning_rate: 0.5,
            inverse_regularization: 1.0,
        }
    }
}

impl TrainingConfig {
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_inverse_regularization(mut self, c: f64) -> Self {
        self.inverse_regularization = c;
        self
    }

    /// Reject values the trainer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_classes < 2 {
            return Err(PipelineError::InvalidParameter(format!(
                "n_classes must be at least 2, got {}",
                self.n_classes
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.inverse_regularization > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "inverse_regularization must be positive, got {}",
                self.inverse_regularization
            )));
        }
        Ok(())
    }
}

/// Documentation embedded in the exported header.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Human-readable name per class id, in class order.
    pub class_names: Vec<String>,
    pub expected_classes: usize,
    pub expected_features: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            class_names: vec![
                "Kinoko (Right)".to_string(),
                "Kinoko (Left)".to_string(),
                "Takenoko (Right)".to_string(),
                "Takenoko (Left)".to_string(),
            ],
            expected_classes: NUM_CLASSES,
            expected_features: NUM_FEATURES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_config_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_classes, 4);
        assert_eq!(config.max_iter, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_training_config_chaining() {
        let config = TrainingConfig::default()
            .with_seed(7)
            .with_max_iter(10)
            .with_test_fraction(0.25);
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.test_fraction, 0.25);
    }

    #[test]
    fn test_training_config_rejects_bad_fraction() {
        for fraction in [0.0, 1.0, -0.1, f64::NAN] {
            let config = TrainingConfig::default().with_test_fraction(fraction);
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "acquisition": { "port": "COM5", "label": 2 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.acquisition.port, "COM5");
        assert_eq!(config.acquisition.label, 2);
        assert_eq!(config.acquisition.baud_rate, 115_200);
        assert_eq!(config.training, TrainingConfig::default());
        assert_eq!(config.export.class_names.len(), NUM_CLASSES);
    }

    #[test]
    fn test_load_missing_file() {
        let result = PipelineConfig::load("/nonexistent/pipeline.json");
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
