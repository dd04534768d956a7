//! Standard Scaler (Z-score normalization).
//!
//! Transforms features by removing the mean and scaling to unit variance.
//!
//! The standard score of a sample `x` is calculated as:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples, and `s` is the population
//! standard deviation (ddof = 0).
//!
//! Unlike a general-purpose scaler, a constant feature is an error here: the
//! scale is later divided into the classifier weights, so `s = 0` cannot be
//! papered over with `s = 1`.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Serializable parameters for a fitted scaler, keyed by name on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Mean of each feature.
    pub mean: Vec<f64>,
    /// Population standard deviation of each feature; all strictly positive.
    pub scale: Vec<f64>,
}

impl ScalerParams {
    /// Build validated parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let params = Self { mean, scale };
        params.validate()?;
        Ok(params)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Check shapes agree and every scale is usable as a divisor.
    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: self.mean.len(),
                got: self.scale.len(),
            });
        }
        if self.mean.is_empty() {
            return Err(PipelineError::EmptyData("scaler has no features".to_string()));
        }
        if let Some(feature) = self
            .scale
            .iter()
            .position(|&s| !(s.is_finite() && s > 0.0))
        {
            return Err(PipelineError::DegenerateScale { feature });
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::artifacts::write_json(path, self)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let params: ScalerParams = crate::artifacts::read_json(path)?;
        params.validate()?;
        Ok(params)
    }
}

/// StandardScaler transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }

    /// Learn per-feature mean and population standard deviation.
    ///
    /// # Errors
    /// - [`PipelineError::EmptyData`] when `data` has no rows or columns.
    /// - [`PipelineError::DegenerateScale`] for the first constant feature.
    pub fn fit(&self, data: &Array2<f64>) -> Result<FittedStandardScaler> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(PipelineError::EmptyData(
                "Cannot fit StandardScaler on empty data".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::EmptyData("no rows to average".to_string()))?;
        let std = data.std_axis(Axis(0), 0.0);

        for (feature, column) in data.axis_iter(Axis(1)).enumerate() {
            let first = column[0];
            let constant = column.iter().all(|&v| v == first);
            if constant || std[feature] == 0.0 || !std[feature].is_finite() {
                return Err(PipelineError::DegenerateScale { feature });
            }
        }

        Ok(FittedStandardScaler { mean, scale: std })
    }

    pub fn fit_transform(&self, data: &Array2<f64>) -> Result<(FittedStandardScaler, Array2<f64>)> {
        let fitted = self.fit(data)?;
        let transformed = fitted.transform(data)?;
        Ok((fitted, transformed))
    }
}

/// Fitted StandardScaler ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl FittedStandardScaler {
    /// Get the mean values for each feature.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Get the standard deviation values for each feature.
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Returns the number of features seen during fit.
    pub fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_features(data)?;
        Ok((data - &self.mean) / &self.scale)
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_features(data)?;
        Ok(data * &self.scale + &self.mean)
    }

    pub fn params(&self) -> ScalerParams {
        ScalerParams {
            mean: self.mean.to_vec(),
            scale: self.scale.to_vec(),
        }
    }

    pub fn from_params(params: &ScalerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            mean: Array1::from(params.mean.clone()),
            scale: Array1::from(params.scale.clone()),
        })
    }

    fn check_features(&self, data: &Array2<f64>) -> Result<()> {
        if data.ncols() != self.n_features_in() {
            return Err(PipelineError::FeatureMismatch {
                expected: self.n_features_in(),
                got: data.ncols(),
            });
        }
        Ok(())
    }
}
