//! Folding standardization into the classifier.
//!
//! The trained model expects standardized inputs `z = (x - mean) / scale`.
//! Firmware only has raw readings, so the scaler is absorbed into the
//! weights and bias once, offline. The folded model then scores raw `x`
//! exactly as the trained model scores `z`.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::artifacts;
use crate::config::ArtifactPaths;
use crate::dataset::{RawDataset, RawSample};
use crate::error::{PipelineError, Result};
use crate::model::{Fitted, LinearClassifier, LinearParams, SerializableLinearParams};
use crate::preprocessing::ScalerParams;
use crate::trainer::TrainedModelArtifact;

/// Linear classifier operating on raw (unstandardized) inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldedModel {
    params: LinearParams,
}

impl FoldedModel {
    pub fn from_params(params: LinearParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    /// `(n_classes, n_features)`.
    pub fn weights(&self) -> &Array2<f64> {
        &self.params.weights
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.params.bias
    }

    pub fn n_classes(&self) -> usize {
        self.params.n_classes()
    }

    pub fn n_features(&self) -> usize {
        self.params.n_features()
    }

    /// Scores of one raw sample.
    pub fn scores(&self, raw: &[f64]) -> Array1<f64> {
        self.classifier().scores(raw.into())
    }

    pub fn predict(&self, raw: &[f64]) -> usize {
        crate::model::logistic::argmax(self.scores(raw).view())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        artifacts::write_json(path, self)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        artifacts::read_json(path)
    }

    fn classifier(&self) -> LinearClassifier<Fitted> {
        LinearClassifier::<Fitted>::new(self.params.clone())
    }
}

impl Serialize for FoldedModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SerializableLinearParams::from(&self.params).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FoldedModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = SerializableLinearParams::deserialize(deserializer)?;
        let params = LinearParams::try_from(repr).map_err(serde::de::Error::custom)?;
        Ok(Self { params })
    }
}

/// Absorb the scaler into the classifier parameters.
///
/// # Errors
/// - [`PipelineError::FeatureMismatch`] when the model and scaler disagree
///   on the number of features.
/// - [`PipelineError::DegenerateScale`] for a zero or non-finite scale.
pub fn fold(model: &LinearClassifier<Fitted>, scaler: &ScalerParams) -> Result<FoldedModel> {
    let n_features = model.n_features();
    if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
        return Err(PipelineError::FeatureMismatch {
            expected: n_features,
            got: scaler.scale.len().min(scaler.mean.len()),
        });
    }
    if let Some(feature) = scaler.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
        return Err(PipelineError::DegenerateScale { feature });
    }

    // score_k(z) = Σ_i W[k][i]·z_i + b[k],  z_i = (x_i - mean_i) / scale_i
    //            = Σ_i (W[k][i] / scale_i)·x_i + (b[k] - Σ_i W[k][i]·mean_i / scale_i)
    //            = Σ_i W*[k][i]·x_i + b*[k]
    // so score_k(z) == score_k*(x) for every x, up to float rounding.
    let w = model.weights();
    let mut w_star = Array2::zeros(w.raw_dim());
    let mut b_star = model.bias().clone();
    for (k, row) in w.axis_iter(Axis(0)).enumerate() {
        for (i, &w_ki) in row.iter().enumerate() {
            w_star[[k, i]] = w_ki / scaler.scale[i];
            b_star[k] -= w_ki * scaler.mean[i] / scaler.scale[i];
        }
    }

    Ok(FoldedModel {
        params: LinearParams::new(w_star, b_star)?,
    })
}

/// Largest deviation between the trained model on standardized inputs and the
/// folded model on raw inputs, over `samples`.
///
/// Fails with [`PipelineError::InvalidParameter`] when any class score differs
/// by more than `tol` relative to the score magnitude (absolute below 1).
pub fn verify_fold(
    model: &LinearClassifier<Fitted>,
    scaler: &ScalerParams,
    folded: &FoldedModel,
    samples: &[RawSample],
    tol: f64,
) -> Result<f64> {
    let mut max_diff = 0.0f64;
    for (n, sample) in samples.iter().enumerate() {
        if sample.features.len() != scaler.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: scaler.len(),
                got: sample.features.len(),
            });
        }
        let raw: Vec<f64> = sample.features.iter().map(|&v| v as f64).collect();
        let z: Vec<f64> = raw
            .iter()
            .zip(scaler.mean.iter().zip(&scaler.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();

        let expected = model.scores(z.as_slice().into());
        let actual = folded.scores(&raw);
        for (k, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            let diff = (e - a).abs();
            max_diff = max_diff.max(diff);
            if diff > tol * e.abs().max(1.0) {
                return Err(PipelineError::InvalidParameter(format!(
                    "folded score mismatch at sample {} class {}: {} vs {}",
                    n, k, e, a
                )));
            }
        }
    }
    Ok(max_diff)
}

/// File-to-file folding: `model.json` + scaler JSON in, `folded.json` out.
pub struct FoldStage;

impl FoldStage {
    /// Relative tolerance used when checking the folded model on raw rows.
    pub const VERIFY_TOLERANCE: f64 = 1e-9;

    /// Fold the trained model. When `verify_raw` is given, the score identity
    /// is checked on every row of that raw CSV before anything is written.
    pub fn run(paths: &ArtifactPaths, verify_raw: Option<&Path>) -> Result<FoldedModel> {
        log::info!(
            "fold: reading {} and {}",
            paths.model.display(),
            paths.scaler.display()
        );
        let model = TrainedModelArtifact::load_from_file(&paths.model)?.to_model()?;
        let scaler = ScalerParams::load_from_file(&paths.scaler)?;
        let folded = fold(&model, &scaler)?;

        if let Some(raw_path) = verify_raw {
            let raw = RawDataset::load(raw_path)?;
            let max_diff =
                verify_fold(&model, &scaler, &folded, raw.samples(), Self::VERIFY_TOLERANCE)?;
            log::info!(
                "fold: verified on {} raw samples, max score difference {:.3e}",
                raw.len(),
                max_diff
            );
        }

        folded.save_to_file(&paths.folded)?;
        log::info!("fold: folded model written to {}", paths.folded.display());
        Ok(folded)
    }
}
