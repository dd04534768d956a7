//! # sensor-logit
//!
//! Offline pipeline that turns labeled serial sensor captures into a
//! multinomial logistic-regression classifier compiled into firmware.
//!
//! ## Stages
//!
//! 1. [`acquisition`]: serial lines → raw CSV (`label,f0..f17`).
//! 2. [`preprocessing`]: raw CSV → labels, standardized features, scaler
//!    parameters, inspection CSV.
//! 3. [`trainer`]: stratified split, softmax regression with L2, held-out
//!    [`metrics`]; writes `model.json`.
//! 4. [`folding`]: absorb the scaler into the weights so the model scores raw
//!    readings directly.
//! 5. [`export`]: C header with `LOGI_W` / `LOGI_B`.
//!
//! Stages hand off through files only (see [`config::ArtifactPaths`]), so each
//! can be rerun on its own.
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use sensor_logit::folding::fold;
//! use sensor_logit::model::{LinearClassifier, LinearParams, Fitted};
//! use sensor_logit::preprocessing::ScalerParams;
//!
//! let model = LinearClassifier::<Fitted>::new(
//!     LinearParams::new(array![[1.0, 1.0]], array![0.0]).unwrap(),
//! );
//! let scaler = ScalerParams::new(vec![2.0, 5.0], vec![1.0, 2.0]).unwrap();
//!
//! let folded = fold(&model, &scaler).unwrap();
//! assert_eq!(folded.weights(), &array![[1.0, 0.5]]);
//! assert_eq!(folded.bias(), &array![-4.5]);
//! ```

/// Serial line parsing and the acquisition loop.
pub mod acquisition;

/// Atomic artifact persistence.
pub mod artifacts;

pub mod config;

/// Raw and standardized datasets, stratified splitting.
pub mod dataset;

pub mod error;

/// C header rendering.
pub mod export;

/// Folding standardization into classifier parameters.
pub mod folding;

/// Differentiable loss functions for model training.
pub mod loss;

pub mod metrics;

/// Machine learning models with compile-time state safety.
pub mod model;

/// Optimization algorithms for parameter updates.
pub mod optimizer;

/// Feature standardization.
pub mod preprocessing;

/// Weight regularization strategies.
pub mod regularizers;

/// High-level training loop orchestration.
pub mod trainer;

pub use error::{PipelineError, Result};
