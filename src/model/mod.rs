//! Machine learning models with compile-time state safety.
//!
//! A model is either `Unfitted` (trainable: forward/backward passes, mutable
//! parameters) or `Fitted` (inference only, free from training
//! hyperparameters). Conversion happens once, via
//! [`TrainableModel::into_fitted`].

pub mod logistic;

pub use logistic::{LinearClassifier, LinearParams, LogisticRegression, SerializableLinearParams};

/// Marker for a model under training.
#[derive(Clone, Copy, Debug)]
pub struct Unfitted;

/// Marker for a model ready for inference.
#[derive(Clone, Copy, Debug)]
pub struct Fitted;

/// Training-side interface consumed by [`crate::trainer::Trainer`].
pub trait TrainableModel {
    type Input;
    type Prediction;
    type Params: ParamOps;
    type Output;

    fn forward(&self, input: &Self::Input) -> Self::Prediction;
    /// Gradients of the loss w.r.t. the parameters, given its gradient
    /// w.r.t. the model output.
    fn backward(&self, input: &Self::Input, grad_output: &Self::Prediction) -> Self::Params;
    fn params(&self) -> &Self::Params;
    fn update_params(&mut self, new_params: &Self::Params);

    fn into_fitted(self) -> Self::Output;
}

/// Arithmetic on parameter sets, used by optimizers and regularizers.
pub trait ParamOps: Clone {
    fn add(&self, other: &Self) -> Self;
    fn scale(&self, factor: f64) -> Self;
    /// Largest absolute component; used as the convergence measure.
    fn max_abs(&self) -> f64;
}

pub trait InferenceModel {
    type InputSingle: ?Sized;
    type OutputSingle;
    type InputBatch;
    type OutputBatch;

    fn predict(&self, input: &Self::InputSingle) -> Self::OutputSingle;
    fn predict_batch(&self, input: &Self::InputBatch) -> Self::OutputBatch;
}
