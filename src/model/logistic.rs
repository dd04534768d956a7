//! Multinomial logistic regression.
//!
//! - [`LogisticRegression`] = `LinearClassifier<Unfitted>`: used during training.
//! - [`LinearClassifier<Fitted>`]: inference-only, serializable predictor.
//!
//! Class scores are `score_k(x) = W[k]·x + b[k]` with `W` of shape
//! `(n_classes, n_features)`; the predicted class is the argmax of the
//! scores, ties going to the lowest class index.

use std::marker::PhantomData;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
pub use crate::model::{Fitted, InferenceModel, ParamOps, TrainableModel, Unfitted};

/// Weight matrix and bias vector of a linear classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearParams {
    /// `(n_classes, n_features)`.
    pub weights: Array2<f64>,
    /// `(n_classes,)`.
    pub bias: Array1<f64>,
}

impl LinearParams {
    pub fn zeros(n_classes: usize, n_features: usize) -> Self {
        Self {
            weights: Array2::zeros((n_classes, n_features)),
            bias: Array1::zeros(n_classes),
        }
    }

    /// Build parameters, checking that `bias` has one entry per weight row.
    pub fn new(weights: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        if weights.nrows() != bias.len() {
            return Err(PipelineError::ShapeMismatch {
                what: "linear params",
                expected: format!("bias of length {}", weights.nrows()),
                got: format!("bias of length {}", bias.len()),
            });
        }
        Ok(Self { weights, bias })
    }

    pub fn n_classes(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.weights.ncols()
    }
}

impl ParamOps for LinearParams {
    fn add(&self, other: &Self) -> Self {
        Self {
            weights: &self.weights + &other.weights,
            bias: &self.bias + &other.bias,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            weights: &self.weights * factor,
            bias: &self.bias * factor,
        }
    }

    fn max_abs(&self) -> f64 {
        self.weights
            .iter()
            .chain(self.bias.iter())
            .fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }
}

/// Serializable representation of linear classifier parameters.
///
/// Rows of `weights` are classes, so the JSON reads the same way as the
/// exported C array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializableLinearParams {
    pub n_classes: usize,
    pub n_features: usize,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl From<&LinearParams> for SerializableLinearParams {
    fn from(params: &LinearParams) -> Self {
        Self {
            n_classes: params.n_classes(),
            n_features: params.n_features(),
            weights: params.weights.outer_iter().map(|row| row.to_vec()).collect(),
            bias: params.bias.to_vec(),
        }
    }
}

impl TryFrom<SerializableLinearParams> for LinearParams {
    type Error = PipelineError;

    fn try_from(value: SerializableLinearParams) -> Result<Self> {
        let expected = format!("{} x {}", value.n_classes, value.n_features);
        if value.weights.len() != value.n_classes
            || value.weights.iter().any(|row| row.len() != value.n_features)
        {
            return Err(PipelineError::ShapeMismatch {
                what: "weight matrix",
                expected,
                got: format!(
                    "{} rows with lengths {:?}",
                    value.weights.len(),
                    value.weights.iter().map(Vec::len).collect::<Vec<_>>()
                ),
            });
        }
        if value.bias.len() != value.n_classes {
            return Err(PipelineError::ShapeMismatch {
                what: "bias vector",
                expected: value.n_classes.to_string(),
                got: value.bias.len().to_string(),
            });
        }

        let flat: Vec<f64> = value.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((value.n_classes, value.n_features), flat)
            .map_err(|e| PipelineError::ShapeMismatch {
                what: "weight matrix",
                expected,
                got: e.to_string(),
            })?;
        LinearParams::new(weights, Array1::from(value.bias))
    }
}

/// A linear classifier with state encoded at the type level.
///
/// - When `S = Unfitted`: implements [`TrainableModel`]: used during training.
/// - When `S = Fitted`: implements [`InferenceModel`]: used for prediction.
#[derive(Clone, Debug)]
pub struct LinearClassifier<S> {
    params: LinearParams,
    _state: PhantomData<S>,
}

/// Alias for an **unfitted** multinomial logistic regression.
pub type LogisticRegression = LinearClassifier<Unfitted>;

impl LogisticRegression {
    /// Zero-initialized model.
    pub fn new(n_classes: usize, n_features: usize) -> Self {
        Self::from_params(LinearParams::zeros(n_classes, n_features))
    }

    /// Constructs a model from explicit parameters (e.g., for testing or warm start).
    pub fn from_params(params: LinearParams) -> Self {
        Self {
            params,
            _state: PhantomData,
        }
    }
}

impl TrainableModel for LogisticRegression {
    type Input = Array2<f64>;
    /// Logits, `(n_samples, n_classes)`.
    type Prediction = Array2<f64>;
    type Params = LinearParams;
    type Output = LinearClassifier<Fitted>;

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.params.weights.t()) + &self.params.bias
    }

    fn backward(&self, x: &Array2<f64>, grad_output: &Array2<f64>) -> LinearParams {
        LinearParams {
            weights: grad_output.t().dot(x),
            bias: grad_output.sum_axis(Axis(0)),
        }
    }

    fn params(&self) -> &LinearParams {
        &self.params
    }

    fn update_params(&mut self, new_params: &LinearParams) {
        self.params = new_params.clone();
    }

    fn into_fitted(self) -> LinearClassifier<Fitted> {
        LinearClassifier::<Fitted>::new(self.params)
    }
}

impl LinearClassifier<Fitted> {
    /// Creates a fitted classifier from trained parameters.
    pub fn new(params: LinearParams) -> Self {
        Self {
            params,
            _state: PhantomData,
        }
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }

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

    /// Per-class scores `W·x + b` for one sample.
    pub fn scores(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.params.weights.dot(&x) + &self.params.bias
    }

    pub fn to_serializable(&self) -> SerializableLinearParams {
        (&self.params).into()
    }

    pub fn from_serializable(value: SerializableLinearParams) -> Result<Self> {
        Ok(Self::new(LinearParams::try_from(value)?))
    }
}

impl InferenceModel for LinearClassifier<Fitted> {
    type InputSingle = [f64];
    type OutputSingle = usize;
    type InputBatch = Array2<f64>;
    type OutputBatch = Array1<usize>;

    fn predict(&self, input: &[f64]) -> usize {
        argmax(self.scores(ArrayView1::from(input)).view())
    }

    fn predict_batch(&self, input: &Array2<f64>) -> Array1<usize> {
        let scores = input.dot(&self.params.weights.t()) + &self.params.bias;
        scores.outer_iter().map(argmax).collect()
    }
}

/// Index of the largest score; the first one wins a tie.
pub fn argmax(scores: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (k, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // === ParamOps Tests ===

    #[test]
    fn test_param_ops_add() {
        let p1 = LinearParams::new(array![[1.0, 2.0]], array![0.5]).unwrap();
        let p2 = LinearParams::new(array![[0.5, 1.0]], array![0.5]).unwrap();

        let result = p1.add(&p2);

        assert_eq!(result.weights, array![[1.5, 3.0]]);
        assert_eq!(result.bias, array![1.0]);
    }

    #[test]
    fn test_param_ops_scale() {
        let p = LinearParams::new(array![[2.0, -4.0], [1.0, 0.0]], array![1.0, -2.0]).unwrap();

        let result = p.scale(0.5);

        assert_eq!(result.weights, array![[1.0, -2.0], [0.5, 0.0]]);
        assert_eq!(result.bias, array![0.5, -1.0]);
    }

    #[test]
    fn test_param_ops_max_abs() {
        let p = LinearParams::new(array![[0.1, -0.7]], array![0.3]).unwrap();
        assert_eq!(p.max_abs(), 0.7);
    }

    #[test]
    fn test_linear_params_rejects_bias_length() {
        let result = LinearParams::new(Array2::zeros((3, 2)), Array1::zeros(2));
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    // === LogisticRegression (Unfitted) Tests ===

    #[test]
    fn test_logistic_regression_new_zero_initialized() {
        let model = LogisticRegression::new(4, 18);
        assert_eq!(model.params().weights.dim(), (4, 18));
        assert!(model.params().weights.iter().all(|&w| w == 0.0));
        assert_eq!(model.params().bias.len(), 4);
    }

    #[test]
    fn test_forward_correctness() {
        let params = LinearParams::new(array![[1.0, 0.0], [0.0, 2.0]], array![0.5, -1.0]).unwrap();
        let model = LogisticRegression::from_params(params);

        let x = array![[1.0, 1.0], [2.0, 3.0]];
        let logits = model.forward(&x);

        assert_eq!(logits, array![[1.5, 1.0], [2.5, 5.0]]);
    }

    #[test]
    fn test_backward_shapes_and_values() {
        let model = LogisticRegression::new(2, 3);
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let grad = array![[1.0, 0.0], [0.0, 1.0]];

        let grads = model.backward(&x, &grad);

        // dW = grad^T @ x, db = column sums of grad
        assert_eq!(grads.weights, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(grads.bias, array![1.0, 1.0]);
    }

    #[test]
    fn test_update_params_and_into_fitted() {
        let mut model = LogisticRegression::new(2, 1);
        let new_params = LinearParams::new(array![[1.0], [-1.0]], array![0.0, 0.0]).unwrap();
        model.update_params(&new_params);

        let fitted = model.into_fitted();
        assert_eq!(fitted.params(), &new_params);
        assert_eq!(fitted.predict(&[3.0]), 0);
        assert_eq!(fitted.predict(&[-3.0]), 1);
    }

    // === Fitted Tests ===

    #[test]
    fn test_scores() {
        let fitted = LinearClassifier::<Fitted>::new(
            LinearParams::new(array![[1.0, 1.0], [2.0, -1.0]], array![0.0, 1.0]).unwrap(),
        );
        let scores = fitted.scores(array![3.0, 7.0].view());
        assert_eq!(scores, array![10.0, 0.0]);
    }

    #[test]
    fn test_argmax_ties_break_low() {
        assert_eq!(argmax(array![1.0, 3.0, 3.0, 2.0].view()), 1);
        assert_eq!(argmax(array![0.0, 0.0, 0.0].view()), 0);
        assert_eq!(argmax(array![-5.0, -1.0].view()), 1);
    }

    #[test]
    fn test_predict_batch_matches_single() {
        let fitted = LinearClassifier::<Fitted>::new(
            LinearParams::new(
                array![[1.0, 0.0], [0.0, 1.0], [-1.0, -1.0]],
                array![0.0, 0.0, 0.5],
            )
            .unwrap(),
        );
        let x = array![[2.0, 1.0], [1.0, 2.0], [-1.0, -1.0], [1.0, 1.0]];

        let batch = fitted.predict_batch(&x);
        let single: Vec<usize> = x
            .outer_iter()
            .map(|row| fitted.predict(row.as_slice().unwrap()))
            .collect();

        assert_eq!(batch.to_vec(), single);
        assert_eq!(batch.to_vec(), vec![0, 1, 2, 0]);
    }

    // === Serialization Tests ===

    #[test]
    fn test_serializable_round_trip() {
        let params =
            LinearParams::new(array![[0.25, -1.5, 3.0], [1.0, 2.0, -0.5]], array![0.1, -0.2])
                .unwrap();
        let fitted = LinearClassifier::<Fitted>::new(params.clone());

        let repr = fitted.to_serializable();
        assert_eq!(repr.n_classes, 2);
        assert_eq!(repr.n_features, 3);
        assert_eq!(repr.weights[1], vec![1.0, 2.0, -0.5]);

        let restored = LinearClassifier::<Fitted>::from_serializable(repr).unwrap();
        assert_eq!(restored.params(), &params);
    }

    #[test]
    fn test_serializable_rejects_ragged_weights() {
        let repr = SerializableLinearParams {
            n_classes: 2,
            n_features: 2,
            weights: vec![vec![1.0, 2.0], vec![3.0]],
            bias: vec![0.0, 0.0],
        };
        assert!(matches!(
            LinearParams::try_from(repr),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_serializable_rejects_bias_length() {
        let repr = SerializableLinearParams {
            n_classes: 2,
            n_features: 1,
            weights: vec![vec![1.0], vec![2.0]],
            bias: vec![0.0],
        };
        assert!(matches!(
            LinearParams::try_from(repr),
            Err(PipelineError::ShapeMismatch {
                what: "bias vector",
                ..
            })
        ));
    }
}
