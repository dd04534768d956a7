use ndarray::Array1;

use crate::model::{LinearParams, LogisticRegression, TrainableModel};

/// Penalty term added to the training objective, with its gradient.
pub trait Regularizer<M: TrainableModel> {
    fn regularizer_penalty_grad(&self, model: &M) -> (f64, M::Params);
}

/// Ridge penalty `(lambda / 2) * ||W||²` on the weights; bias is not penalized.
#[derive(Clone, Debug)]
pub struct L2 {
    lambda: f64,
}

impl L2 {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Strength matching an inverse-regularization `c` on a sum-of-losses
    /// objective, once the data term is averaged over `n_samples`.
    pub fn from_inverse_strength(c: f64, n_samples: usize) -> Self {
        Self::new(1.0 / (c * n_samples.max(1) as f64))
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Regularizer<LogisticRegression> for L2 {
    fn regularizer_penalty_grad(&self, model: &LogisticRegression) -> (f64, LinearParams) {
        let weights = &model.params().weights;
        let penalty = 0.5 * self.lambda * weights.iter().map(|w| w * w).sum::<f64>();
        let grad = LinearParams {
            weights: weights * self.lambda,
            bias: Array1::zeros(model.params().bias.len()),
        };
        (penalty, grad)
    }
}

pub struct NoRegularizer;

impl Regularizer<LogisticRegression> for NoRegularizer {
    fn regularizer_penalty_grad(&self, model: &LogisticRegression) -> (f64, LinearParams) {
        let params = model.params();
        (0.0, LinearParams::zeros(params.n_classes(), params.n_features()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_l2_penalty_and_grad() {
        let params = LinearParams::new(array![[1.0, -2.0], [0.0, 3.0]], array![5.0, 5.0]).unwrap();
        let model = LogisticRegression::from_params(params);

        let (penalty, grad) = L2::new(0.5).regularizer_penalty_grad(&model);

        // 0.5 * 0.5 * (1 + 4 + 0 + 9)
        assert!((penalty - 3.5).abs() < 1e-12);
        assert_eq!(grad.weights, array![[0.5, -1.0], [0.0, 1.5]]);
        assert_eq!(grad.bias, array![0.0, 0.0]);
    }

    #[test]
    fn test_l2_from_inverse_strength() {
        let l2 = L2::from_inverse_strength(1.0, 200);
        assert!((l2.lambda() - 0.005).abs() < 1e-15);
    }

    #[test]
    fn test_no_regularizer_is_zero() {
        let model = LogisticRegression::from_params(
            LinearParams::new(array![[1.0, 1.0]], array![1.0]).unwrap(),
        );
        let (penalty, grad) = NoRegularizer.regularizer_penalty_grad(&model);
        assert_eq!(penalty, 0.0);
        assert!(grad.weights.iter().all(|&g| g == 0.0));
    }
}
