//! Differentiable loss functions.

use ndarray::{Array1, Array2, Axis};

/// A trait for differentiable loss functions used during model training.
///
/// Implementors must define:
/// - How to compute the scalar loss value (for logging/convergence tracking).
/// - How to compute the gradient of the loss w.r.t. the model's predictions.
///
/// This gradient is passed to the model's `backward()` method.
pub trait Loss {
    type Prediction;
    type Target;

    fn loss(&self, prediction: &Self::Prediction, target: &Self::Target) -> f64;

    /// ∂L/∂prediction, what gets passed to `model.backward()`.
    fn grad_wrt_prediction(
        &self,
        prediction: &Self::Prediction,
        target: &Self::Target,
    ) -> Self::Prediction;
}

/// Row-wise softmax with the max subtracted first, so large logits do not
/// overflow.
pub fn softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

/// Multinomial cross-entropy on logits, averaged over samples.
///
/// `L = (1/n) Σ_i [ logsumexp(z_i) - z_i[y_i] ]`
///
/// Gradient w.r.t. logits: `(softmax(z) - onehot(y)) / n`.
pub struct SoftmaxCrossEntropy;

impl Loss for SoftmaxCrossEntropy {
    type Prediction = Array2<f64>;
    type Target = Array1<usize>;

    fn loss(&self, logits: &Array2<f64>, targets: &Array1<usize>) -> f64 {
        let n = logits.nrows();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = logits
            .outer_iter()
            .zip(targets.iter())
            .map(|(row, &t)| {
                let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                let lse = max + row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln();
                lse - row[t]
            })
            .sum();
        total / n as f64
    }

    fn grad_wrt_prediction(&self, logits: &Array2<f64>, targets: &Array1<usize>) -> Array2<f64> {
        let n = logits.nrows().max(1) as f64;
        let mut grad = softmax_rows(logits);
        for (mut row, &t) in grad.axis_iter_mut(Axis(0)).zip(targets.iter()) {
            row[t] -= 1.0;
        }
        grad / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let p = softmax_rows(&array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
        for row in p.outer_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((p[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
        assert!(p[[0, 2]] > p[[0, 1]] && p[[0, 1]] > p[[0, 0]]);
    }

    #[test]
    fn test_cross_entropy_uniform_logits() {
        // Uniform logits over 4 classes: loss = ln(4) regardless of target.
        let logits = Array2::zeros((3, 4));
        let targets = array![0, 2, 3];
        let loss = SoftmaxCrossEntropy.loss(&logits, &targets);
        assert!((loss - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_cross_entropy_gradient() {
        let logits = Array2::zeros((2, 2));
        let targets = array![0, 1];
        let grad = SoftmaxCrossEntropy.grad_wrt_prediction(&logits, &targets);
        // (softmax - onehot) / n = ([0.5, 0.5] - onehot) / 2
        assert_eq!(grad, array![[-0.25, 0.25], [0.25, -0.25]]);
    }

    #[test]
    fn test_cross_entropy_gradient_matches_finite_difference() {
        let logits = array![[0.3, -1.2, 2.0], [1.0, 0.5, -0.5]];
        let targets = array![2, 0];
        let grad = SoftmaxCrossEntropy.grad_wrt_prediction(&logits, &targets);

        let eps = 1e-6;
        for i in 0..2 {
            for k in 0..3 {
                let mut plus = logits.clone();
                plus[[i, k]] += eps;
                let mut minus = logits.clone();
                minus[[i, k]] -= eps;
                let numeric = (SoftmaxCrossEntropy.loss(&plus, &targets)
                    - SoftmaxCrossEntropy.loss(&minus, &targets))
                    / (2.0 * eps);
                assert!(
                    (numeric - grad[[i, k]]).abs() < 1e-6,
                    "grad[{},{}]: {} vs {}",
                    i,
                    k,
                    numeric,
                    grad[[i, k]]
                );
            }
        }
    }

    #[test]
    fn test_cross_entropy_numerical_stability() {
        let logits = array![[1000.0, -1000.0], [-1000.0, 1000.0]];
        let targets = array![0, 1];
        let loss = SoftmaxCrossEntropy.loss(&logits, &targets);
        assert!(loss.is_finite());
        assert!(loss.abs() < 1e-12);

        let grad = SoftmaxCrossEntropy.grad_wrt_prediction(&logits, &targets);
        assert!(grad.iter().all(|g| g.is_finite()));
    }
}
