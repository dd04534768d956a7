use crate::model::ParamOps;

/// Trait for gradient-based optimizers.
///
/// Optimizers only update parameters; the training loop that produces the
/// gradients lives in [`crate::trainer::Trainer`].
///
/// # Example
/// ```rust
/// use sensor_logit::model::LinearParams;
/// use sensor_logit::optimizer::{GradientDescent, Optimizer};
/// use ndarray::array;
///
/// let params = LinearParams::new(array![[1.0, 2.0]], array![0.5]).unwrap();
/// let grads = LinearParams::new(array![[0.1, -0.2]], array![-0.01]).unwrap();
/// let updated = GradientDescent::new(0.5).step(&params, &grads);
/// assert!((updated.bias[0] - 0.505).abs() < 1e-12);
/// ```
pub trait Optimizer<P> {
    /// Performs an optimization step using the update rule:
    /// ```text
    /// params_new = params - learning_rate * gradients
    /// ```
    /// Returns new parameters; inputs are not mutated.
    fn step(&self, params: &P, gradients: &P) -> P;
}

/// Plain gradient descent: `θ ← θ - η · ∇L(θ)`.
///
/// The trainer feeds it full-batch gradients, which keeps the fit
/// deterministic for a given split.
#[derive(Clone, Debug)]
pub struct GradientDescent {
    lr: f64,
}

impl GradientDescent {
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }
}

impl<P: ParamOps> Optimizer<P> for GradientDescent {
    fn step(&self, params: &P, grads: &P) -> P {
        params.add(&grads.scale(-self.lr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearParams;
    use ndarray::array;

    #[test]
    fn test_gradient_descent_learning_rate_accessor() {
        assert_eq!(GradientDescent::new(0.001).learning_rate(), 0.001);
    }

    #[test]
    fn test_gradient_descent_step_correctness() {
        // params_new = params_old - lr * grads
        let params = LinearParams::new(array![[2.0, 3.0]], array![1.0]).unwrap();
        let grads = LinearParams::new(array![[1.0, -1.0]], array![0.5]).unwrap();

        let updated = GradientDescent::new(0.5).step(&params, &grads);

        assert_eq!(updated.weights, array![[1.5, 3.5]]);
        assert_eq!(updated.bias, array![0.75]);
    }

    #[test]
    fn test_gradient_descent_zero_gradient_is_identity() {
        let params = LinearParams::new(array![[5.0], [-1.0]], array![0.0, 2.0]).unwrap();
        let grads = LinearParams::zeros(2, 1);

        let updated = GradientDescent::new(0.1).step(&params, &grads);
        assert_eq!(updated, params);
    }
}
