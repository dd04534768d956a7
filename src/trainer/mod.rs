//! Training loop orchestration.
//!
//! [`Trainer`] runs full-batch gradient descent on any [`TrainableModel`]
//! given a loss, an optimizer and a regularizer. [`fit_classifier`] wires it
//! up for the pipeline: stratified split, multinomial logistic regression
//! with L2, evaluation on the held-out subset.

use std::marker::PhantomData;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::artifacts;
use crate::config::{ArtifactPaths, TrainingConfig};
use crate::dataset::{stratified_split, StandardizedDataset};
use crate::error::Result;
use crate::loss::{Loss, SoftmaxCrossEntropy};
use crate::metrics::ClassificationReport;
use crate::model::{
    Fitted, InferenceModel, LinearClassifier, LogisticRegression, ParamOps,
    SerializableLinearParams, TrainableModel,
};
use crate::optimizer::{GradientDescent, Optimizer};
use crate::regularizers::{Regularizer, L2};

/// Immutable training configuration, built with [`TrainerBuilder`].
pub struct Trainer<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) loss_fn: L,
    pub(crate) optimizer: O,
    pub(crate) regularizer: R,
    _phantom_model: PhantomData<M>,
}

/// Fluent builder for constructing a `Trainer` with custom hyperparameters.
///
/// Defaults:
/// - `max_iter`: 2000
/// - `tol`: 1e-4
pub struct TrainerBuilder<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    max_iter: usize,
    tol: f64,
    loss_fn: L,
    optimizer: O,
    regularizer: R,
    _phantom_model: PhantomData<M>,
}

impl<L, O, M, R> TrainerBuilder<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    pub fn new(loss_fn: L, optimizer: O, regularizer: R) -> Self {
        Self {
            max_iter: 2000,
            tol: 1e-4,
            loss_fn,
            optimizer,
            regularizer,
            _phantom_model: PhantomData,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Stop once the largest gradient component is below `tol`.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn build(self) -> Trainer<L, O, M, R> {
        Trainer {
            max_iter: self.max_iter,
            tol: self.tol,
            loss_fn: self.loss_fn,
            optimizer: self.optimizer,
            regularizer: self.regularizer,
            _phantom_model: PhantomData,
        }
    }
}

/// What the optimizer reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    /// Gradient steps taken.
    pub iterations: usize,
    pub converged: bool,
    /// Objective (loss + penalty) of the returned parameters.
    pub objective: f64,
}

impl<L, O, M, R> Trainer<L, O, M, R>
where
    L: Loss<Prediction = M::Prediction>,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    /// Convenience constructor that starts the builder pattern.
    pub fn builder(loss_fn: L, optimizer: O, regularizer: R) -> TrainerBuilder<L, O, M, R> {
        TrainerBuilder::new(loss_fn, optimizer, regularizer)
    }

    /// Minimize loss + penalty with full-batch gradient steps.
    ///
    /// Running out of iterations is not an error: the parameters with the
    /// lowest objective seen so far are returned, and the summary reports
    /// `converged = false`.
    pub fn fit(&self, mut model: M, x: &M::Input, y: &L::Target) -> (M::Output, FitSummary) {
        let mut best: Option<(f64, M::Params)> = None;
        let mut converged = false;
        let mut iterations = 0;

        for step in 0..=self.max_iter {
            let preds = model.forward(x);
            let (penalty, reg_grad) = self.regularizer.regularizer_penalty_grad(&model);
            let objective = self.loss_fn.loss(&preds, y) + penalty;

            if best.as_ref().map_or(true, |(b, _)| objective < *b) {
                best = Some((objective, model.params().clone()));
            }

            let grad_preds = self.loss_fn.grad_wrt_prediction(&preds, y);
            let grads = model.backward(x, &grad_preds).add(&reg_grad);
            let grad_norm = grads.max_abs();
            log::trace!(
                "iter {}: objective = {:.6}, max |grad| = {:.3e}",
                step,
                objective,
                grad_norm
            );

            if grad_norm < self.tol {
                converged = true;
                best = Some((objective, model.params().clone()));
                break;
            }
            if step == self.max_iter {
                break;
            }

            let new_params = self.optimizer.step(model.params(), &grads);
            model.update_params(&new_params);
            iterations = step + 1;
        }

        let objective = match best {
            Some((objective, params)) => {
                model.update_params(&params);
                objective
            }
            None => f64::NAN,
        };

        if converged {
            log::debug!(
                "converged after {} iterations, objective = {:.6}",
                iterations,
                objective
            );
        } else {
            log::warn!(
                "no convergence within {} iterations, keeping best objective {:.6}",
                self.max_iter,
                objective
            );
        }

        (
            model.into_fitted(),
            FitSummary {
                iterations,
                converged,
                objective,
            },
        )
    }
}

/// Everything the training stage produces.
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    /// Operates on standardized inputs.
    pub model: LinearClassifier<Fitted>,
    pub fit: FitSummary,
    pub report: ClassificationReport,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingOutcome {
    pub fn test_accuracy(&self) -> f64 {
        self.report.accuracy
    }
}

/// Split, fit multinomial logistic regression, and evaluate on the held-out part.
pub fn fit_classifier(dataset: &StandardizedDataset, config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    dataset.check_labels(config.n_classes)?;

    let labels = dataset.labels().to_vec();
    let split = stratified_split(&labels, config.test_fraction, config.seed)?;
    let train = dataset.select(&split.train)?;
    let test = dataset.select(&split.test)?;
    log::info!(
        "train/test split: {} / {} samples (test fraction {})",
        train.len(),
        test.len(),
        config.test_fraction
    );

    let trainer = Trainer::builder(
        SoftmaxCrossEntropy,
        GradientDescent::new(config.learning_rate),
        L2::from_inverse_strength(config.inverse_regularization, train.len()),
    )
    .max_iter(config.max_iter)
    .tol(config.tol)
    .build();

    let model = LogisticRegression::new(config.n_classes, dataset.n_features());
    let (model, fit) = trainer.fit(model, train.features(), train.labels());

    let report = evaluate(&model, test.features(), test.labels(), config.n_classes);
    log::info!("test accuracy: {:.4}", report.accuracy);

    Ok(TrainingOutcome {
        model,
        fit,
        report,
        n_train: train.len(),
        n_test: test.len(),
    })
}

/// `model.json`: trained parameters plus the held-out accuracy they reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    #[serde(flatten)]
    pub params: SerializableLinearParams,
    pub test_accuracy: f64,
}

impl TrainedModelArtifact {
    pub fn new(model: &LinearClassifier<Fitted>, test_accuracy: f64) -> Self {
        Self {
            params: model.to_serializable(),
            test_accuracy,
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        artifacts::write_json(path, self)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        artifacts::read_json(path)
    }

    /// Rebuild the classifier, validating the stored shape.
    pub fn to_model(&self) -> Result<LinearClassifier<Fitted>> {
        LinearClassifier::<Fitted>::from_serializable(self.params.clone())
    }
}

/// File-to-file training: label and feature artifacts in, `model.json` out.
pub struct TrainStage;

impl TrainStage {
    pub fn run(paths: &ArtifactPaths, config: &TrainingConfig) -> Result<TrainingOutcome> {
        log::info!(
            "train: reading {} and {}",
            paths.labels.display(),
            paths.features.display()
        );
        let labels = artifacts::load_labels(&paths.labels)?;
        let features = artifacts::load_features(&paths.features)?;
        let dataset = StandardizedDataset::new(labels, features)?;

        let outcome = fit_classifier(&dataset, config)?;
        log::info!("classification report (test subset):\n{}", outcome.report);

        TrainedModelArtifact::new(&outcome.model, outcome.test_accuracy())
            .save_to_file(&paths.model)?;
        log::info!("train: model written to {}", paths.model.display());
        Ok(outcome)
    }
}

/// Classification report of `model` on `(x, y)`.
pub fn evaluate(
    model: &LinearClassifier<Fitted>,
    x: &Array2<f64>,
    y: &Array1<usize>,
    n_classes: usize,
) -> ClassificationReport {
    let y_pred = model.predict_batch(x);
    ClassificationReport::new(&y.to_vec(), &y_pred.to_vec(), n_classes)
}
