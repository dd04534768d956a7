//! Stratified train/test partitioning.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Row indices of the two partitions. Disjoint, and together they cover
/// every sample exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split sample indices so every class keeps its proportion in both subsets.
///
/// For each class with `n` samples, `round(n * test_fraction)` of them go to
/// the test subset. The same `seed` always yields the same partition.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    if labels.is_empty() {
        return Err(PipelineError::EmptyData(
            "cannot split an empty label vector".to_string(),
        ));
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (class, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f64 * test_fraction).round() as usize;
        log::debug!(
            "class {}: {} samples, {} held out",
            class,
            indices.len(),
            n_test
        );
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    if train.is_empty() || test.is_empty() {
        return Err(PipelineError::InvalidParameter(format!(
            "test_fraction {} leaves an empty subset ({} train, {} test)",
            test_fraction,
            train.len(),
            test.len()
        )));
    }

    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_labels(per_class: usize, n_classes: usize) -> Vec<usize> {
        (0..n_classes)
            .flat_map(|c| std::iter::repeat(c).take(per_class))
            .collect()
    }

    fn count(indices: &[usize], labels: &[usize], class: usize) -> usize {
        indices.iter().filter(|&&i| labels[i] == class).count()
    }

    #[test]
    fn test_split_balanced_classes() {
        let labels = balanced_labels(100, 4);
        let split = stratified_split(&labels, 0.3, 42).unwrap();

        assert_eq!(split.test.len(), 120);
        assert_eq!(split.train.len(), 280);
        for class in 0..4 {
            assert_eq!(count(&split.test, &labels, class), 30);
            assert_eq!(count(&split.train, &labels, class), 70);
        }
    }

    #[test]
    fn test_split_unbalanced_keeps_proportions() {
        let mut labels = vec![0; 50];
        labels.extend(vec![1; 20]);
        labels.extend(vec![2; 10]);
        let split = stratified_split(&labels, 0.3, 1).unwrap();

        assert_eq!(count(&split.test, &labels, 0), 15);
        assert_eq!(count(&split.test, &labels, 1), 6);
        assert_eq!(count(&split.test, &labels, 2), 3);
    }

    #[test]
    fn test_split_is_a_partition() {
        let labels = balanced_labels(13, 3);
        let split = stratified_split(&labels, 0.3, 9).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels = balanced_labels(25, 4);
        let a = stratified_split(&labels, 0.3, 42).unwrap();
        let b = stratified_split(&labels, 0.3, 42).unwrap();
        let c = stratified_split(&labels, 0.3, 43).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let labels = balanced_labels(10, 2);
        assert!(matches!(
            stratified_split(&labels, 1.5, 0),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert!(matches!(
            stratified_split(&labels, 0.0, 0),
            Err(PipelineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_split_empty_labels() {
        assert!(matches!(
            stratified_split(&[], 0.3, 0),
            Err(PipelineError::EmptyData(_))
        ));
    }

    #[test]
    fn test_split_too_few_samples() {
        // One sample per class rounds to zero held out.
        assert!(matches!(
            stratified_split(&[0, 1], 0.3, 0),
            Err(PipelineError::InvalidParameter(_))
        ));
    }
}
