//! Raw dataset → standardized dataset plus scaler parameters.

use crate::artifacts::ArtifactSet;
use crate::config::ArtifactPaths;
use crate::dataset::{RawDataset, StandardizedDataset};
use crate::error::{PipelineError, Result};
use crate::preprocessing::scaler::{FittedStandardScaler, StandardScaler};

/// Result of standardizing a raw dataset.
#[derive(Clone, Debug)]
pub struct NormalizedOutput {
    /// Labels and standardized features, in acquisition order.
    pub dataset: StandardizedDataset,
    pub scaler: FittedStandardScaler,
}

/// Fit a [`StandardScaler`] on every raw sample and standardize them.
///
/// Row `n` of the output describes the same sample as row `n` of `raw`.
pub fn normalize(raw: &RawDataset) -> Result<NormalizedOutput> {
    if raw.is_empty() {
        return Err(PipelineError::EmptyData("raw dataset has no samples".to_string()));
    }
    let labels = raw.labels();
    let x_raw = raw.feature_matrix()?;

    let (scaler, x_std) = StandardScaler::new().fit_transform(&x_raw)?;
    let dataset = StandardizedDataset::new(labels, x_std)?;

    Ok(NormalizedOutput { dataset, scaler })
}

/// File-to-file normalization: raw CSV in, four aligned artifacts out.
pub struct NormalizeStage;

impl NormalizeStage {
    pub fn run(paths: &ArtifactPaths) -> Result<NormalizedOutput> {
        log::info!("normalize: reading {}", paths.raw_csv.display());
        let raw = RawDataset::load(&paths.raw_csv)?;
        let output = normalize(&raw)?;

        for (i, (m, s)) in output
            .scaler
            .mean()
            .iter()
            .zip(output.scaler.scale().iter())
            .enumerate()
        {
            log::debug!("feature {:2}: mean = {:.4}, scale = {:.4}", i, m, s);
        }

        // The four files describe one run; they are replaced together or not at all.
        let mut set = ArtifactSet::new();
        set.stage_bincode(&paths.labels, output.dataset.labels())?;
        set.stage_bincode(&paths.features, output.dataset.features())?;
        set.stage_json(&paths.scaler, &output.scaler.params())?;
        set.stage(&paths.inspection_csv, |w| output.dataset.write_inspection_csv(w))?;
        set.commit()?;

        log::info!(
            "normalize: {} samples x {} features -> {}, {}, {}, {}",
            output.dataset.len(),
            output.dataset.n_features(),
            paths.labels.display(),
            paths.features.display(),
            paths.scaler.display(),
            paths.inspection_csv.display()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts;
    use crate::config::NUM_FEATURES;
    use crate::dataset::RawSample;
    use crate::preprocessing::ScalerParams;

    fn raw_dataset() -> RawDataset {
        (0..8)
            .map(|i| {
                let mut features = [0i32; NUM_FEATURES];
                for (j, f) in features.iter_mut().enumerate() {
                    *f = 100 * (i % 4) + 7 * j as i32 + i;
                }
                RawSample::new((i % 4) as u8, features)
            })
            .collect()
    }

    #[test]
    fn test_normalize_keeps_alignment() {
        let raw = raw_dataset();
        let out = normalize(&raw).unwrap();

        assert_eq!(out.dataset.labels(), &raw.labels());
        assert_eq!(out.dataset.features().dim(), (8, NUM_FEATURES));

        // Standardizing back recovers the raw reading of every row.
        let restored = out.scaler.inverse_transform(out.dataset.features()).unwrap();
        for (n, sample) in raw.samples().iter().enumerate() {
            for (i, &v) in sample.features.iter().enumerate() {
                assert!((restored[[n, i]] - v as f64).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_normalize_zero_mean_unit_std() {
        let out = normalize(&raw_dataset()).unwrap();
        let x = out.dataset.features();
        for column in x.columns() {
            let mean = column.mean().unwrap();
            let var = column.mapv(|v| (v - mean).powi(2)).mean().unwrap();
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalize_rejects_constant_channel() {
        let raw: RawDataset = (0..4)
            .map(|i| {
                let mut features = [i; NUM_FEATURES];
                features[5] = 512;
                RawSample::new(0, features)
            })
            .collect();
        assert!(matches!(
            normalize(&raw),
            Err(PipelineError::DegenerateScale { feature: 5 })
        ));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let result = normalize(&RawDataset::default());
        assert!(matches!(result, Err(PipelineError::EmptyData(_))));
    }

    fn stage_paths(dir: &std::path::Path) -> ArtifactPaths {
        ArtifactPaths {
            raw_csv: dir.join("raw.csv"),
            labels: dir.join("out/labels.bin"),
            features: dir.join("out/x_std.bin"),
            scaler: dir.join("out/scaler.json"),
            inspection_csv: dir.join("out/normalized.csv"),
            ..ArtifactPaths::default()
        }
    }

    #[test]
    fn test_normalize_stage_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = stage_paths(dir.path());
        let raw = raw_dataset();
        raw.save(&paths.raw_csv).unwrap();

        let out = NormalizeStage::run(&paths).unwrap();

        let labels = artifacts::load_labels(&paths.labels).unwrap();
        let features = artifacts::load_features(&paths.features).unwrap();
        let scaler = ScalerParams::load_from_file(&paths.scaler).unwrap();
        assert_eq!(labels, raw.labels());
        assert_eq!(&features, out.dataset.features());
        let expected = out.scaler.params();
        assert_eq!(scaler.len(), NUM_FEATURES);
        assert_eq!(scaler, expected);

        let text = std::fs::read_to_string(&paths.inspection_csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), raw.len());
        assert!(lines[2].starts_with("2,"));
        assert_eq!(lines[0].split(',').count(), NUM_FEATURES + 1);
    }

    #[test]
    fn test_failed_normalize_keeps_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = stage_paths(dir.path());
        let first = raw_dataset();
        first.save(&paths.raw_csv).unwrap();
        let out = NormalizeStage::run(&paths).unwrap();

        // A second, larger capture whose inspection CSV cannot be written.
        let second: RawDataset = first
            .samples()
            .iter()
            .chain(first.samples())
            .map(|s| {
                let mut features = s.features;
                features[0] += 40;
                RawSample::new(s.label, features)
            })
            .collect();
        second.save(&paths.raw_csv).unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        paths.inspection_csv = blocker.join("normalized.csv");

        assert!(matches!(
            NormalizeStage::run(&paths),
            Err(PipelineError::Io { .. })
        ));

        let labels = artifacts::load_labels(&paths.labels).unwrap();
        let features = artifacts::load_features(&paths.features).unwrap();
        let scaler = ScalerParams::load_from_file(&paths.scaler).unwrap();
        assert_eq!(labels.len(), first.len());
        assert_eq!(&features, out.dataset.features());
        assert_eq!(scaler, out.scaler.params());
    }

    #[test]
    fn test_normalize_stage_missing_raw_csv() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            raw_csv: dir.path().join("absent.csv"),
            ..ArtifactPaths::default()
        };
        assert!(matches!(
            NormalizeStage::run(&paths),
            Err(PipelineError::Io { .. })
        ));
    }
}
