//! Labeled datasets passed between pipeline stages.
//!
//! - [`RawDataset`]: integer ADC readings as acquired, one [`RawSample`] per
//!   serial line, persisted as a headerless CSV (`label,f0..f17`).
//! - [`StandardizedDataset`]: label vector plus standardized feature matrix.
//!
//! Both keep sample order: row `n` of every artifact derived from a dataset
//! describes the same acquired sample.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use ndarray::{Array1, Array2, Axis};

use crate::config::NUM_FEATURES;
use crate::error::{PipelineError, Result};

pub mod split;
pub use self::split::{stratified_split, SplitIndices};

/// One acquired sample: class id plus the raw readings of every channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample {
    pub label: u8,
    pub features: [i32; NUM_FEATURES],
}

impl RawSample {
    pub fn new(label: u8, features: [i32; NUM_FEATURES]) -> Self {
        Self { label, features }
    }

    /// CSV cells for this sample: label first, then features in channel order.
    pub fn to_record(&self) -> Vec<String> {
        std::iter::once(self.label.to_string())
            .chain(self.features.iter().map(|v| v.to_string()))
            .collect()
    }
}

/// Ordered collection of raw samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawDataset {
    samples: Vec<RawSample>,
}

impl RawDataset {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples }
    }

    /// Load a headerless raw CSV.
    ///
    /// Every row must have exactly `1 + NUM_FEATURES` integer cells; the first
    /// offending row (1-based) is reported.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let mut samples = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let record = result?;
            if record.len() != NUM_FEATURES + 1 {
                return Err(PipelineError::InvalidRow {
                    row,
                    reason: format!(
                        "expected {} columns, got {}",
                        NUM_FEATURES + 1,
                        record.len()
                    ),
                });
            }

            let label: u8 = record[0].parse().map_err(|_| PipelineError::InvalidRow {
                row,
                reason: format!("label {:?} is not a class id", &record[0]),
            })?;

            let mut features = [0i32; NUM_FEATURES];
            for (j, cell) in record.iter().skip(1).enumerate() {
                features[j] = cell.parse().map_err(|_| PipelineError::InvalidRow {
                    row,
                    reason: format!("feature {} value {:?} is not an integer", j, cell),
                })?;
            }
            samples.push(RawSample { label, features });
        }

        Ok(Self { samples })
    }

    /// Write all samples as a headerless CSV, replacing `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for sample in &self.samples {
            wtr.write_record(sample.to_record())?;
        }
        wtr.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Label vector in sample order.
    pub fn labels(&self) -> Array1<usize> {
        self.samples.iter().map(|s| s.label as usize).collect()
    }

    /// `(N, NUM_FEATURES)` feature matrix in sample order.
    pub fn feature_matrix(&self) -> Result<Array2<f64>> {
        let data: Vec<f64> = self
            .samples
            .iter()
            .flat_map(|s| s.features.iter().map(|&v| v as f64))
            .collect();
        let got = data.len();
        Array2::from_shape_vec((self.samples.len(), NUM_FEATURES), data).map_err(|_| {
            PipelineError::ShapeMismatch {
                what: "raw feature matrix",
                expected: format!("{} x {}", self.samples.len(), NUM_FEATURES),
                got: format!("{} values", got),
            }
        })
    }
}

impl FromIterator<RawSample> for RawDataset {
    fn from_iter<I: IntoIterator<Item = RawSample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Standardized feature matrix paired 1:1 with its label vector.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardizedDataset {
    labels: Array1<usize>,
    features: Array2<f64>,
}

impl StandardizedDataset {
    /// Pair labels with features. Fails rather than truncating when the
    /// sample counts differ.
    pub fn new(labels: Array1<usize>, features: Array2<f64>) -> Result<Self> {
        if labels.len() != features.nrows() {
            return Err(PipelineError::LengthMismatch {
                labels: labels.len(),
                features: features.nrows(),
            });
        }
        if labels.is_empty() {
            return Err(PipelineError::EmptyData("dataset has no samples".to_string()));
        }
        Ok(Self { labels, features })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Rows at `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let labels = self.labels.select(Axis(0), indices);
        let features = self.features.select(Axis(0), indices);
        Self::new(labels, features)
    }

    /// Check every label is below `n_classes`.
    pub fn check_labels(&self, n_classes: usize) -> Result<()> {
        match self.labels.iter().position(|&l| l >= n_classes) {
            Some(row) => Err(PipelineError::InvalidLabel {
                row,
                label: self.labels[row],
                n_classes,
            }),
            None => Ok(()),
        }
    }

    /// Write the inspection CSV: `label,std_f0..std_fN` per row, no header.
    pub fn write_inspection_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (label, row) in self.labels.iter().zip(self.features.outer_iter()) {
            let record = std::iter::once(label.to_string())
                .chain(row.iter().map(|v| v.to_string()));
            wtr.write_record(record)?;
        }
        wtr.flush()
            .map_err(|e| PipelineError::io("<inspection csv>", e))?;
        Ok(())
    }
}
