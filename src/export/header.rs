use std::fmt::Write as _;
use std::path::Path;

use ndarray::ArrayView1;

use crate::artifacts;
use crate::config::{ArtifactPaths, ExportConfig};
use crate::error::{PipelineError, Result};
use crate::folding::FoldedModel;
use crate::trainer::TrainedModelArtifact;

/// Metadata written into the header comments, plus the shape the firmware
/// was built for.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderSpec {
    /// One name per class id, in class order.
    pub class_names: Vec<String>,
    /// Held-out accuracy of the trained model, when known.
    pub test_accuracy: Option<f64>,
    pub expected_classes: usize,
    pub expected_features: usize,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default(), None)
    }
}

impl HeaderSpec {
    pub fn from_config(config: &ExportConfig, test_accuracy: Option<f64>) -> Self {
        Self {
            class_names: config.class_names.clone(),
            test_accuracy,
            expected_classes: config.expected_classes,
            expected_features: config.expected_features,
        }
    }

    pub fn with_test_accuracy(mut self, accuracy: f64) -> Self {
        self.test_accuracy = Some(accuracy);
        self
    }
}

/// `{:.6}f`, matching `printf("%.6ff")` including `-0.000000f`.
fn c_float(v: f64) -> String {
    format!("{:.6}f", v)
}

fn c_float_list(values: ArrayView1<f64>) -> String {
    values.iter().map(|&v| c_float(v)).collect::<Vec<_>>().join(", ")
}

fn check_shape(folded: &FoldedModel, spec: &HeaderSpec) -> Result<()> {
    let (c, f) = (folded.n_classes(), folded.n_features());
    if c != spec.expected_classes || f != spec.expected_features {
        return Err(PipelineError::ShapeMismatch {
            what: "folded model",
            expected: format!("{} x {}", spec.expected_classes, spec.expected_features),
            got: format!("{} x {}", c, f),
        });
    }
    if spec.class_names.len() != c {
        return Err(PipelineError::ShapeMismatch {
            what: "class names",
            expected: c.to_string(),
            got: spec.class_names.len().to_string(),
        });
    }
    Ok(())
}

/// Render the C header for `folded`.
///
/// # Errors
/// [`PipelineError::ShapeMismatch`] when the model is not
/// `expected_classes x expected_features` or the class names do not cover
/// every class.
pub fn render_header(folded: &FoldedModel, spec: &HeaderSpec) -> Result<String> {
    check_shape(folded, spec)?;
    let (c, f) = (folded.n_classes(), folded.n_features());

    let mut lines: Vec<String> = Vec::new();
    lines.push(
        "// Auto-generated logistic regression parameters (with standardization folded in)"
            .to_string(),
    );
    lines.push("// Classes:".to_string());
    for (k, name) in spec.class_names.iter().enumerate() {
        lines.push(format!("//   {} = {}", k, name));
    }
    lines.push(String::new());
    if let Some(acc) = spec.test_accuracy {
        lines.push(format!(
            "// Accuracy on test set (trained on standardized features): {:.6}",
            acc
        ));
    }
    lines.push("// NOTE:".to_string());
    lines.push(format!(
        "//   These weights expect {}-dimensional INPUT FEATURES",
        f
    ));
    lines.push("//   that are RAW analogRead() values (0–1023),".to_string());
    lines.push(
        "//   because the standardization has been folded into LOGI_W / LOGI_B.".to_string(),
    );
    lines.push(String::new());
    lines.push("#pragma once".to_string());
    lines.push(String::new());
    lines.push(format!("#define LOGI_NUM_CLASSES  {}", c));
    lines.push(format!("#define LOGI_NUM_FEATURES {}", f));
    lines.push(String::new());

    let mut w = String::new();
    // Infallible: writing into a String.
    let _ = writeln!(w, "// shape: {} x {}", c, f);
    let _ = writeln!(w, "const float LOGI_W[{}][{}] = {{", c, f);
    for (k, row) in folded.weights().outer_iter().enumerate() {
        let comma = if k + 1 < c { "," } else { "" };
        let _ = writeln!(w, "    {{{}}}{}", c_float_list(row), comma);
    }
    w.push_str("};");
    lines.push(w);
    lines.push(String::new());

    lines.push(format!(
        "// length: {}\nconst float LOGI_B[{}] = {{ {} }};",
        c,
        c,
        c_float_list(folded.bias().view())
    ));
    lines.push(String::new());

    Ok(lines.join("\n"))
}

/// Write `text` to `path` through a temporary sibling file and rename, so the
/// firmware build never sees a partial header.
pub fn write_header<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    artifacts::write_atomic(path, |w| {
        w.write_all(text.as_bytes())
            .map_err(|e| PipelineError::io(path, e))
    })
}

/// File-to-file export: `folded.json` (+ `model.json` for the accuracy line)
/// in, C header out.
pub struct ExportStage;

impl ExportStage {
    pub fn run(paths: &ArtifactPaths, config: &ExportConfig) -> Result<String> {
        log::info!("export: reading {}", paths.folded.display());
        let folded = FoldedModel::load_from_file(&paths.folded)?;

        let test_accuracy = match TrainedModelArtifact::load_from_file(&paths.model) {
            Ok(artifact) => Some(artifact.test_accuracy),
            Err(e) => {
                log::warn!(
                    "export: no test accuracy available from {} ({}), omitting it",
                    paths.model.display(),
                    e
                );
                None
            }
        };

        let spec = HeaderSpec::from_config(config, test_accuracy);
        let text = render_header(&folded, &spec)?;
        write_header(&paths.header, &text)?;
        log::info!(
            "export: {} x {} header written to {}",
            folded.n_classes(),
            folded.n_features(),
            paths.header.display()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearParams;
    use ndarray::{array, Array1, Array2};

    fn folded(c: usize, f: usize) -> FoldedModel {
        let weights = Array2::from_shape_fn((c, f), |(k, i)| (k as f64 - 1.5) * 0.001 * (i + 1) as f64);
        let bias = Array1::from_shape_fn(c, |k| k as f64 * 1.25 - 2.0);
        FoldedModel::from_params(LinearParams::new(weights, bias).unwrap())
    }

    fn small_spec() -> HeaderSpec {
        HeaderSpec {
            class_names: vec!["A".to_string(), "B".to_string()],
            test_accuracy: Some(0.9974025974),
            expected_classes: 2,
            expected_features: 3,
        }
    }

    #[test]
    fn test_render_header_exact_layout() {
        let model = FoldedModel::from_params(
            LinearParams::new(
                array![[1.0, -0.5, 0.0000004], [-0.0000004, 2.25, -3.0]],
                array![4.6268884, -0.125],
            )
            .unwrap(),
        );

        let text = render_header(&model, &small_spec()).unwrap();

        let expected = "\
// Auto-generated logistic regression parameters (with standardization folded in)
// Classes:
//   0 = A
//   1 = B

// Accuracy on test set (trained on standardized features): 0.997403
// NOTE:
//   These weights expect 3-dimensional INPUT FEATURES
//   that are RAW analogRead() values (0–1023),
//   because the standardization has been folded into LOGI_W / LOGI_B.

#pragma once

#define LOGI_NUM_CLASSES  2
#define LOGI_NUM_FEATURES 3

// shape: 2 x 3
const float LOGI_W[2][3] = {
    {1.000000f, -0.500000f, 0.000000f},
    {-0.000000f, 2.250000f, -3.000000f}
};

// length: 2
const float LOGI_B[2] = { 4.626888f, -0.125000f };
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_header_default_shape() {
        let text = render_header(&folded(4, 18), &HeaderSpec::default().with_test_accuracy(0.5))
            .unwrap();

        assert!(text.contains("#define LOGI_NUM_CLASSES  4\n"));
        assert!(text.contains("#define LOGI_NUM_FEATURES 18\n"));
        assert!(text.contains("const float LOGI_W[4][18] = {\n"));
        assert!(text.contains("const float LOGI_B[4] = { "));
        assert!(text.contains("//   2 = Takenoko (Right)\n"));

        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("    {")).collect();
        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert_eq!(row.matches('f').count(), 18);
        }
        assert!(rows[3].ends_with('}'));
        assert!(rows[0].ends_with("},"));
    }

    #[test]
    fn test_render_header_without_accuracy() {
        let mut spec = small_spec();
        spec.test_accuracy = None;
        let text = render_header(&folded(2, 3), &spec).unwrap();
        assert!(!text.contains("Accuracy"));
        assert!(text.contains("#pragma once"));
    }

    #[test]
    fn test_render_header_rejects_wrong_shape() {
        let result = render_header(&folded(3, 18), &HeaderSpec::default());
        assert!(matches!(
            result,
            Err(PipelineError::ShapeMismatch {
                what: "folded model",
                ..
            })
        ));
        let result = render_header(&folded(4, 17), &HeaderSpec::default());
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_render_header_rejects_missing_class_names() {
        let mut spec = HeaderSpec::default();
        spec.class_names.pop();
        assert!(matches!(
            render_header(&folded(4, 18), &spec),
            Err(PipelineError::ShapeMismatch {
                what: "class names",
                ..
            })
        ));
    }

    #[test]
    fn test_write_header_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("logistic_params_raw.h");

        write_header(&path, "// old\n").unwrap();
        write_header(&path, "// new\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// new\n");
    }

    #[test]
    fn test_export_stage_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths {
            model: dir.path().join("absent_model.json"),
            folded: dir.path().join("folded.json"),
            header: dir.path().join("params.h"),
            ..ArtifactPaths::default()
        };
        folded(4, 18).save_to_file(&paths.folded).unwrap();

        let text = ExportStage::run(&paths, &ExportConfig::default()).unwrap();

        assert_eq!(std::fs::read_to_string(&paths.header).unwrap(), text);
        assert!(!text.contains("Accuracy"));
    }
}
