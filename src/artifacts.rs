//! Persistence helpers for stage-to-stage artifacts.
//!
//! Each artifact is written to a temporary file next to its destination and
//! renamed into place once complete, so a failed write never leaves a
//! truncated file that the next stage would accept.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{PipelineError, Result};

/// Fill a synced temporary file in the directory of `path`.
fn stage_temp<F>(path: &Path, fill: F) -> Result<NamedTempFile>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

    let tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        fill(&mut writer)?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| PipelineError::io(path, e))?;
    Ok(tmp)
}

/// Write `path` atomically: `fill` writes the full contents into a temporary
/// sibling file which then replaces `path`.
pub fn write_atomic<P, F>(path: P, fill: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let path = path.as_ref();
    stage_temp(path, fill)?
        .persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Artifacts that only make sense together, replaced as a group.
///
/// Every member is written to its temporary file before any destination is
/// touched, so a failure while staging leaves the previous set intact. If a
/// rename fails during [`commit`](Self::commit), every member path is
/// removed: downstream stages then find the set missing rather than mixed.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    staged: Vec<(PathBuf, NamedTempFile)>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<P, F>(&mut self, path: P, fill: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        let path = path.as_ref();
        let tmp = stage_temp(path, fill)?;
        self.staged.push((path.to_path_buf(), tmp));
        Ok(())
    }

    pub fn stage_json<P: AsRef<Path>, T: Serialize>(&mut self, path: P, value: &T) -> Result<()> {
        self.stage(path, |w| json_into(w, value))
    }

    pub fn stage_bincode<P: AsRef<Path>, T: Serialize>(&mut self, path: P, value: &T) -> Result<()> {
        self.stage(path, |w| Ok(bincode::serialize_into(w, value)?))
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Move every staged file into place.
    pub fn commit(self) -> Result<()> {
        let members: Vec<PathBuf> = self.staged.iter().map(|(p, _)| p.clone()).collect();
        for (path, tmp) in self.staged {
            if let Err(e) = tmp.persist(&path) {
                for member in &members {
                    if fs::remove_file(member).is_ok() {
                        log::warn!("removed {} from an incomplete artifact set", member.display());
                    }
                }
                return Err(PipelineError::io(&path, e.error));
            }
            log::debug!("wrote {}", path.display());
        }
        Ok(())
    }
}

fn json_into<T: Serialize>(w: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    w.write_all(b"\n")
        .map_err(|e| PipelineError::io("<json artifact>", e))?;
    Ok(())
}

/// Serialize `value` as pretty JSON.
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    write_atomic(path, |w| json_into(w, value))
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_bincode<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    write_atomic(path, |w| Ok(bincode::serialize_into(w, value)?))
}

fn read_bincode<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

/// Label artifact: one class id per sample, in sample order.
pub fn save_labels<P: AsRef<Path>>(path: P, labels: &Array1<usize>) -> Result<()> {
    write_bincode(path, labels)
}

pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Array1<usize>> {
    read_bincode(path)
}

/// Standardized-feature artifact: `(N, F)` matrix, row `n` aligned with label `n`.
pub fn save_features<P: AsRef<Path>>(path: P, features: &Array2<f64>) -> Result<()> {
    write_bincode(path, features)
}

pub fn load_features<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    read_bincode(path)
}
