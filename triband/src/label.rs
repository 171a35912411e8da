//! Label context assembly for product labels.
//!
//! Label rendering is an external concern (an XML template engine); the
//! pipeline only derives the new label name, gathers the context fields, and
//! hands both to a [`LabelWriter`].

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

/// Zero-based line index in a label document holding the observation start
/// time as a `key = value` pair.
pub const OBSERVATION_START_LINE: usize = 53;

/// Errors assembling or delegating a label.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("i/o error reading label {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: no `=`-separated observation start at line {line}", .path.display(), line = OBSERVATION_START_LINE + 1)]
    MissingObservationStart { path: PathBuf },

    /// Failure reported by the external renderer.
    #[error("label writer: {0}")]
    Writer(String),
}

/// Which product a label describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Radiance,
    Reflectance,
}

/// Context handed to the external label template renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelContext {
    /// New label file name without extension.
    pub filename: String,
    /// Name of the source product the original label describes.
    pub source_filename: String,
    /// Creation date, `YYYY-MM-DD`.
    pub creation_date: String,
    /// Observation start time copied from the original label.
    pub observation_start: String,
}

impl LabelContext {
    /// Assemble the context for a new label from the original label document.
    pub fn from_original(new_label: &Path, original_label: &Path) -> Result<Self, LabelError> {
        let text = std::fs::read_to_string(original_label).map_err(|source| LabelError::Io {
            path: original_label.to_path_buf(),
            source,
        })?;

        let observation_start = text
            .lines()
            .nth(OBSERVATION_START_LINE)
            .and_then(|line| line.split_once('='))
            .map(|(_, value)| value.trim().to_string())
            .ok_or_else(|| LabelError::MissingObservationStart {
                path: original_label.to_path_buf(),
            })?;

        let filename = new_label
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        // the product the original label describes sits beside it
        let source_filename = original_label
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
            .replace("LBL", "TAB")
            .replace("lbl", "tab");

        Ok(Self {
            filename,
            source_filename,
            creation_date: Local::now().format("%Y-%m-%d").to_string(),
            observation_start,
        })
    }
}

/// External label renderer: receives the kind, the destination path, and the
/// assembled context.
pub trait LabelWriter {
    fn write_label(
        &self,
        kind: LabelKind,
        path: &Path,
        context: &LabelContext,
    ) -> Result<(), LabelError>;
}
