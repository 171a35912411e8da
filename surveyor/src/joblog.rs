//! Append-only job logs for declined and failed files.
//!
//! One line per file, `"<path>: <stage> - <reason>"`. A batch writes to the
//! main decline log and, for exposure-time problems, to a dedicated
//! exposure-time log.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

/// Failure to append to a job log.
#[derive(Debug, Error)]
#[error("cannot append to log {}: {source}", .path.display())]
pub struct LogError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Pipeline stage a log entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RadianceInput,
    RadianceCalibration,
    ReflectanceInput,
    ReflectanceCalibration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::RadianceInput => "radiance input",
            Stage::RadianceCalibration => "radiance calibration",
            Stage::ReflectanceInput => "relative reflectance input",
            Stage::ReflectanceCalibration => "relative reflectance calibration",
        })
    }
}

/// Append-only decline/failure log.
#[derive(Debug, Clone)]
pub struct BatchLog {
    path: PathBuf,
}

impl BatchLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log in the working directory with a `YYYYmmdd.HHMMSS` stamp, e.g.
    /// `bad_input_20130117.153042.log`.
    pub fn timestamped(prefix: &str) -> Self {
        Self::new(format!(
            "{prefix}_{}.log",
            Local::now().format("%Y%m%d.%H%M%S")
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry; the file is created on first use.
    pub fn append(&self, file: &Path, stage: Stage, reason: &str) -> Result<(), LogError> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| LogError {
                path: self.path.clone(),
                source,
            })?;
        writeln!(log, "{}: {} - {}", file.display(), stage, reason).map_err(|source| LogError {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}
