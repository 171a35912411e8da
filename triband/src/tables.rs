//! Calibration reference tables.
//!
//! All reference tables are two-column whitespace text files. The gain table
//! converts digital numbers to photon counts and its wavelength column is the
//! canonical spectral axis of every RAD and REF product. Target spectra are
//! the cosine-corrected calibration targets (one per standard integration
//! time) and the laboratory bidirectional-reflectance spectrum.

use std::fs;
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;

/// Errors loading a reference table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("i/o error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: expected `wavelength value` columns", .path.display())]
    MissingColumn { path: PathBuf, line: usize },

    #[error("{}:{line}: not a number: {source}", .path.display())]
    BadNumber {
        path: PathBuf,
        line: usize,
        #[source]
        source: ParseFloatError,
    },

    #[error("{}: wavelengths must be strictly ascending (row {line})", .path.display())]
    NotAscending { path: PathBuf, line: usize },
}

/// Wavelength/gain pairs converting DN to photons, ascending wavelength.
#[derive(Debug, Clone)]
pub struct GainTable {
    /// Spectral axis in nanometres, strictly ascending.
    pub wavelength: Array1<f64>,
    /// Gain (photons per DN) for each wavelength.
    pub gain: Array1<f64>,
}

impl GainTable {
    /// Load from two-column whitespace text, validating the axis.
    pub fn from_file(path: &Path) -> Result<Self, TableError> {
        let (wavelength, gain) = read_two_columns(path, false)?;
        for i in 1..wavelength.len() {
            if wavelength[i] <= wavelength[i - 1] {
                return Err(TableError::NotAscending {
                    path: path.to_path_buf(),
                    line: i + 1,
                });
            }
        }
        Ok(Self {
            wavelength: Array1::from_vec(wavelength),
            gain: Array1::from_vec(gain),
        })
    }

    /// Number of spectral channels.
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

/// A calibration target spectrum: wavelength/value pairs.
///
/// Lines containing a quote character are header lines and skipped.
#[derive(Debug, Clone)]
pub struct TargetSpectrum {
    /// Spectral axis in nanometres.
    pub wavelength: Array1<f64>,
    /// Reference values, one per wavelength.
    pub values: Array1<f64>,
}

impl TargetSpectrum {
    pub fn from_file(path: &Path) -> Result<Self, TableError> {
        let (wavelength, values) = read_two_columns(path, true)?;
        Ok(Self {
            wavelength: Array1::from_vec(wavelength),
            values: Array1::from_vec(values),
        })
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

/// Resolves the reference tables from a calibration data directory.
///
/// File names are fixed: `gain_mars.tab` for the gain table,
/// `target_<N>ms.tab` for the four exposure targets, and
/// `lab_bidirectional.tab` for the laboratory spectrum.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    root: PathBuf,
}

impl ReferenceSet {
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn gain_table_path(&self) -> PathBuf {
        self.root.join("gain_mars.tab")
    }

    /// Path of the cosine-corrected target for an integration time in
    /// milliseconds.
    pub fn target_path(&self, millis: u32) -> PathBuf {
        self.root.join(format!("target_{millis}ms.tab"))
    }

    pub fn lab_spectrum_path(&self) -> PathBuf {
        self.root.join("lab_bidirectional.tab")
    }
}

fn read_two_columns(path: &Path, skip_quoted: bool) -> Result<(Vec<f64>, Vec<f64>), TableError> {
    let text = fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut first = Vec::new();
    let mut second = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() || (skip_quoted && line.contains('"')) {
            continue;
        }
        let mut columns = line.split_whitespace();
        let a = parse_column(columns.next(), path, idx)?;
        let b = parse_column(columns.next(), path, idx)?;
        first.push(a);
        second.push(b);
    }
    Ok((first, second))
}

fn parse_column(column: Option<&str>, path: &Path, idx: usize) -> Result<f64, TableError> {
    let column = column.ok_or_else(|| TableError::MissingColumn {
        path: path.to_path_buf(),
        line: idx + 1,
    })?;
    column.parse::<f64>().map_err(|source| TableError::BadNumber {
        path: path.to_path_buf(),
        line: idx + 1,
        source,
    })
}
