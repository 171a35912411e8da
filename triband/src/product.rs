//! Calibrated product files.
//!
//! RAD and REF products are two-column fixed-width text: wavelength to three
//! decimal places in a 10-character field, value to six decimal places in a
//! 20-character field, twelve trailing spaces, CRLF line endings. An optional
//! verbatim header block precedes the table, its line endings normalized to
//! CRLF.

use std::fs;
use std::io::{BufWriter, Write};
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;

/// Errors reading or writing a product file.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("i/o error on {}: {source}", .path.display())]
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

    #[error("wavelength and value columns differ in length: {wavelengths} vs {values}")]
    LengthMismatch { wavelengths: usize, values: usize },
}

/// A calibrated spectrum ready to be written as a product file.
#[derive(Debug, Clone)]
pub struct CalibratedSpectrum {
    /// Spectral axis in nanometres.
    pub wavelength: Array1<f64>,
    /// Calibrated values, one per wavelength.
    pub values: Array1<f64>,
    /// Verbatim header block copied from the source record, if any.
    pub header_block: Option<Vec<String>>,
}

impl CalibratedSpectrum {
    /// Write the product in fixed-width two-column format.
    pub fn write(&self, path: &Path) -> Result<(), ProductError> {
        if self.wavelength.len() != self.values.len() {
            return Err(ProductError::LengthMismatch {
                wavelengths: self.wavelength.len(),
                values: self.values.len(),
            });
        }

        let file = fs::File::create(path).map_err(|source| io_error(path, source))?;
        let mut out = BufWriter::new(file);

        if let Some(header) = &self.header_block {
            for line in header {
                let line = line.trim_end_matches(['\r', '\n']);
                write!(out, "{line}\r\n").map_err(|source| io_error(path, source))?;
            }
        }
        for (wavelength, value) in self.wavelength.iter().zip(self.values.iter()) {
            write!(out, "{wavelength:10.3}{value:20.6}            \r\n")
                .map_err(|source| io_error(path, source))?;
        }
        out.flush().map_err(|source| io_error(path, source))?;
        Ok(())
    }
}

/// Read the value column of a product, skipping its header block.
pub fn read_values(path: &Path, header_lines: usize) -> Result<Array1<f64>, ProductError> {
    let text = fs::read_to_string(path).map_err(|source| io_error(path, source))?;

    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate().skip(header_lines) {
        let mut columns = line.split_whitespace();
        let _wavelength = columns.next().ok_or_else(|| ProductError::MissingColumn {
            path: path.to_path_buf(),
            line: idx + 1,
        })?;
        let value = columns
            .next()
            .ok_or_else(|| ProductError::MissingColumn {
                path: path.to_path_buf(),
                line: idx + 1,
            })?
            .parse::<f64>()
            .map_err(|source| ProductError::BadNumber {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
        values.push(value);
    }
    Ok(Array1::from_vec(values))
}

fn io_error(path: &Path, source: std::io::Error) -> ProductError {
    ProductError::Io {
        path: path.to_path_buf(),
        source,
    }
}
