//! Instrument constants for radiometric conversion.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors loading instrument constants from a file.
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("i/o error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid instrument constants: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optical and physical constants of the instrument.
///
/// Defaults are the flight values. A JSON object with any subset of the
/// field names overrides them, e.g. for bench units:
///
/// ```json
/// { "aperture_mm": 110.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Instrument {
    /// Telescope aperture diameter in millimetres.
    pub aperture_mm: f64,
    /// Angular field of view in radians.
    pub fov_rad: f64,
    /// Planck constant times the speed of light, J·m.
    pub hc: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            aperture_mm: 108.4,
            fov_rad: 0.0006565,
            hc: 1.99e-25,
        }
    }
}

impl Instrument {
    /// Load constants from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, InstrumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| InstrumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}
