//! Relative reflectance calibration: RAD products against laboratory
//! targets.
//!
//! Reflectance is computed from a radiance product, never from the raw
//! record: when the companion RAD file is missing (or a rebuild is
//! requested) the radiance stage runs first. The RAD values are divided by
//! the calibration target matching the observation's integration time, then
//! multiplied by the laboratory bidirectional-reflectance spectrum.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;

use crate::label::{LabelContext, LabelError, LabelKind, LabelWriter};
use crate::naming;
use crate::product::{self, CalibratedSpectrum, ProductError};
use crate::radiance::{self, RadianceCalibrator, RadianceError};
use crate::record::{self, RecordError};
use crate::tables::{ReferenceSet, TableError, TargetSpectrum};

/// Errors during relative reflectance calibration.
#[derive(Debug, Error)]
pub enum ReflectanceError {
    /// Integration time does not round to one of the four standard values.
    #[error("exposure time {millis} ms is not one of 7, 34, 404, or 5004")]
    NonStandardExposureTime { millis: i64 },

    /// A custom target's integration time disagrees with the input's.
    #[error("input exposure {input_millis} ms does not match custom target {target_millis} ms")]
    MismatchedExposureTime { input_millis: i64, target_millis: i64 },

    /// Neither a PSV record nor an existing RAD product backs this input.
    #[error("no RAD product available for {}", .path.display())]
    NoRadSource { path: PathBuf },

    /// Target or laboratory spectrum does not share the product's axis.
    #[error("{what} has {got} rows, expected {expected}")]
    AxisMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Radiance(#[from] RadianceError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// The four standard integration times, keyed by their rounded millisecond
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureClass {
    Ms7,
    Ms34,
    Ms404,
    Ms5004,
}

impl ExposureClass {
    /// Classify an integration time in seconds, rounding to the nearest
    /// millisecond.
    pub fn classify(t_int: f64) -> Result<Self, ReflectanceError> {
        match (t_int * 1000.0).round() as i64 {
            7 => Ok(Self::Ms7),
            34 => Ok(Self::Ms34),
            404 => Ok(Self::Ms404),
            5004 => Ok(Self::Ms5004),
            millis => Err(ReflectanceError::NonStandardExposureTime { millis }),
        }
    }

    /// Rounded exposure duration in milliseconds.
    pub fn millis(self) -> u32 {
        match self {
            Self::Ms7 => 7,
            Self::Ms34 => 34,
            Self::Ms404 => 404,
            Self::Ms5004 => 5004,
        }
    }
}

/// Divide product values by target values; `inf`/`NaN` quotients become 0.
///
/// Saturated or zero-signal channels divide to non-finite values; the
/// product format defines those samples as exactly zero.
pub fn divide_by_target(values: &Array1<f64>, target: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(values.iter().zip(target.iter()).map(|(v, t)| {
        let quotient = v / t;
        if quotient.is_finite() {
            quotient
        } else {
            0.0
        }
    }))
}

/// One-file reflectance calibration.
pub struct ReflectanceCalibrator {
    refs: ReferenceSet,
    radiance: RadianceCalibrator,
}

impl ReflectanceCalibrator {
    pub fn new(refs: ReferenceSet, radiance: RadianceCalibrator) -> Self {
        Self { refs, radiance }
    }

    /// Calibrate one input to a REF product, producing the intermediate RAD
    /// product first when needed. Returns the REF path.
    pub fn calibrate_file(
        &self,
        input: &Path,
        custom_target: Option<&Path>,
        out_dir: Option<&Path>,
        overwrite_rad: bool,
        label_writer: Option<&dyn LabelWriter>,
    ) -> Result<PathBuf, ReflectanceError> {
        let rad = self.ensure_rad(input, out_dir, overwrite_rad, label_writer)?;
        let target = self.select_target(&rad, custom_target)?;

        let rad_values = product::read_values(&rad, self.radiance.layout().header_lines)?;
        if target.len() != rad_values.len() {
            return Err(ReflectanceError::AxisMismatch {
                what: "calibration target",
                expected: rad_values.len(),
                got: target.len(),
            });
        }
        let divided = divide_by_target(&rad_values, &target.values);

        let lab = TargetSpectrum::from_file(&self.refs.lab_spectrum_path())?;
        if lab.len() != divided.len() {
            return Err(ReflectanceError::AxisMismatch {
                what: "laboratory spectrum",
                expected: divided.len(),
                got: lab.len(),
            });
        }
        let values = &divided * &lab.values;

        let out = naming::ref_product_name(&rad, out_dir);
        let spectrum = CalibratedSpectrum {
            wavelength: target.wavelength.clone(),
            values,
            header_block: None,
        };
        spectrum.write(&out)?;
        log::info!("{} calibrated and written to {}", input.display(), out.display());

        let original_label = naming::psv_label_name(input);
        if original_label.is_file() {
            if let Some(writer) = label_writer {
                let new_label = naming::derived_label_name(&original_label, &out, "REF", "ref");
                let context = LabelContext::from_original(&new_label, &original_label)?;
                writer.write_label(LabelKind::Reflectance, &new_label, &context)?;
            }
        }

        Ok(out)
    }

    /// Locate or produce the RAD product this input depends on.
    fn ensure_rad(
        &self,
        input: &Path,
        out_dir: Option<&Path>,
        overwrite_rad: bool,
        label_writer: Option<&dyn LabelWriter>,
    ) -> Result<PathBuf, ReflectanceError> {
        let rad = naming::rad_product_name(input, out_dir);
        if !overwrite_rad && rad.is_file() && naming::is_rad_product(&rad) {
            log::debug!("reusing existing RAD product {}", rad.display());
            return Ok(rad);
        }

        if naming::is_radiance_candidate(input) {
            return Ok(self.radiance.calibrate_file(input, out_dir, label_writer)?);
        }
        if input.is_file() && naming::is_rad_product(input) {
            return Ok(input.to_path_buf());
        }
        Err(ReflectanceError::NoRadSource {
            path: input.to_path_buf(),
        })
    }

    /// Select the calibration target for a RAD product's integration time.
    ///
    /// A custom target file substitutes for every slot, but its own
    /// integration time must agree with the input's.
    pub fn select_target(
        &self,
        rad_file: &Path,
        custom_target: Option<&Path>,
    ) -> Result<TargetSpectrum, ReflectanceError> {
        let text = fs::read_to_string(rad_file).map_err(RecordError::Io)?;
        let headers = record::parse_header(&text)?;
        let t_int = radiance::integration_time(&headers)?;
        let class = ExposureClass::classify(t_int)?;

        let path = match custom_target {
            Some(custom) => {
                let custom_text = fs::read_to_string(custom).map_err(RecordError::Io)?;
                let custom_headers = record::parse_header(&custom_text)?;
                let custom_t = radiance::integration_time(&custom_headers)?;
                let custom_millis = (custom_t * 1000.0).round() as i64;
                if custom_millis != i64::from(class.millis()) {
                    return Err(ReflectanceError::MismatchedExposureTime {
                        input_millis: i64::from(class.millis()),
                        target_millis: custom_millis,
                    });
                }
                custom.to_path_buf()
            }
            None => self.refs.target_path(class.millis()),
        };
        Ok(TargetSpectrum::from_file(&path)?)
    }
}
