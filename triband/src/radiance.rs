//! Radiance calibration: PSV records to absolute radiance products.
//!
//! The conversion chain: per-channel dark-offset removal, gain application
//! to photon counts, division by integration time, target area, solid angle
//! and spectral bin width, then conversion from photon flux to energy flux
//! in W·m⁻²·sr⁻¹·µm⁻¹.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{concatenate, s, Array1, Axis};
use thiserror::Error;

use crate::constants::Instrument;
use crate::label::{LabelContext, LabelError, LabelKind, LabelWriter};
use crate::naming;
use crate::product::{CalibratedSpectrum, ProductError};
use crate::record::{RecordError, RecordLayout, SpectrumRecord};
use crate::tables::{GainTable, TableError};

/// Errors during radiance calibration.
#[derive(Debug, Error)]
pub enum RadianceError {
    /// A required header field is missing or not numeric.
    #[error("non-standard header: missing or non-numeric `{field}`")]
    NonStandardHeader { field: &'static str },

    /// The gain table axis does not match the record's sample count.
    #[error("gain table has {table} rows but the record has {record} samples")]
    AxisMismatch { table: usize, record: usize },

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Mean of the dark sub-range subtracted from every sample of a channel.
///
/// Channels are corrected independently; there is no cross-channel
/// normalization.
pub fn remove_offset(channel: &Array1<f64>, dark: &Range<usize>) -> Array1<f64> {
    let mean = channel
        .slice(s![dark.start..dark.end])
        .mean()
        .unwrap_or(0.0);
    channel - mean
}

/// Solid angle subtended by the telescope aperture at the target, in
/// steradians: `π·sin(atan(a/2/d))²`.
pub fn solid_angle(instrument: &Instrument, distance: f64) -> f64 {
    PI * (instrument.aperture_mm / 2.0 / distance).atan().sin().powi(2)
}

/// Area of the field of view projected on the target: `π·(fov·d/2/10)²`.
pub fn area_on_target(instrument: &Instrument, distance: f64) -> f64 {
    PI * (instrument.fov_rad * distance / 2.0 / 10.0).powi(2)
}

/// Integration time in seconds, derived from the two divisor header fields:
/// `(IPBCdivisor · ICTdivisor) / 33e6 + 0.00356`.
pub fn integration_time(headers: &HashMap<String, String>) -> Result<f64, RadianceError> {
    let ipbc = numeric_header(headers, "IPBCdivisor")?;
    let ict = numeric_header(headers, "ICTdivisor")?;
    Ok(((ipbc * ict) / 33_000_000.0) + 0.00356)
}

/// Distance to the target from the record header, required for geometry.
pub fn distance_to_target(headers: &HashMap<String, String>) -> Result<f64, RadianceError> {
    numeric_header(headers, "distToTarget")
}

fn numeric_header(
    headers: &HashMap<String, String>,
    field: &'static str,
) -> Result<f64, RadianceError> {
    headers
        .get(field)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .ok_or(RadianceError::NonStandardHeader { field })
}

/// Radiance of each photon-count sample: `p / t / A / SA / w`.
///
/// The spectral bin width is `w[i] = λ[i+1] − λ[i]`; the last bin width is
/// defined to equal the second-to-last, there being no next wavelength to
/// difference against.
pub fn radiance(
    photons: &Array1<f64>,
    wavelength: &Array1<f64>,
    t_int: f64,
    area: f64,
    solid_angle: f64,
) -> Array1<f64> {
    let rad = photons / t_int / area / solid_angle;

    let n = wavelength.len();
    let mut width = Array1::zeros(n);
    for i in 0..n.saturating_sub(1) {
        width[i] = wavelength[i + 1] - wavelength[i];
    }
    if n >= 2 {
        width[n - 1] = width[n - 2];
    }
    rad / width
}

/// Convert photon-flux radiance to energy flux in W·m⁻²·sr⁻¹·µm⁻¹:
/// `rad · hc / (λ·1e−9) · 1e7`.
pub fn to_output_units(
    radiance: &Array1<f64>,
    wavelength: &Array1<f64>,
    instrument: &Instrument,
) -> Array1<f64> {
    (radiance * instrument.hc) / (wavelength * 1e-9) * 1e7
}

/// One-file radiance calibration: parse, correct, convert, write.
pub struct RadianceCalibrator {
    layout: RecordLayout,
    instrument: Instrument,
    gain: GainTable,
}

impl RadianceCalibrator {
    pub fn new(layout: RecordLayout, instrument: Instrument, gain: GainTable) -> Self {
        Self {
            layout,
            instrument,
            gain,
        }
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Calibrate a parsed record to a spectrum in output units.
    pub fn calibrate(&self, record: &SpectrumRecord) -> Result<CalibratedSpectrum, RadianceError> {
        let uv = remove_offset(&record.uv, &self.layout.uv_dark);
        let vis = remove_offset(&record.vis, &self.layout.vis_dark);
        let vnir = remove_offset(&record.vnir, &self.layout.vnir_dark);

        let distance = distance_to_target(&record.headers)?;
        let t_int = integration_time(&record.headers)?;
        let sa = solid_angle(&self.instrument, distance);
        let area = area_on_target(&self.instrument, distance);

        // uv, vis, vnir concatenation order matches the ascending gain axis
        let counts = concatenate![Axis(0), uv, vis, vnir];
        if counts.len() != self.gain.len() {
            return Err(RadianceError::AxisMismatch {
                table: self.gain.len(),
                record: counts.len(),
            });
        }

        let photons = &counts * &self.gain.gain;
        let rad = radiance(&photons, &self.gain.wavelength, t_int, area, sa);
        let values = to_output_units(&rad, &self.gain.wavelength, &self.instrument);

        Ok(CalibratedSpectrum {
            wavelength: self.gain.wavelength.clone(),
            values,
            header_block: Some(record.header_block.clone()),
        })
    }

    /// Calibrate an input file and write the RAD product beside it or into
    /// `out_dir`. Regenerates the companion label when the input has one.
    /// Returns the product path.
    pub fn calibrate_file(
        &self,
        input: &Path,
        out_dir: Option<&Path>,
        label_writer: Option<&dyn LabelWriter>,
    ) -> Result<PathBuf, RadianceError> {
        let record = SpectrumRecord::from_file(input, &self.layout)?;
        let spectrum = self.calibrate(&record)?;

        let out = naming::rad_product_name(input, out_dir);
        spectrum.write(&out)?;
        log::info!("{} calibrated and written to {}", input.display(), out.display());

        let original_label = naming::original_label_name(input);
        if original_label.is_file() {
            if let Some(writer) = label_writer {
                let new_label = naming::derived_label_name(&original_label, &out, "RAD", "rad");
                let context = LabelContext::from_original(&new_label, &original_label)?;
                writer.write_label(LabelKind::Radiance, &new_label, &context)?;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn offset_removal_zeroes_the_dark_region_mean() {
        let channel = array![10.0, 12.0, 100.0, 200.0, 300.0];
        let corrected = remove_offset(&channel, &(0..2));
        let dark_mean = corrected.slice(s![0..2]).mean().unwrap();
        assert_relative_eq!(dark_mean, 0.0, epsilon = 1e-12);
        assert_relative_eq!(corrected[2], 89.0, epsilon = 1e-12);
    }

    #[test]
    fn geometry_matches_the_closed_forms() {
        let instrument = Instrument::default();
        let distance = 1500.0;
        let expected_sa = PI * (108.4_f64 / 2.0 / 1500.0).atan().sin().powi(2);
        let expected_area = PI * (0.0006565_f64 * 1500.0 / 2.0 / 10.0).powi(2);
        assert_relative_eq!(solid_angle(&instrument, distance), expected_sa);
        assert_relative_eq!(area_on_target(&instrument, distance), expected_area);
    }

    #[test]
    fn integration_time_uses_both_divisors() {
        let headers = headers(&[("IPBCdivisor", " 50"), ("ICTdivisor", " 2277")]);
        let t = integration_time(&headers).unwrap();
        assert_relative_eq!(t, (50.0 * 2277.0) / 33_000_000.0 + 0.00356, epsilon = 1e-15);
    }

    #[test]
    fn missing_divisor_is_a_non_standard_header() {
        let headers = headers(&[("IPBCdivisor", "50")]);
        let err = integration_time(&headers).unwrap_err();
        assert!(matches!(
            err,
            RadianceError::NonStandardHeader {
                field: "ICTdivisor"
            }
        ));
    }

    #[test]
    fn non_numeric_distance_is_a_non_standard_header() {
        let headers = headers(&[("distToTarget", "unknown")]);
        let err = distance_to_target(&headers).unwrap_err();
        assert!(matches!(
            err,
            RadianceError::NonStandardHeader {
                field: "distToTarget"
            }
        ));
    }

    #[test]
    fn last_bin_width_duplicates_the_second_to_last() {
        // uneven spacing so the duplicated width is distinguishable
        let wavelength = array![100.0, 110.0, 130.0, 170.0];
        let photons = array![1.0, 1.0, 1.0, 1.0];
        let rad = radiance(&photons, &wavelength, 1.0, 1.0, 1.0);

        assert_relative_eq!(rad[0], 1.0 / 10.0, epsilon = 1e-12);
        assert_relative_eq!(rad[1], 1.0 / 20.0, epsilon = 1e-12);
        assert_relative_eq!(rad[2], 1.0 / 40.0, epsilon = 1e-12);
        // last width equals the second-to-last (40), not zero
        assert_relative_eq!(rad[3], 1.0 / 40.0, epsilon = 1e-12);
    }

    #[test]
    fn output_units_scale_by_photon_energy() {
        let instrument = Instrument::default();
        let rad = array![2.0];
        let wavelength = array![500.0];
        let out = to_output_units(&rad, &wavelength, &instrument);
        let expected = 2.0 * 1.99e-25 / (500.0 * 1e-9) * 1e7;
        assert_relative_eq!(out[0], expected, epsilon = 1e-20);
    }
}
