//! TRIBAND - three-channel mast spectrometer calibration core.
//!
//! Converts raw PSV spectrometer records (UV, VIS, and VNIR channels behind
//! a fixed-layout text header) into calibrated products:
//!
//! - **RAD**: absolute radiance in W·m⁻²·sr⁻¹·µm⁻¹, via dark-offset removal,
//!   gain application, and the radiometric geometry of the observation;
//! - **REF**: relative reflectance, a RAD product divided by the laboratory
//!   calibration target matching the observation's integration time and
//!   convolved with the lab bidirectional-reflectance spectrum.
//!
//! The crate is a pure library: batch traversal, progress reporting, and
//! warning dialogs live with the caller.

pub mod constants;
pub mod label;
pub mod naming;
pub mod product;
pub mod radiance;
pub mod record;
pub mod reflectance;
pub mod tables;

// Re-exports for the common calibration entry points
pub use constants::Instrument;
pub use product::CalibratedSpectrum;
pub use radiance::RadianceCalibrator;
pub use record::{RecordLayout, SpectrumRecord};
pub use reflectance::{ExposureClass, ReflectanceCalibrator};
pub use tables::{GainTable, ReferenceSet, TargetSpectrum};
