//! End-to-end radiance calibration against a scaled-down record layout.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use triband::constants::Instrument;
use triband::label::{LabelContext, LabelError, LabelKind, LabelWriter};
use triband::radiance::{RadianceCalibrator, RadianceError};
use triband::record::{RecordLayout, SpectrumRecord};
use triband::tables::GainTable;

/// Scaled-down layout: 4-line header, three 4-sample channels.
fn tiny_layout() -> RecordLayout {
    RecordLayout {
        header_lines: 4,
        vnir: 12..16,
        vis: 8..12,
        uv: 4..8,
        vnir_dark: 0..2,
        vis_dark: 0..2,
        uv_dark: 0..2,
    }
}

fn test_wavelengths() -> Vec<f64> {
    (1..=12).map(|i| f64::from(i * 100)).collect()
}

fn psv_text() -> String {
    let mut lines = vec![
        "\"distToTarget: 1000\"".to_string(),
        "\"IPBCdivisor: 50\"".to_string(),
        "\"ICTdivisor: 2277\"".to_string(),
        "\">>>>Begin Table 1\"".to_string(),
    ];
    // uv, vis, vnir slices; each dark pair followed by two signal samples
    for v in [
        1.0e9, 1.0e9, 3.0e9, 3.0e9, 2.0e9, 2.0e9, 4.0e9, 4.0e9, 1.0e9, 1.0e9, 3.0e9, 3.0e9,
    ] {
        lines.push(format!("{v}"));
    }
    lines.join("\n")
}

fn write_gain_table(dir: &TempDir) -> PathBuf {
    let mut body = String::new();
    for wl in test_wavelengths() {
        body.push_str(&format!("{wl} 2.0\n"));
    }
    let path = dir.path().join("gain_mars.tab");
    fs::write(&path, body).unwrap();
    path
}

/// The RAD product this fixture must produce, computed independently of the
/// engine with the documented formulas.
fn expected_rad_bytes() -> String {
    let wavelengths = test_wavelengths();
    // dark-corrected DN in uv, vis, vnir order
    let counts = [
        0.0, 0.0, 2.0e9, 2.0e9, 0.0, 0.0, 2.0e9, 2.0e9, 0.0, 0.0, 2.0e9, 2.0e9,
    ];

    let t_int = ((50.0 * 2277.0) / 33_000_000.0) + 0.00356;
    let solid_angle = PI * (108.4_f64 / 2.0 / 1000.0).atan().sin().powi(2);
    let area = PI * (0.0006565_f64 * 1000.0 / 2.0 / 10.0).powi(2);

    let mut out = String::new();
    for line in psv_text().lines().take(4) {
        out.push_str(line);
        out.push_str("\r\n");
    }
    let n = wavelengths.len();
    for i in 0..n {
        let photons = counts[i] * 2.0;
        let width = if i + 1 < n {
            wavelengths[i + 1] - wavelengths[i]
        } else {
            wavelengths[n - 1] - wavelengths[n - 2]
        };
        let radiance = photons / t_int / area / solid_angle / width;
        let value = radiance * 1.99e-25 / (wavelengths[i] * 1e-9) * 1e7;
        out.push_str(&format!(
            "{:10.3}{:20.6}            \r\n",
            wavelengths[i], value
        ));
    }
    out
}

#[test]
fn fixture_record_reproduces_the_golden_rad_product() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("CL0_a_psv_1.tab");
    fs::write(&input, psv_text()).unwrap();
    let gain = GainTable::from_file(&write_gain_table(&dir)).unwrap();

    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);
    let out = calibrator.calibrate_file(&input, None, None).unwrap();

    assert_eq!(out, dir.path().join("CL0_a_rad_1.tab"));
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written, expected_rad_bytes());
}

#[test]
fn calibration_is_deterministic_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("CL0_a_psv_1.tab");
    fs::write(&input, psv_text()).unwrap();
    let gain = GainTable::from_file(&write_gain_table(&dir)).unwrap();
    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);

    let out = calibrator.calibrate_file(&input, None, None).unwrap();
    let first = fs::read(&out).unwrap();
    calibrator.calibrate_file(&input, None, None).unwrap();
    let second = fs::read(&out).unwrap();
    assert_eq!(first, second);
}

#[test]
fn output_directory_redirects_the_product() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    let input = dir.path().join("CL0_a_psv_1.tab");
    fs::write(&input, psv_text()).unwrap();
    let gain = GainTable::from_file(&write_gain_table(&dir)).unwrap();

    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);
    let out = calibrator.calibrate_file(&input, Some(&out_dir), None).unwrap();
    assert_eq!(out, out_dir.join("CL0_a_rad_1.tab"));
    assert!(out.is_file());
}

#[derive(Default)]
struct RecordingLabels(Mutex<Vec<(LabelKind, PathBuf, LabelContext)>>);

impl LabelWriter for RecordingLabels {
    fn write_label(
        &self,
        kind: LabelKind,
        path: &Path,
        context: &LabelContext,
    ) -> Result<(), LabelError> {
        self.0
            .lock()
            .unwrap()
            .push((kind, path.to_path_buf(), context.clone()));
        Ok(())
    }
}

#[test]
fn companion_label_is_regenerated_beside_the_product() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("CL0_a_psv_1.tab");
    fs::write(&input, psv_text()).unwrap();

    // a label document with the observation start at its fixed line
    let mut label_lines: Vec<String> =
        (0..53).map(|i| format!("FIELD_{i} = value_{i}")).collect();
    label_lines.push("START_TIME = 2013-01-17T01:00:00".to_string());
    fs::write(dir.path().join("CL0_a_psv_1.lbl"), label_lines.join("\n")).unwrap();

    let gain = GainTable::from_file(&write_gain_table(&dir)).unwrap();
    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);
    let labels = RecordingLabels::default();
    calibrator
        .calibrate_file(&input, None, Some(&labels))
        .unwrap();

    let written = labels.0.lock().unwrap();
    assert_eq!(written.len(), 1);
    let (kind, path, context) = &written[0];
    assert_eq!(*kind, LabelKind::Radiance);
    assert_eq!(*path, dir.path().join("CL0_a_rad_1.xml"));
    assert_eq!(context.filename, "CL0_a_rad_1");
    assert_eq!(context.source_filename, "CL0_a_psv_1.tab");
    assert_eq!(context.observation_start, "2013-01-17T01:00:00");
}

#[test]
fn missing_geometry_header_is_non_standard() {
    let text = psv_text().replace("distToTarget", "somethingElse");
    let record = SpectrumRecord::parse(&text, &tiny_layout()).unwrap();

    let dir = TempDir::new().unwrap();
    let gain = GainTable::from_file(&write_gain_table(&dir)).unwrap();
    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);

    let err = calibrator.calibrate(&record).unwrap_err();
    assert!(matches!(
        err,
        RadianceError::NonStandardHeader {
            field: "distToTarget"
        }
    ));
}

#[test]
fn gain_axis_must_match_the_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gain_mars.tab");
    fs::write(&path, "100 2.0\n200 2.0\n").unwrap();
    let gain = GainTable::from_file(&path).unwrap();

    let record = SpectrumRecord::parse(&psv_text(), &tiny_layout()).unwrap();
    let calibrator = RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain);
    let err = calibrator.calibrate(&record).unwrap_err();
    assert!(matches!(
        err,
        RadianceError::AxisMismatch {
            table: 2,
            record: 12
        }
    ));
}
