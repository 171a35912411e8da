//! Shared fixtures for surveyor integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use surveyor::feedback::{ProgressSink, WarningDecision, WarningKind, WarningSink};
use triband::constants::Instrument;
use triband::radiance::RadianceCalibrator;
use triband::record::RecordLayout;
use triband::reflectance::ReflectanceCalibrator;
use triband::tables::{GainTable, ReferenceSet};

/// Scaled-down record layout: 4-line header, three 4-sample channels.
pub fn tiny_layout() -> RecordLayout {
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

/// Spectral axis of the 12-channel test gain table.
pub fn test_wavelengths() -> Vec<f64> {
    (1..=12).map(|i| f64::from(i * 100)).collect()
}

/// Divisor pairs whose integration times round to the standard exposures.
pub fn divisors_for(millis: u32) -> (&'static str, &'static str) {
    match millis {
        7 => ("50", "2277"),
        34 => ("1000", "1004.52"),
        404 => ("1000", "13214.52"),
        5004 => ("1000", "165014.52"),
        _ => panic!("no divisors defined for {millis} ms"),
    }
}

/// Divisor pair rounding to 104 ms, outside the standard exposures.
pub const OFF_NOMINAL_DIVISORS: (&str, &str) = ("1000", "3300");

/// A complete PSV record under the tiny layout. Signal levels are chosen so
/// the calibrated values survive the product format's six decimal places.
pub fn psv_text(ipbc: &str, ict: &str) -> String {
    let mut lines = vec![
        "\"distToTarget: 1000\"".to_string(),
        format!("\"IPBCdivisor: {ipbc}\""),
        format!("\"ICTdivisor: {ict}\""),
        "\">>>>Begin Table 1\"".to_string(),
    ];
    for v in [
        1.0e9, 1.0e9, 3.0e9, 3.0e9, 2.0e9, 2.0e9, 4.0e9, 4.0e9, 1.0e9, 1.0e9, 3.0e9, 3.0e9,
    ] {
        lines.push(format!("{v}"));
    }
    lines.join("\n")
}

pub fn write_psv(dir: &Path, name: &str, divisors: (&str, &str)) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, psv_text(divisors.0, divisors.1)).unwrap();
    path
}

/// A custom calibration target: PSV-style header carrying its own
/// integration time, then the value table.
pub fn custom_target_text(divisors: (&str, &str), value: f64) -> String {
    let mut lines = vec![
        format!("\"IPBCdivisor: {}\"", divisors.0),
        format!("\"ICTdivisor: {}\"", divisors.1),
        "\">>>>Begin values\"".to_string(),
    ];
    for wl in test_wavelengths() {
        lines.push(format!("{wl} {value}"));
    }
    lines.join("\n")
}

/// Calibration directory with the gain table, the four exposure targets
/// (target value = exposure millis), and the lab spectrum (value 0.5), all
/// on the 12-channel axis.
pub fn write_caldata(root: &Path) -> ReferenceSet {
    fs::create_dir_all(root).unwrap();

    let mut gain = String::new();
    for wl in test_wavelengths() {
        gain.push_str(&format!("{wl} 2.0\n"));
    }
    fs::write(root.join("gain_mars.tab"), gain).unwrap();

    for millis in [7u32, 34, 404, 5004] {
        let mut body = format!("\"sol76 target, {millis} ms\"\n");
        for wl in test_wavelengths() {
            body.push_str(&format!("{wl} {millis}\n"));
        }
        fs::write(root.join(format!("target_{millis}ms.tab")), body).unwrap();
    }

    let mut lab = String::new();
    for wl in test_wavelengths() {
        lab.push_str(&format!("{wl} 0.5\n"));
    }
    fs::write(root.join("lab_bidirectional.tab"), lab).unwrap();

    ReferenceSet::from_dir(root)
}

pub fn radiance_calibrator(refs: &ReferenceSet) -> RadianceCalibrator {
    let gain = GainTable::from_file(&refs.gain_table_path()).unwrap();
    RadianceCalibrator::new(tiny_layout(), Instrument::default(), gain)
}

pub fn reflectance_calibrator(refs: &ReferenceSet) -> ReflectanceCalibrator {
    ReflectanceCalibrator::new(refs.clone(), radiance_calibrator(refs))
}

/// Progress sink recording every reported percentage.
#[derive(Default)]
pub struct RecordingProgress(pub Mutex<Vec<u8>>);

impl RecordingProgress {
    pub fn reports(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report_progress(&self, percent: u8) {
        self.0.lock().unwrap().push(percent);
    }
}

/// Warning sink recording every prompt and answering a fixed decision.
pub struct RecordingWarnings {
    pub decision: WarningDecision,
    pub asked: Mutex<Vec<WarningKind>>,
}

impl RecordingWarnings {
    pub fn answering(decision: WarningDecision) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn kinds(&self) -> Vec<WarningKind> {
        self.asked.lock().unwrap().clone()
    }
}

impl WarningSink for RecordingWarnings {
    fn ask_warning(&self, kind: WarningKind, _message: &str) -> WarningDecision {
        self.asked.lock().unwrap().push(kind);
        self.decision
    }
}
