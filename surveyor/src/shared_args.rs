//! Common arguments and console plumbing shared by the calibration binaries.

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::driver::InputSource;
use crate::feedback::{ProgressSink, WarningDecision, WarningKind, WarningSink};

/// Input selection and reference data arguments shared by both stages.
#[derive(Parser, Debug, Clone)]
pub struct SharedBatchArgs {
    /// Single PSV *.tab or *.txt file to calibrate
    #[arg(short = 'f', long, value_name = "FILE", conflicts_with_all = ["directory", "list"])]
    pub file: Option<PathBuf>,

    /// Directory tree to calibrate recursively
    #[arg(short = 'd', long, value_name = "DIR", conflicts_with = "list")]
    pub directory: Option<PathBuf>,

    /// Text file with one input path per line
    #[arg(short = 'l', long, value_name = "LIST")]
    pub list: Option<PathBuf>,

    /// Directory for output products (defaults beside each input)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Calibration reference data directory
    #[arg(long, value_name = "DIR", default_value = "caldata")]
    pub cal_dir: PathBuf,

    /// JSON file overriding the instrument constants
    #[arg(long, value_name = "JSON")]
    pub constants: Option<PathBuf>,
}

impl SharedBatchArgs {
    /// The batch input; exactly one of the three modes must be given.
    pub fn input_source(&self) -> Result<InputSource, &'static str> {
        match (&self.file, &self.directory, &self.list) {
            (Some(file), None, None) => Ok(InputSource::File(file.clone())),
            (None, Some(dir), None) => Ok(InputSource::Directory(dir.clone())),
            (None, None, Some(list)) => Ok(InputSource::FileList(list.clone())),
            _ => Err("exactly one of --file, --directory, or --list is required"),
        }
    }
}

/// Progress sink drawing a terminal progress bar.
pub struct BarProgress(ProgressBar);

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos:>3}%").expect("static template"),
        );
        Self(bar)
    }

    pub fn finish(&self) {
        self.0.finish();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn report_progress(&self, percent: u8) {
        self.0.set_position(u64::from(percent));
    }
}

/// Non-interactive warning sink: reports each kind once, then suppresses it.
pub struct ConsoleWarnings;

impl WarningSink for ConsoleWarnings {
    fn ask_warning(&self, _kind: WarningKind, message: &str) -> WarningDecision {
        eprintln!("warning: {message}");
        WarningDecision::Suppress
    }
}
