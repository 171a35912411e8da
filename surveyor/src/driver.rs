//! Batch traversal and per-file outcome routing.
//!
//! A batch processes a single file, an explicit file list, or a directory
//! tree, depth-first and single-threaded. Per-file failures are logged and
//! the batch moves on; only a missing input root and an explicit user
//! cancellation unwind the whole traversal.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use triband::label::LabelWriter;
use triband::naming;
use triband::radiance::{RadianceCalibrator, RadianceError};
use triband::reflectance::{ReflectanceCalibrator, ReflectanceError};

use crate::feedback::{ProgressSink, WarningDecision, WarningKind, WarningPolicy, WarningSink};
use crate::joblog::{BatchLog, LogError, Stage};

/// What a batch should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A single candidate file.
    File(PathBuf),
    /// A text file with one input path per line.
    FileList(PathBuf),
    /// A directory tree, walked recursively.
    Directory(PathBuf),
}

/// Fatal batch failures; everything per-file is routed to the logs instead.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input file, list, or directory does not exist.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The user chose to abandon the batch.
    #[error("batch cancelled")]
    Cancelled,

    #[error("i/o error under {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Log(#[from] LogError),
}

/// Result of offering one file to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// A product was written.
    Calibrated(PathBuf),
    /// An existing product satisfied the overwrite policy.
    SkippedExisting(PathBuf),
    /// Not a candidate, or a recoverable per-file failure.
    Declined,
}

/// Overwrite policy and output redirection shared by both stages.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Redirect products into this directory instead of beside each input.
    pub out_dir: Option<PathBuf>,
    /// Rebuild RAD products that already exist.
    pub overwrite_rad: bool,
    /// Rebuild REF products that already exist.
    pub overwrite_ref: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            out_dir: None,
            overwrite_rad: true,
            overwrite_ref: true,
        }
    }
}

/// Callbacks and logs surrounding a batch.
pub struct BatchHooks<'a> {
    pub progress: &'a dyn ProgressSink,
    pub warnings: &'a dyn WarningSink,
    pub labels: Option<&'a dyn LabelWriter>,
    pub log: BatchLog,
    pub exposure_log: BatchLog,
}

/// Driver-owned progress counters, reset at every batch entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchProgress {
    pub total_files: usize,
    pub current_file: usize,
}

#[derive(Clone, Copy)]
enum StagePipeline<'a> {
    Radiance(&'a RadianceCalibrator),
    Reflectance {
        calibrator: &'a ReflectanceCalibrator,
        custom_target: Option<&'a Path>,
    },
}

/// Drives one batch: enumerates candidates, applies the stage pipeline to
/// each, routes failures to the logs and the warning policy, and reports
/// progress strictly between per-file operations.
pub struct BatchDriver<'a> {
    stage: StagePipeline<'a>,
    options: BatchOptions,
    progress_sink: &'a dyn ProgressSink,
    policy: WarningPolicy<'a>,
    labels: Option<&'a dyn LabelWriter>,
    log: BatchLog,
    exposure_log: BatchLog,
    progress: BatchProgress,
}

impl<'a> BatchDriver<'a> {
    /// Driver for the radiance stage.
    pub fn radiance(
        calibrator: &'a RadianceCalibrator,
        options: BatchOptions,
        hooks: BatchHooks<'a>,
    ) -> Self {
        Self::with_stage(StagePipeline::Radiance(calibrator), options, hooks)
    }

    /// Driver for the reflectance stage (which may run radiance first).
    pub fn reflectance(
        calibrator: &'a ReflectanceCalibrator,
        custom_target: Option<&'a Path>,
        options: BatchOptions,
        hooks: BatchHooks<'a>,
    ) -> Self {
        Self::with_stage(
            StagePipeline::Reflectance {
                calibrator,
                custom_target,
            },
            options,
            hooks,
        )
    }

    fn with_stage(
        stage: StagePipeline<'a>,
        options: BatchOptions,
        hooks: BatchHooks<'a>,
    ) -> Self {
        Self {
            stage,
            options,
            progress_sink: hooks.progress,
            policy: WarningPolicy::new(hooks.warnings),
            labels: hooks.labels,
            log: hooks.log,
            exposure_log: hooks.exposure_log,
            progress: BatchProgress::default(),
        }
    }

    /// Current progress counters.
    pub fn progress(&self) -> BatchProgress {
        self.progress
    }

    /// Run the batch over the given input.
    pub fn run(&mut self, input: &InputSource) -> Result<(), BatchError> {
        if let Some(dir) = self.options.out_dir.clone() {
            fs::create_dir_all(&dir).map_err(|source| BatchError::Walk { path: dir, source })?;
        }
        match input {
            InputSource::File(path) => self.run_single(path),
            InputSource::FileList(path) => self.run_list(path),
            InputSource::Directory(path) => self.run_directory(path),
        }
    }

    fn run_single(&mut self, path: &Path) -> Result<(), BatchError> {
        if !path.is_file() {
            return Err(BatchError::InputNotFound(path.to_path_buf()));
        }
        self.progress = BatchProgress {
            total_files: 1,
            current_file: 0,
        };
        self.process_file(path)?;
        self.bump_progress();
        self.finish_progress();
        Ok(())
    }

    fn run_list(&mut self, list: &Path) -> Result<(), BatchError> {
        let text = fs::read_to_string(list)
            .map_err(|_| BatchError::InputNotFound(list.to_path_buf()))?;
        let entries: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        self.progress = BatchProgress {
            total_files: entries.len(),
            current_file: 0,
        };
        for entry in entries {
            let path = PathBuf::from(entry);
            if path.is_file() {
                self.process_file(&path)?;
            } else {
                warn!("{}: listed file not found", path.display());
                let message = format!("{}: file not found. Skipping this file.", path.display());
                self.warn_or_cancel(WarningKind::MissingListEntry, &message)?;
            }
            self.bump_progress();
        }
        self.finish_progress();
        Ok(())
    }

    fn run_directory(&mut self, root: &Path) -> Result<(), BatchError> {
        if !root.is_dir() {
            return Err(BatchError::InputNotFound(root.to_path_buf()));
        }
        // canonicalized once so the exclusion check survives path spelling
        let excluded = self
            .options
            .out_dir
            .as_ref()
            .and_then(|dir| dir.canonicalize().ok());

        self.progress = BatchProgress {
            total_files: count_files(root, excluded.as_deref())?,
            current_file: 0,
        };
        self.walk(root, excluded.as_deref())?;
        self.finish_progress();
        Ok(())
    }

    fn walk(&mut self, dir: &Path, excluded: Option<&Path>) -> Result<(), BatchError> {
        for path in read_dir_sorted(dir)? {
            if path.is_dir() {
                if is_excluded(&path, excluded) {
                    info!("not descending into output directory {}", path.display());
                    continue;
                }
                self.walk(&path, excluded)?;
            } else {
                self.process_file(&path)?;
                self.bump_progress();
            }
        }
        Ok(())
    }

    /// Offer one file to the stage pipeline and route the outcome.
    ///
    /// Only cancellation and log-write failures propagate; every per-file
    /// failure logs and declines so the batch keeps going.
    fn process_file(&mut self, path: &Path) -> Result<FileOutcome, BatchError> {
        match self.stage {
            StagePipeline::Radiance(calibrator) => self.process_radiance(calibrator, path),
            StagePipeline::Reflectance {
                calibrator,
                custom_target,
            } => self.process_reflectance(calibrator, custom_target, path),
        }
    }

    fn process_radiance(
        &mut self,
        calibrator: &RadianceCalibrator,
        path: &Path,
    ) -> Result<FileOutcome, BatchError> {
        if !naming::is_radiance_candidate(path) {
            if !naming::is_sibling_artifact(path) {
                self.log
                    .append(path, Stage::RadianceInput, "not a valid PSV file")?;
            }
            return Ok(FileOutcome::Declined);
        }

        let out = naming::rad_product_name(path, self.options.out_dir.as_deref());
        if !self.options.overwrite_rad && out.is_file() {
            info!("{} already exists, skipping", out.display());
            return Ok(FileOutcome::SkippedExisting(out));
        }

        match calibrator.calibrate_file(path, self.options.out_dir.as_deref(), self.labels) {
            Ok(product) => Ok(FileOutcome::Calibrated(product)),
            Err(RadianceError::NonStandardHeader { .. }) => {
                self.log.append(
                    path,
                    Stage::RadianceCalibration,
                    "not a valid PSV file header",
                )?;
                let message = format!(
                    "{}: not a valid PSV file header. Skipping this file.",
                    path.display()
                );
                self.warn_or_cancel(WarningKind::NonStandardHeader, &message)?;
                Ok(FileOutcome::Declined)
            }
            Err(RadianceError::Record(err)) => {
                warn!("{}: {err}", path.display());
                self.log.append(
                    path,
                    Stage::RadianceCalibration,
                    "file not formatted correctly",
                )?;
                Ok(FileOutcome::Declined)
            }
            Err(err) => {
                warn!("{}: {err}", path.display());
                self.log
                    .append(path, Stage::RadianceCalibration, &err.to_string())?;
                Ok(FileOutcome::Declined)
            }
        }
    }

    fn process_reflectance(
        &mut self,
        calibrator: &ReflectanceCalibrator,
        custom_target: Option<&Path>,
        path: &Path,
    ) -> Result<FileOutcome, BatchError> {
        if !naming::is_reflectance_candidate(path) {
            if !naming::is_sibling_artifact(path) {
                self.log
                    .append(path, Stage::ReflectanceInput, "not a valid PSV or RAD file")?;
            }
            return Ok(FileOutcome::Declined);
        }

        let out_dir = self.options.out_dir.as_deref();
        let out = naming::ref_product_name(&naming::rad_product_name(path, out_dir), out_dir);
        if !self.options.overwrite_ref && out.is_file() {
            info!("{} already exists, skipping", out.display());
            return Ok(FileOutcome::SkippedExisting(out));
        }

        match calibrator.calibrate_file(
            path,
            custom_target,
            out_dir,
            self.options.overwrite_rad,
            self.labels,
        ) {
            Ok(product) => Ok(FileOutcome::Calibrated(product)),
            Err(ReflectanceError::NonStandardExposureTime { millis }) => {
                self.exposure_log.append(
                    path,
                    Stage::ReflectanceCalibration,
                    &format!("non-standard exposure time {millis} ms"),
                )?;
                let message = format!(
                    "{}: exposure time {millis} ms is not one of 7, 34, 404, or 5004. \
                     Skipping this file.",
                    path.display()
                );
                self.warn_or_cancel(WarningKind::NonStandardExposureTime, &message)?;
                Ok(FileOutcome::Declined)
            }
            Err(ReflectanceError::MismatchedExposureTime {
                input_millis,
                target_millis,
            }) => {
                self.exposure_log.append(
                    path,
                    Stage::ReflectanceCalibration,
                    "custom target integration time does not match",
                )?;
                let message = format!(
                    "{}: integration time {input_millis} ms does not match the custom target \
                     ({target_millis} ms). Skipping this file.",
                    path.display()
                );
                self.warn_or_cancel(WarningKind::MismatchedExposureTime, &message)?;
                Ok(FileOutcome::Declined)
            }
            Err(ReflectanceError::Radiance(RadianceError::NonStandardHeader { .. })) => {
                self.log.append(
                    path,
                    Stage::ReflectanceCalibration,
                    "not a valid RAD file header",
                )?;
                let message = format!(
                    "{}: not a valid RAD file header. Skipping this file.",
                    path.display()
                );
                self.warn_or_cancel(WarningKind::NonStandardHeader, &message)?;
                Ok(FileOutcome::Declined)
            }
            Err(err) => {
                warn!("{}: {err}", path.display());
                self.log
                    .append(path, Stage::ReflectanceCalibration, &err.to_string())?;
                Ok(FileOutcome::Declined)
            }
        }
    }

    fn warn_or_cancel(&mut self, kind: WarningKind, message: &str) -> Result<(), BatchError> {
        match self.policy.ask(kind, message) {
            WarningDecision::Cancel => Err(BatchError::Cancelled),
            WarningDecision::Continue | WarningDecision::Suppress => Ok(()),
        }
    }

    fn bump_progress(&mut self) {
        self.progress.current_file += 1;
        let BatchProgress {
            total_files,
            current_file,
        } = self.progress;
        // 100 is reserved for batch completion
        if total_files > 0 && current_file < total_files {
            self.progress_sink
                .report_progress(((current_file * 100) / total_files) as u8);
        }
    }

    fn finish_progress(&mut self) {
        self.progress_sink.report_progress(100);
    }
}

/// Count all files under `dir`, skipping the excluded output subtree. An
/// approximation of the work ahead: files that will later be declined are
/// included.
fn count_files(dir: &Path, excluded: Option<&Path>) -> Result<usize, BatchError> {
    let mut count = 0;
    for path in read_dir_sorted(dir)? {
        if path.is_dir() {
            if !is_excluded(&path, excluded) {
                count += count_files(&path, excluded)?;
            }
        } else {
            count += 1;
        }
    }
    Ok(count)
}

/// Directory entries in name order, so batches traverse deterministically.
fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let entries = fs::read_dir(dir).map_err(|source| BatchError::Walk {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BatchError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn is_excluded(path: &Path, excluded: Option<&Path>) -> bool {
    match (excluded, path.canonicalize()) {
        (Some(out), Ok(canonical)) => canonical == *out,
        _ => false,
    }
}
