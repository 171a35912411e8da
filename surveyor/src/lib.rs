//! SURVEYOR - batch driver for mast spectrometer calibration.
//!
//! Feeds PSV records through the triband calibration engines across single
//! files, explicit file lists, or directory trees: per-file failure routing,
//! append-only job logs, overwrite policy, and progress/warning callbacks
//! into the hosting application.

pub mod driver;
pub mod feedback;
pub mod joblog;
pub mod shared_args;

pub use driver::{
    BatchDriver, BatchError, BatchHooks, BatchOptions, BatchProgress, FileOutcome, InputSource,
};
pub use feedback::{
    NullProgress, ProgressSink, SilentWarnings, WarningDecision, WarningKind, WarningPolicy,
    WarningSink,
};
pub use joblog::{BatchLog, Stage};
