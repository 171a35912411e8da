//! Batch radiance calibration of PSV spectrometer records.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use surveyor::driver::{BatchDriver, BatchHooks, BatchOptions};
use surveyor::joblog::BatchLog;
use surveyor::shared_args::{BarProgress, ConsoleWarnings, SharedBatchArgs};
use triband::constants::Instrument;
use triband::radiance::RadianceCalibrator;
use triband::record::RecordLayout;
use triband::tables::{GainTable, ReferenceSet};

#[derive(Parser, Debug)]
#[command(name = "radiance_cal")]
#[command(about = "Calibrate PSV spectrometer records to absolute radiance")]
struct Args {
    #[command(flatten)]
    shared: SharedBatchArgs,

    /// Do not overwrite existing RAD products
    #[arg(long)]
    no_overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let input = match args.shared.input_source() {
        Ok(input) => input,
        Err(message) => bail!(message),
    };

    let instrument = match &args.shared.constants {
        Some(path) => Instrument::from_json_file(path)
            .with_context(|| format!("loading instrument constants from {}", path.display()))?,
        None => Instrument::default(),
    };

    let refs = ReferenceSet::from_dir(&args.shared.cal_dir);
    let gain = GainTable::from_file(&refs.gain_table_path()).context("loading gain table")?;
    let calibrator = RadianceCalibrator::new(RecordLayout::MSL, instrument, gain);

    let progress = BarProgress::new();
    let warnings = ConsoleWarnings;
    let hooks = BatchHooks {
        progress: &progress,
        warnings: &warnings,
        labels: None,
        log: BatchLog::timestamped("bad_input"),
        exposure_log: BatchLog::timestamped("exposure_time"),
    };
    let options = BatchOptions {
        out_dir: args.shared.out_dir.clone(),
        overwrite_rad: !args.no_overwrite,
        overwrite_ref: true,
    };

    let mut driver = BatchDriver::radiance(&calibrator, options, hooks);
    driver.run(&input)?;
    progress.finish();
    info!("processed {} files", driver.progress().current_file);
    Ok(())
}
