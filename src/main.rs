use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use hydroflag::{
    logging, output, DataFamily, OutputFormat, Pipeline, PipelineError, RawConfig, RunOutcome,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Normalize stream-gauge / weather-station logger exports and log bad data"
)]
struct Args {
    /// YAML file with run parameters; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// first date to include, YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,
    /// last date to include, YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    station: Option<String>,
    /// output path prefix
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum)]
    family: Option<DataFamily>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    #[arg(long)]
    parallel: bool,
    /// do not append a generation timestamp to the output name
    #[arg(long)]
    no_timestamp: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// no console echo; the log file still gets everything
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_raw(self) -> RawConfig {
        RawConfig {
            input_directory: self.input,
            start_date: self.start,
            end_date: self.end,
            station_name: self.station,
            output: self.output,
            family: self.family,
            format: self.format,
            timestamp_suffix: self.no_timestamp.then_some(false),
            parallel: self.parallel.then_some(true),
            log_file: self.log_file,
            console: self.quiet.then_some(false),
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            match e.downcast_ref::<PipelineError>() {
                Some(pe) if pe.is_config() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run() -> Result<()> {
    let started = Local::now().naive_local();

    // ─── 1) resolve parameters ───────────────────────────────────────
    let args = Args::parse();
    let file_cfg = match &args.config {
        Some(path) => RawConfig::load(path)?,
        None => RawConfig::default(),
    };
    let cfg = file_cfg.overlay(args.into_raw()).resolve()?;

    // ─── 2) init logging ─────────────────────────────────────────────
    let _guard = logging::init(&cfg.log);
    info!(
        input = %cfg.input_directory.display(),
        start = %cfg.window.start,
        end = %cfg.window.end,
        family = %cfg.family,
        station = %cfg.station_name,
        "startup"
    );

    // ─── 3) validate before touching any file ───────────────────────
    let pipeline = Pipeline::new(cfg).context("invalid configuration")?;

    // ─── 4) walk, normalize, flag ────────────────────────────────────
    let report = pipeline.run()?;

    // ─── 5) summary, printed whether or not anything matched ────────
    if report.outcome != RunOutcome::Completed {
        println!("No data: {}", report.outcome);
    }
    println!("{}", report.summary);
    for path in output::planned_outputs(pipeline.config(), started) {
        println!("Output:         {}", path.display());
    }

    // ─── 6) write outputs, headers only for an empty run ─────────────
    output::write_outputs(pipeline.config(), &report.dataset, started)?;
    info!(
        scanned = report.summary.files_scanned,
        matched = report.summary.files_matched,
        skipped = report.summary.files_skipped,
        failed = report.summary.files_failed,
        rows = report.summary.rows,
        anomalies = report.summary.anomalies,
        outcome = %report.outcome,
        "finished"
    );
    Ok(())
}
