mod abort;
mod config;
mod pointing;
mod predict;
mod scheduler;

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use crate::abort::AbortSignal;
use crate::config::Config;
use crate::predict::{PriorityTable, Sgp4Ephemeris, TleLoader};
use crate::scheduler::{
    write_records, ActionRecord, Mode, ObservationScheduler, OutputError, OutputFormat,
    SchedulerError,
};

#[derive(Parser)]
#[command(name = "sat-o-scope")]
#[command(about = "Minute-by-minute satellite observation scheduling for a steerable telescope")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run the scheduler over the configured time span
    Run {
        config: String,
        /// Write records here instead of the configured path
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Stop scheduling after this much wall-clock time (e.g. "30s", "5m")
        #[arg(long, value_parser = humantime::parse_duration)]
        time_limit: Option<std::time::Duration>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            output,
            format,
            time_limit,
        } => run(&config, output, format, time_limit),
    }
}

fn validate(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let station = match config.ground_station() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let (settings, end_time) = match config
        .scheduler_settings()
        .and_then(|s| s.end_time().map(|end| (s, end)))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Configuration is valid");
    println!(
        "  station: {} ({:.4}, {:.4}, {:.0} m)",
        settings.station_name, station.latitude_deg, station.longitude_deg, station.altitude_m
    );
    println!(
        "  window: {} .. {} ({} ticks of {})",
        settings.start_time,
        end_time,
        settings.duration_ticks,
        settings.tick_interval
    );
    println!(
        "  cutoff {:.1} deg, slew {:.2} deg/tick, sort by {}, skip_known {}",
        settings.elevation_cutoff_deg,
        settings.slew_rate_deg_per_tick,
        settings.sort_column,
        settings.skip_known
    );
    ExitCode::SUCCESS
}

fn run(
    path: &str,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    time_limit: Option<std::time::Duration>,
) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let abort_rx = time_limit.map(spawn_time_limit);
    let records = match schedule(&config, abort_rx.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Scheduling failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = format.unwrap_or(config.output.format);
    let written = match output.or(config.output.path) {
        Some(out_path) => {
            if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Error creating {}: {}", parent.display(), e);
                    return ExitCode::FAILURE;
                }
            }
            File::create(&out_path)
                .map_err(OutputError::from)
                .and_then(|f| write_records(BufWriter::new(f), &records, format))
                .map(|_| log::info!("Wrote {} records to {}", records.len(), out_path.display()))
        }
        None => write_records(io::stdout().lock(), &records, format),
    };
    if let Err(e) = written {
        eprintln!("Error writing records: {}", e);
        return ExitCode::FAILURE;
    }

    print_summary(&records);
    ExitCode::SUCCESS
}

/// Sends an abort once `limit` has elapsed; the run stops at the next tick boundary.
fn spawn_time_limit(limit: std::time::Duration) -> mpsc::Receiver<AbortSignal> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        thread::sleep(limit);
        // the run may already be over and the receiver gone
        let _ = tx.send(AbortSignal {
            reason: format!("time limit of {} reached", humantime::format_duration(limit)),
        });
    });
    rx
}

fn schedule(
    config: &Config,
    abort_rx: Option<&mpsc::Receiver<AbortSignal>>,
) -> Result<Vec<ActionRecord>, SchedulerError> {
    let station = config.ground_station()?;
    let settings = config.scheduler_settings()?;

    let priorities = PriorityTable::from_file(&config.data.priority_file)?;
    let mut loader = TleLoader::new(config.data.tle_folder.clone());
    loader.load_for_date(settings.start_time.date_naive())?;
    log::info!("{} TLE sets available", loader.len());

    let ephemeris = Sgp4Ephemeris::new(station, loader, &priorities);
    if ephemeris.is_empty() {
        log::warn!("None of the loaded TLE sets has a priority entry");
    } else {
        log::debug!("{} objects in the ephemeris catalog", ephemeris.len());
    }
    let mut scheduler = ObservationScheduler::new(settings);
    scheduler.run(&ephemeris, &priorities, abort_rx)
}

fn print_summary(records: &[ActionRecord]) {
    let observing = records.iter().filter(|r| r.mode == Mode::Observing).count();
    let switches = records
        .iter()
        .filter(|r| r.has_comment("TIME_FOR_NEW") || r.has_comment("SWITCH"))
        .count();
    eprintln!(
        "{} ticks scheduled: {} observing, {} turning, {} target switches",
        records.len(),
        observing,
        records.len() - observing,
        switches
    );
}
