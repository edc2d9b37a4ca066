use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::pointing::{normalize_azimuth, PointingState};
use crate::predict::GroundStation;
use crate::scheduler::settings::{
    slew_rate_per_tick, DEFAULT_DURATION_TICKS, DEFAULT_ELEVATION_CUTOFF_DEG,
    DEFAULT_SLEW_RATE_DEG_PER_MIN, MIN_DWELL,
};
use crate::scheduler::{OutputFormat, SchedulerSettings, SortColumn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid station coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("duration must be at least one tick")]
    NonPositiveDuration,
    #[error("invalid tick interval {0:?}: {1}")]
    InvalidTickInterval(String, String),
    #[error("tick interval must be positive")]
    NonPositiveTickInterval,
    #[error("skip_known must not be negative, got {0}")]
    NegativeSkipKnown(i64),
    #[error("slew rate must be a positive number of degrees, got {0}")]
    InvalidSlewRate(f64),
    #[error("min_dwell_ticks must not be negative, got {0}")]
    NegativeMinDwell(i64),
    #[error("{0} must be a finite number of degrees")]
    NonFiniteAngle(&'static str),
    #[error("run window of {ticks} ticks of {interval} from {start} ends outside the supported date range")]
    WindowOutOfRange {
        start: DateTime<Utc>,
        interval: Duration,
        ticks: u32,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    pub scheduler: SchedulerConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_cutoff")]
    pub elevation_cutoff_deg: f64,
    #[serde(default = "default_duration")]
    pub duration_ticks: i64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval: String,
    #[serde(default)]
    pub sort_column: SortColumn,
    #[serde(default)]
    pub skip_known: i64,
    #[serde(default)]
    pub slew_rate_deg_per_tick: Option<f64>,
    #[serde(default = "default_slew_rate")]
    pub slew_rate_deg_per_min: f64,
    #[serde(default = "default_min_dwell")]
    pub min_dwell_ticks: i64,
    #[serde(default)]
    pub initial_pointing_deg: InitialPointing,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct InitialPointing {
    pub azimuth: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub tle_folder: PathBuf,
    pub priority_file: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_cutoff() -> f64 {
    DEFAULT_ELEVATION_CUTOFF_DEG
}

fn default_duration() -> i64 {
    DEFAULT_DURATION_TICKS as i64
}

fn default_tick_interval() -> String {
    "1m".to_string()
}

fn default_slew_rate() -> f64 {
    DEFAULT_SLEW_RATE_DEG_PER_MIN
}

fn default_min_dwell() -> i64 {
    MIN_DWELL
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn ground_station(&self) -> Result<GroundStation, ConfigError> {
        GroundStation::from_coordinates(&self.station.coordinates, Some(self.station.altitude_m))
            .ok_or_else(|| ConfigError::InvalidCoordinates(self.station.coordinates.clone()))
    }

    /// Validates the scheduler section into run settings.
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings, ConfigError> {
        let sched = &self.scheduler;

        let duration_ticks = u32::try_from(sched.duration_ticks)
            .ok()
            .filter(|&t| t > 0)
            .ok_or(ConfigError::NonPositiveDuration)?;

        let tick_interval = parse_interval(&sched.tick_interval)?;

        let skip_known = usize::try_from(sched.skip_known)
            .map_err(|_| ConfigError::NegativeSkipKnown(sched.skip_known))?;

        let slew_rate = sched
            .slew_rate_deg_per_tick
            .unwrap_or_else(|| slew_rate_per_tick(sched.slew_rate_deg_per_min, tick_interval));
        if !slew_rate.is_finite() || slew_rate <= 0.0 {
            return Err(ConfigError::InvalidSlewRate(slew_rate));
        }

        if sched.min_dwell_ticks < 0 {
            return Err(ConfigError::NegativeMinDwell(sched.min_dwell_ticks));
        }

        let angles = [
            ("elevation_cutoff_deg", sched.elevation_cutoff_deg),
            ("initial_pointing_deg.azimuth", sched.initial_pointing_deg.azimuth),
            ("initial_pointing_deg.elevation", sched.initial_pointing_deg.elevation),
        ];
        if let Some(&(field, _)) = angles.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::NonFiniteAngle(field));
        }

        let mut settings = SchedulerSettings::new(self.station.name.clone(), sched.start_time);
        settings.tick_interval = tick_interval;
        settings.duration_ticks = duration_ticks;
        settings.elevation_cutoff_deg = sched.elevation_cutoff_deg;
        settings.sort_column = sched.sort_column;
        settings.skip_known = skip_known;
        settings.slew_rate_deg_per_tick = slew_rate;
        settings.min_dwell_ticks = sched.min_dwell_ticks;
        settings.initial_pointing = PointingState::new(
            normalize_azimuth(sched.initial_pointing_deg.azimuth.to_radians()),
            sched.initial_pointing_deg.elevation.to_radians(),
            0.0,
        );
        settings.end_time()?;
        Ok(settings)
    }
}

fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidTickInterval(s.to_string(), msg);
    let std_duration = humantime::parse_duration(s.trim()).map_err(|e| invalid(e.to_string()))?;
    let interval = Duration::from_std(std_duration).map_err(|e| invalid(e.to_string()))?;
    if interval <= Duration::zero() {
        return Err(ConfigError::NonPositiveTickInterval);
    }
    Ok(interval)
}
