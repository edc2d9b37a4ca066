use chrono::{DateTime, Duration, Utc};

use crate::config::ConfigError;
use crate::pointing::PointingState;
use crate::scheduler::candidates::SortColumn;

/// Ticks a target must be observed before the scheduler looks for another one.
pub const MIN_DWELL: i64 = 10;

pub const DEFAULT_ELEVATION_CUTOFF_DEG: f64 = 10.0;
pub const DEFAULT_DURATION_TICKS: u32 = 1440;
pub const DEFAULT_SLEW_RATE_DEG_PER_MIN: f64 = 50.0;

/// Validated inputs for one scheduler run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub station_name: String,
    pub start_time: DateTime<Utc>,
    pub tick_interval: Duration,
    pub duration_ticks: u32,
    pub elevation_cutoff_deg: f64,
    pub sort_column: SortColumn,
    pub skip_known: usize,
    pub slew_rate_deg_per_tick: f64,
    pub min_dwell_ticks: i64,
    pub initial_pointing: PointingState,
}

impl SchedulerSettings {
    pub fn new(station_name: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            station_name: station_name.into(),
            start_time,
            tick_interval: Duration::minutes(1),
            duration_ticks: DEFAULT_DURATION_TICKS,
            elevation_cutoff_deg: DEFAULT_ELEVATION_CUTOFF_DEG,
            sort_column: SortColumn::default(),
            skip_known: 0,
            slew_rate_deg_per_tick: DEFAULT_SLEW_RATE_DEG_PER_MIN,
            min_dwell_ticks: MIN_DWELL,
            initial_pointing: PointingState::default(),
        }
    }

    pub fn slew_limit_rad(&self) -> f64 {
        self.slew_rate_deg_per_tick.to_radians()
    }

    /// Timestamp of `tick_index`, or `WindowOutOfRange` when it cannot be represented.
    pub fn tick_time(&self, tick_index: u32) -> Result<DateTime<Utc>, ConfigError> {
        i32::try_from(tick_index)
            .ok()
            .and_then(|ticks| self.tick_interval.checked_mul(ticks))
            .and_then(|offset| self.start_time.checked_add_signed(offset))
            .ok_or(ConfigError::WindowOutOfRange {
                start: self.start_time,
                interval: self.tick_interval,
                ticks: self.duration_ticks,
            })
    }

    pub fn end_time(&self) -> Result<DateTime<Utc>, ConfigError> {
        self.tick_time(self.duration_ticks)
    }
}

/// Converts a per-minute slew rate to the angle covered in one tick.
pub fn slew_rate_per_tick(deg_per_min: f64, tick_interval: Duration) -> f64 {
    let minutes = tick_interval.num_milliseconds() as f64 / 60_000.0;
    deg_per_min * minutes
}
