use chrono::{DateTime, Utc};
use serde::Serialize;

/// Priority reported for ticks without an observed target.
pub const NO_TARGET_PRIORITY: i64 = 9_999_999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum Mode {
    /// Slewing towards a target; does not count as dwell.
    #[default]
    #[serde(rename = "trn")]
    #[strum(serialize = "trn")]
    Turning,
    #[serde(rename = "obs")]
    #[strum(serialize = "obs")]
    Observing,
}

/// One scheduler decision, emitted once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub target_name: Option<String>,
    pub dwell_ticks: i64,
    pub tick_index: u32,
    pub comments: Vec<String>,
    pub priority: i64,
    pub target_norad_id: Option<u32>,
    pub target_cospar_id: Option<String>,
}

impl ActionRecord {
    pub fn has_comment(&self, prefix: &str) -> bool {
        self.comments.iter().any(|c| c.starts_with(prefix))
    }

    pub fn joined_comments(&self) -> String {
        self.comments.join(",")
    }
}
