use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduler::record::ActionRecord;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H:%M";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    mode: String,
    azimuth: f64,
    elevation: f64,
    target: &'a str,
    dwell_ticks: i64,
    tick_index: u32,
    comments: String,
    priority: i64,
    cospar_id: &'a str,
    norad_id: String,
}

impl<'a> From<&'a ActionRecord> for CsvRow<'a> {
    fn from(record: &'a ActionRecord) -> Self {
        CsvRow {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            mode: record.mode.to_string(),
            azimuth: record.azimuth_deg,
            elevation: record.elevation_deg,
            target: record.target_name.as_deref().unwrap_or_default(),
            dwell_ticks: record.dwell_ticks,
            tick_index: record.tick_index,
            comments: record.joined_comments(),
            priority: record.priority,
            cospar_id: record.target_cospar_id.as_deref().unwrap_or_default(),
            norad_id: record
                .target_norad_id
                .map(|id| format!("{:05}", id))
                .unwrap_or_default(),
        }
    }
}

pub fn write_records<W: Write>(
    writer: W,
    records: &[ActionRecord],
    format: OutputFormat,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => write_csv(writer, records),
        OutputFormat::Json => write_json_lines(writer, records),
    }
}

fn write_csv<W: Write>(writer: W, records: &[ActionRecord]) -> Result<(), OutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_json_lines<W: Write>(mut writer: W, records: &[ActionRecord]) -> Result<(), OutputError> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
