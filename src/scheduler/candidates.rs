use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::pointing::PointingState;
use crate::predict::{EphemerisProvider, ObjectPosition, PredictError, PriorityTable};

/// Ordering applied to the visible candidates of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortColumn {
    /// Catalog order as yielded by the ephemeris provider.
    None,
    Priority,
    #[default]
    Chord,
}

/// A satellite above the elevation cutoff at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub name: String,
    pub priority: i64,
    pub cospar_id: String,
    pub pointing: PointingState,
    /// Angular distance from the station's current aim.
    pub chord_to_station: f64,
}

pub struct CandidateSetBuilder {
    pub elevation_cutoff_deg: f64,
    pub sort: SortColumn,
}

impl CandidateSetBuilder {
    pub fn build<E: EphemerisProvider + ?Sized>(
        &self,
        ephemeris: &E,
        time: DateTime<Utc>,
        priorities: &PriorityTable,
        station: &PointingState,
    ) -> Result<Vec<Candidate>, PredictError> {
        let positions = ephemeris.positions_at(time)?;
        Ok(self.select(&positions, priorities, station))
    }

    /// Filters, deduplicates and orders raw positions. First occurrence of an id wins.
    pub fn select(
        &self,
        positions: &[ObjectPosition],
        priorities: &PriorityTable,
        station: &PointingState,
    ) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for position in positions {
            if position.elevation_rad.to_degrees() < self.elevation_cutoff_deg {
                continue;
            }
            let Some(entry) = priorities.get(position.norad_id) else {
                continue;
            };
            if seen.contains(&position.norad_id) {
                continue;
            }

            let pointing = PointingState::new(
                position.azimuth_rad,
                position.elevation_rad,
                position.distance_m,
            );
            let chord_to_station = match station.chord(&pointing) {
                Ok(chord) => chord,
                Err(e) => {
                    log::warn!("Ignoring {}: {}", position.name, e);
                    continue;
                }
            };

            seen.insert(position.norad_id);
            candidates.push(Candidate {
                id: position.norad_id,
                name: entry.name.clone(),
                priority: entry.priority,
                cospar_id: entry.cospar_id.clone(),
                pointing,
                chord_to_station,
            });
        }

        match self.sort {
            SortColumn::None => {}
            SortColumn::Priority => candidates.sort_by_key(|c| c.priority),
            SortColumn::Chord => {
                candidates.sort_by(|a, b| a.chord_to_station.total_cmp(&b.chord_to_station))
            }
        }

        candidates
    }
}
