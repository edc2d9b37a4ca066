use chrono::{DateTime, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::look_angles;
use crate::predict::tle_loader::{TleEntry, TleLoader};
use crate::predict::types::ObjectPosition;
use crate::predict::{GroundStation, PriorityTable};

/// Source of topocentric positions for every tracked object.
///
/// Implementations report all objects regardless of elevation; horizon and cutoff
/// filtering happens when candidates are built.
pub trait EphemerisProvider {
    fn positions_at(&self, time: DateTime<Utc>) -> Result<Vec<ObjectPosition>, PredictError>;
}

/// SGP4-backed provider for a fixed ground station.
pub struct Sgp4Ephemeris {
    station: GroundStation,
    catalog: Vec<TleEntry>,
}

impl Sgp4Ephemeris {
    /// Keeps only objects with a priority entry, in `(priority, name)` order.
    pub fn new(station: GroundStation, loader: TleLoader, priorities: &PriorityTable) -> Self {
        let mut entries = loader.into_entries();
        let catalog: Vec<TleEntry> = priorities
            .ordered()
            .into_iter()
            .filter_map(|p| entries.remove(&p.norad_id))
            .collect();

        if !entries.is_empty() {
            log::debug!("{} loaded satellites have no priority entry", entries.len());
        }
        log::info!("Tracking {} prioritised satellites", catalog.len());

        Self { station, catalog }
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

impl EphemerisProvider for Sgp4Ephemeris {
    fn positions_at(&self, time: DateTime<Utc>) -> Result<Vec<ObjectPosition>, PredictError> {
        let mut positions = Vec::with_capacity(self.catalog.len());
        for entry in &self.catalog {
            match look_angles(&self.station, &entry.elements, &entry.constants, time) {
                Ok(look) => positions.push(ObjectPosition {
                    norad_id: entry.info.norad_id,
                    name: entry.info.name.clone(),
                    azimuth_rad: look.azimuth_rad,
                    elevation_rad: look.elevation_rad,
                    distance_m: look.range_m,
                }),
                Err(e) => {
                    log::warn!(
                        "Skipping {} ({}) at {}: {}",
                        entry.info.name,
                        entry.info.tle_source,
                        time,
                        e
                    );
                }
            }
        }
        Ok(positions)
    }
}
