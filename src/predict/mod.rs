mod error;
mod ground_station;
mod priority;
mod propagation;
mod tle_loader;
mod types;

pub mod ephemeris;

pub use ephemeris::{EphemerisProvider, Sgp4Ephemeris};
pub use error::PredictError;
pub use ground_station::GroundStation;
pub use priority::{PriorityEntry, PriorityTable};
pub use tle_loader::TleLoader;
pub use types::ObjectPosition;
