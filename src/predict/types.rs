/// Information about a single satellite from TLE
#[derive(Debug, Clone)]
pub struct SatelliteInfo {
    pub name: String,
    pub norad_id: u32,
    pub tle_source: String,
}

/// Topocentric position of one tracked object at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPosition {
    pub norad_id: u32,
    pub name: String,
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
    pub distance_m: f64,
}
