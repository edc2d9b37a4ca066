use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::pointing::normalize_azimuth;
use crate::predict::error::PredictError;
use crate::predict::GroundStation;

/// Azimuth/elevation in radians and slant range in metres as seen from a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
    pub range_m: f64,
}

pub fn look_angles(
    station: &GroundStation,
    elements: &Elements,
    constants: &Constants,
    timestamp: DateTime<Utc>,
) -> Result<LookAngles, PredictError> {
    let minutes = elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let prediction = constants
        .propagate(minutes)
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));

    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let sta_ecef = station.position_ecef_km();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    Ok(topocentric(dr, station.lat_rad(), station.lon_rad()))
}

/// Converts an ECEF offset (km) from the station into look angles.
pub fn topocentric(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> LookAngles {
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    let (east, north, up) = ecef_to_enu(dr, lat_rad, lon_rad);

    let elevation_rad = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin()
    } else {
        0.0
    };

    LookAngles {
        azimuth_rad: normalize_azimuth(east.atan2(north)),
        elevation_rad,
        range_m: range_km * 1000.0,
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
