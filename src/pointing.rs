use std::f64::consts::{PI, TAU};
use std::ops::{Add, Sub};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PointingError {
    #[error("non-finite pointing: azimuth {azimuth}, elevation {elevation}")]
    NonFinite { azimuth: f64, elevation: f64 },
}

/// Telescope aim: azimuth and elevation in radians, slant distance in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointingState {
    pub azimuth: f64,
    pub elevation: f64,
    pub distance: f64,
}

impl PointingState {
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }

    pub fn from_degrees(azimuth_deg: f64, elevation_deg: f64, distance: f64) -> Self {
        Self::new(azimuth_deg.to_radians(), elevation_deg.to_radians(), distance)
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth.to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation.to_degrees()
    }

    pub fn is_finite(&self) -> bool {
        self.azimuth.is_finite() && self.elevation.is_finite()
    }

    /// Great-circle angular separation to `other`, in `[0, π]`.
    pub fn chord(&self, other: &PointingState) -> Result<f64, PointingError> {
        for p in [self, other] {
            if !p.is_finite() {
                return Err(PointingError::NonFinite {
                    azimuth: p.azimuth,
                    elevation: p.elevation,
                });
            }
        }

        let cos_angle = self.elevation.sin() * other.elevation.sin()
            + self.elevation.cos()
                * other.elevation.cos()
                * (other.azimuth - self.azimuth).cos();

        Ok(cos_angle.clamp(-1.0, 1.0).acos())
    }
}

impl Add for PointingState {
    type Output = PointingState;

    fn add(self, rhs: PointingState) -> PointingState {
        PointingState::new(
            self.azimuth + rhs.azimuth,
            self.elevation + rhs.elevation,
            self.distance + rhs.distance,
        )
    }
}

impl Sub for PointingState {
    type Output = PointingState;

    fn sub(self, rhs: PointingState) -> PointingState {
        PointingState::new(
            self.azimuth - rhs.azimuth,
            self.elevation - rhs.elevation,
            self.distance - rhs.distance,
        )
    }
}

/// Limits `delta` to `limit` in magnitude, keeping its sign.
pub fn clamp_signed(delta: f64, limit: f64) -> f64 {
    if delta.abs() > limit {
        limit.copysign(delta)
    } else {
        delta
    }
}

/// Rewrites an azimuth difference so it takes the shorter way around.
pub fn shortest_azimuth_delta(delta: f64) -> f64 {
    if delta.abs() > PI {
        (delta.abs() - TAU) * delta.signum()
    } else {
        delta
    }
}

/// Wraps an azimuth into `[0, 2π)`.
pub fn normalize_azimuth(azimuth: f64) -> f64 {
    let wrapped = azimuth.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Elevation is folded modulo π, matching the legacy pointing logs.
pub fn normalize_elevation(elevation: f64) -> f64 {
    let wrapped = elevation.rem_euclid(PI);
    if wrapped >= PI {
        0.0
    } else {
        wrapped
    }
}
