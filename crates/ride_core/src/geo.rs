//! Geodesic primitives: validated coordinates and great-circle distances.
//!
//! Distances use the haversine formula on a sphere of mean Earth radius,
//! which stays within ~0.5% of the ellipsoidal distance. Route proximity is
//! measured against polyline vertices, not segments: upstream polylines are
//! densely sampled, so the nearest vertex is a good enough proxy.

use std::fmt;

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres spanned by one degree of latitude on the haversine sphere.
pub const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate ({lat}, {lng}): latitude must be in [-90, 90] and longitude in [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("invalid tolerance {0}: must be a finite, non-negative number of metres")]
    InvalidTolerance(f64),

    #[error("route has no vertices")]
    EmptyRoute,
}

/// A WGS84 point in degrees. Always in range once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let in_range = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !in_range {
            return Err(GeoError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// H3 cell containing this coordinate at the given resolution.
    pub fn to_cell(&self, resolution: Resolution) -> Result<CellIndex, GeoError> {
        LatLng::new(self.lat, self.lng)
            .map(|ll| ll.to_cell(resolution))
            .map_err(|_| GeoError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = GeoError;

    fn try_from([lat, lng]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lat, lng)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lat, coord.lng]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Great-circle distance between two coordinates, in metres.
///
/// Symmetric in its arguments and exactly zero for identical points.
pub fn great_circle_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    // Rounding can push `h` just past 1 for near-antipodal points.
    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Minimum distance in metres from `point` to any vertex of `route`.
pub fn min_distance_to_route(point: Coordinate, route: &[Coordinate]) -> Result<f64, GeoError> {
    route
        .iter()
        .map(|vertex| great_circle_distance_m(point, *vertex))
        .min_by(f64::total_cmp)
        .ok_or(GeoError::EmptyRoute)
}
