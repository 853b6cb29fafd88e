//! Test helpers for common test setup and utilities.
//!
//! This module provides a scripted route provider and the shared rider
//! coordinates used across test files and benches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::RideCandidate;
use crate::geo::{Coordinate, METERS_PER_DEGREE_LAT};
use crate::routing::{Route, RouteError, RouteProvider};

/// Rider source used by the matching scenarios (MG Road, Bengaluru).
pub const RIDER_SOURCE: (f64, f64) = (12.9716, 77.5946);
/// Rider destination used by the matching scenarios (Koramangala, Bengaluru).
pub const RIDER_DESTINATION: (f64, f64) = (12.9352, 77.6245);

/// Build a coordinate from literals.
///
/// # Panics
///
/// Panics if the coordinate is out of range.
pub fn coord(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("test coordinate should be in range")
}

pub fn rider_source() -> Coordinate {
    coord(RIDER_SOURCE.0, RIDER_SOURCE.1)
}

pub fn rider_destination() -> Coordinate {
    coord(RIDER_DESTINATION.0, RIDER_DESTINATION.1)
}

/// Move `point` due north by `meters` (negative moves south).
pub fn offset_north(point: Coordinate, meters: f64) -> Coordinate {
    coord(point.lat() + meters / METERS_PER_DEGREE_LAT, point.lng())
}

/// A started ride between two points.
pub fn started_ride(id: &str, source: Coordinate, destination: Coordinate) -> RideCandidate {
    RideCandidate::started(id, source, destination)
}

type PairKey = [u64; 4];

fn pair_key(origin: Coordinate, destination: Coordinate) -> PairKey {
    [
        origin.lat().to_bits(),
        origin.lng().to_bits(),
        destination.lat().to_bits(),
        destination.lng().to_bits(),
    ]
}

/// Route provider answering from a script keyed on exact endpoint pairs.
///
/// Unscripted pairs get a two-vertex route `[origin, destination]`. Every call is
/// counted, including failures.
#[derive(Default)]
pub struct ScriptedRouteProvider {
    routes: HashMap<PairKey, Vec<Coordinate>>,
    failures: HashMap<PairKey, RouteError>,
    delays: HashMap<PairKey, Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
}

/// Decrements the in-flight count when a call completes or its future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedRouteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, origin: Coordinate, destination: Coordinate, points: Vec<Coordinate>) -> Self {
        self.routes.insert(pair_key(origin, destination), points);
        self
    }

    pub fn with_failure(mut self, origin: Coordinate, destination: Coordinate, error: RouteError) -> Self {
        self.failures.insert(pair_key(origin, destination), error);
        self
    }

    pub fn with_delay(mut self, origin: Coordinate, destination: Coordinate, delay: Duration) -> Self {
        self.delays.insert(pair_key(origin, destination), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls started but neither finished nor dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteProvider for ScriptedRouteProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);
        let key = pair_key(origin, destination);

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }
        match self.routes.get(&key) {
            Some(points) => Route::new(points.clone()),
            None => Route::new(vec![origin, destination]),
        }
    }
}
