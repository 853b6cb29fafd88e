use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::geo::{Coordinate, GeoError};
use crate::routing::RouteError;

/// Tolerance applied when a query does not specify one.
pub const DEFAULT_TOLERANCE_M: f64 = 1_000.0;

/// A rider's request to join a ride passing near both of their endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchQuery {
    rider_source: Coordinate,
    rider_destination: Coordinate,
    tolerance_m: f64,
}

impl MatchQuery {
    pub fn new(
        rider_source: Coordinate,
        rider_destination: Coordinate,
        tolerance_m: f64,
    ) -> Result<Self, GeoError> {
        if !tolerance_m.is_finite() || tolerance_m < 0.0 {
            return Err(GeoError::InvalidTolerance(tolerance_m));
        }
        Ok(Self {
            rider_source,
            rider_destination,
            tolerance_m,
        })
    }

    pub fn with_default_tolerance(rider_source: Coordinate, rider_destination: Coordinate) -> Self {
        Self {
            rider_source,
            rider_destination,
            tolerance_m: DEFAULT_TOLERANCE_M,
        }
    }

    pub fn rider_source(&self) -> Coordinate {
        self.rider_source
    }

    pub fn rider_destination(&self) -> Coordinate {
        self.rider_destination
    }

    pub fn tolerance_m(&self) -> f64 {
        self.tolerance_m
    }
}

/// A ride that passes near both of the rider's endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRide {
    pub id: String,
    pub source: Coordinate,
    pub destination: Coordinate,
}

/// A candidate skipped because its route could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRouteFailure {
    pub ride_id: String,
    pub reason: RouteError,
}

/// Result of a match query.
///
/// `matches` is in catalog order. `failures` lists candidates that could not be
/// evaluated; they never fail the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub matches: Vec<MatchedRide>,
    pub failures: Vec<CandidateRouteFailure>,
}

impl MatchOutcome {
    pub fn match_ids(&self) -> Vec<&str> {
        self.matches.iter().map(|ride| ride.id.as_str()).collect()
    }
}

/// Query-level failures.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] GeoError),

    #[error("rider route unavailable: {0}")]
    RouteUnavailable(RouteError),

    #[error("active rides unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
}

/// Per-candidate decision, produced inside the candidate's own evaluation.
#[derive(Debug)]
pub(crate) enum CandidateEvaluation {
    Matched(MatchedRide),
    Rejected,
    Failed(CandidateRouteFailure),
}
