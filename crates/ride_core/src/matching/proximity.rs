//! Proximity matching: find active rides whose route passes near both of a
//! rider's endpoints.
//!
//! Each candidate is evaluated independently: its route is fetched, both rider
//! endpoints are tested against it, and the accept/reject decision is made
//! inside that candidate's own evaluation. Route fetches run concurrently with
//! bounded fan-out; results come back in catalog order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{
    CandidateEvaluation, CandidateRouteFailure, MatchError, MatchOutcome, MatchQuery, MatchedRide,
    DEFAULT_TOLERANCE_M,
};
use crate::catalog::{CatalogError, RideCandidate, RideCatalog};
use crate::geo::min_distance_to_route;
use crate::routing::{fetch_pinned_route, RouteError, RouteProvider};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatcherConfig {
    /// Tolerance used when a request does not carry one.
    #[serde(default = "default_tolerance_m")]
    pub default_tolerance_m: f64,

    /// Upper bound for each route fetch.
    #[serde(default = "default_timeout_ms")]
    pub route_timeout_ms: u64,

    /// Upper bound for listing active rides.
    #[serde(default = "default_timeout_ms")]
    pub catalog_timeout_ms: u64,

    /// Maximum candidate route fetches in flight per query.
    #[serde(default = "default_max_concurrent_route_fetches")]
    pub max_concurrent_route_fetches: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            default_tolerance_m: default_tolerance_m(),
            route_timeout_ms: default_timeout_ms(),
            catalog_timeout_ms: default_timeout_ms(),
            max_concurrent_route_fetches: default_max_concurrent_route_fetches(),
        }
    }
}

impl MatcherConfig {
    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }

    fn fan_out(&self) -> usize {
        self.max_concurrent_route_fetches.max(1)
    }
}

fn default_tolerance_m() -> f64 {
    DEFAULT_TOLERANCE_M
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_concurrent_route_fetches() -> usize {
    8
}

/// Matches riders against active rides.
///
/// Collaborators are injected; the matcher holds no mutable state and can serve
/// any number of concurrent queries.
pub struct ProximityMatcher {
    catalog: Arc<dyn RideCatalog>,
    routes: Arc<dyn RouteProvider>,
    config: MatcherConfig,
}

impl ProximityMatcher {
    pub fn new(
        catalog: Arc<dyn RideCatalog>,
        routes: Arc<dyn RouteProvider>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            catalog,
            routes,
            config,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Find every active ride whose route passes within the query tolerance of
    /// both the rider's source and destination.
    ///
    /// Fails only when the rider's own route cannot be computed or the catalog
    /// cannot be listed. A candidate whose route fetch fails or times out is
    /// skipped and reported in [`MatchOutcome::failures`].
    pub async fn find_matching_rides(&self, query: &MatchQuery) -> Result<MatchOutcome, MatchError> {
        // Feasibility check only: the rider's polyline is not consulted further.
        fetch_pinned_route(
            self.routes.as_ref(),
            query.rider_source(),
            query.rider_destination(),
            self.config.route_timeout(),
        )
        .await
        .map_err(MatchError::RouteUnavailable)?;

        let catalog_timeout = self.config.catalog_timeout();
        let candidates = tokio::time::timeout(catalog_timeout, self.catalog.active_rides())
            .await
            .map_err(|_| CatalogError::Unavailable(format!("timed out after {catalog_timeout:?}")))??;

        let candidate_count = candidates.len();
        let evaluations: Vec<CandidateEvaluation> = stream::iter(candidates)
            .map(|candidate| self.evaluate_candidate(candidate, query))
            .buffered(self.config.fan_out())
            .collect()
            .await;

        let mut outcome = MatchOutcome::default();
        for evaluation in evaluations {
            match evaluation {
                CandidateEvaluation::Matched(ride) => outcome.matches.push(ride),
                CandidateEvaluation::Rejected => {}
                CandidateEvaluation::Failed(failure) => outcome.failures.push(failure),
            }
        }

        info!(
            candidates = candidate_count,
            matched = outcome.matches.len(),
            skipped = outcome.failures.len(),
            tolerance_m = query.tolerance_m(),
            "ride match query complete"
        );
        Ok(outcome)
    }

    async fn evaluate_candidate(&self, candidate: RideCandidate, query: &MatchQuery) -> CandidateEvaluation {
        let route = match fetch_pinned_route(
            self.routes.as_ref(),
            candidate.source,
            candidate.destination,
            self.config.route_timeout(),
        )
        .await
        {
            Ok(route) => route,
            Err(reason) => {
                warn!(ride_id = %candidate.id, error = %reason, "skipping candidate: route unavailable");
                return CandidateEvaluation::Failed(CandidateRouteFailure {
                    ride_id: candidate.id,
                    reason,
                });
            }
        };

        let distances = min_distance_to_route(query.rider_source(), route.points()).and_then(|source_m| {
            min_distance_to_route(query.rider_destination(), route.points()).map(|dest_m| (source_m, dest_m))
        });
        let (source_m, dest_m) = match distances {
            Ok(distances) => distances,
            Err(_) => {
                return CandidateEvaluation::Failed(CandidateRouteFailure {
                    ride_id: candidate.id,
                    reason: RouteError::EmptyGeometry,
                });
            }
        };

        let source_near = source_m <= query.tolerance_m();
        let dest_near = dest_m <= query.tolerance_m();
        debug!(
            ride_id = %candidate.id,
            source_m,
            dest_m,
            source_near,
            dest_near,
            "evaluated candidate"
        );

        if source_near && dest_near {
            CandidateEvaluation::Matched(MatchedRide {
                id: candidate.id,
                source: candidate.source,
                destination: candidate.destination,
            })
        } else {
            CandidateEvaluation::Rejected
        }
    }
}
