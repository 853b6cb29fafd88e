use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use ride_core::geo::Coordinate;
use ride_core::matching::{MatchQuery, MatchedRide};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// Query string of a ride search: rider source, rider destination and an
/// optional tolerance in meters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub s_lat: Option<f64>,
    pub s_lng: Option<f64>,
    pub d_lat: Option<f64>,
    pub d_lng: Option<f64>,
    pub tolerance_m: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub rides: Vec<MatchedRide>,
}

fn required(value: Option<f64>, name: &str) -> ServerResult<f64> {
    value.ok_or_else(|| ServerError::BadRequest(format!("missing query parameter `{name}`")))
}

impl SearchParams {
    /// Validate the parameters into a match query, using `default_tolerance_m`
    /// when the request carries none.
    pub fn into_query(self, default_tolerance_m: f64) -> ServerResult<MatchQuery> {
        let source = Coordinate::new(required(self.s_lat, "s_lat")?, required(self.s_lng, "s_lng")?)?;
        let destination = Coordinate::new(required(self.d_lat, "d_lat")?, required(self.d_lng, "d_lng")?)?;
        let tolerance_m = self.tolerance_m.unwrap_or(default_tolerance_m);
        Ok(MatchQuery::new(source, destination, tolerance_m)?)
    }
}

/// Find active rides passing near both of the rider's endpoints.
pub async fn search_rides(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ServerResult<Json<SearchResponse>> {
    let Query(params) = params.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
    let query = params.into_query(state.matcher.config().default_tolerance_m)?;

    let deadline = state.config.timeout();
    let outcome = tokio::time::timeout(deadline, state.matcher.find_matching_rides(&query))
        .await
        .map_err(|_| ServerError::Timeout(deadline))??;
    if !outcome.failures.is_empty() {
        tracing::warn!(
            skipped = outcome.failures.len(),
            "some candidate rides were skipped because their routes were unavailable"
        );
    }

    Ok(Json(SearchResponse {
        rides: outcome.matches,
    }))
}
