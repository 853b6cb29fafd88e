//! Google Directions API provider.
//!
//! Requests a driving route departing now and decodes the route's
//! `overview_polyline`, which is a smoothed rendering of the full path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{polyline, Route, RouteError, RouteProvider};
use crate::geo::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/directions/json";

pub(super) fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

#[derive(Clone)]
pub struct GoogleDirectionsProvider {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleDirectionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDirectionsProvider")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GoogleDirectionsProvider {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, RouteError> {
        if api_key.trim().is_empty() {
            return Err(RouteError::Config("Google Directions API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| RouteError::Config(format!("failed to build directions client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn directions_url(&self, origin: Coordinate, destination: Coordinate) -> Result<Url, RouteError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| RouteError::Config(format!("invalid directions endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("origin", &format!("{},{}", origin.lat(), origin.lng()))
            .append_pair("destination", &format!("{},{}", destination.lat(), destination.lng()))
            .append_pair("mode", "driving")
            .append_pair("departure_time", "now")
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[derive(Deserialize)]
pub(super) struct DirectionsResponse {
    pub(super) status: String,
    pub(super) error_message: Option<String>,
    #[serde(default)]
    pub(super) routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
pub(super) struct DirectionsRoute {
    pub(super) overview_polyline: EncodedPolyline,
}

#[derive(Deserialize)]
pub(super) struct EncodedPolyline {
    pub(super) points: String,
}

pub(super) fn parse_directions_response(resp: DirectionsResponse) -> Result<Route, RouteError> {
    match resp.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => return Err(RouteError::NoRoute),
        other => {
            let detail = resp.error_message.unwrap_or_default();
            return Err(RouteError::Upstream(format!("{other}: {detail}")));
        }
    }

    let route = resp.routes.into_iter().next().ok_or(RouteError::NoRoute)?;
    Route::new(polyline::decode(&route.overview_polyline.points)?)
}

#[async_trait]
impl RouteProvider for GoogleDirectionsProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        let url = self.directions_url(origin, destination)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RouteError::Http(err.without_url().to_string()))?;
        let parsed: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| RouteError::Decode(err.without_url().to_string()))?;
        parse_directions_response(parsed)
    }
}
