use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{Route, RouteError, RouteProvider};
use crate::geo::Coordinate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Routes via an OSRM HTTP endpoint.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: Client,
    endpoint: String,
}

impl OsrmRouteProvider {
    /// Create a provider for the given OSRM endpoint (e.g. `http://localhost:5000`).
    pub fn new(endpoint: &str) -> Result<Self, RouteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| RouteError::Config(format!("failed to build OSRM client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> Result<Url, RouteError> {
        let base = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.endpoint,
            origin.lng(),
            origin.lat(),
            destination.lng(),
            destination.lat(),
        );
        let mut url = Url::parse(&base)
            .map_err(|err| RouteError::Config(format!("failed to build OSRM URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

/// Minimal OSRM JSON response structures.
#[derive(Deserialize)]
pub(super) struct OsrmResponse {
    pub(super) code: String,
    pub(super) message: Option<String>,
    pub(super) routes: Option<Vec<OsrmRoute>>,
}

#[derive(Deserialize)]
pub(super) struct OsrmRoute {
    pub(super) geometry: OsrmGeometry,
}

#[derive(Deserialize)]
pub(super) struct OsrmGeometry {
    pub(super) coordinates: Vec<[f64; 2]>, // [lng, lat]
}

pub(super) fn parse_route_response(resp: OsrmResponse) -> Result<Route, RouteError> {
    match resp.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RouteError::NoRoute),
        other => {
            let detail = resp.message.unwrap_or_default();
            return Err(RouteError::Upstream(format!("{other}: {detail}")));
        }
    }

    let route = resp
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(RouteError::NoRoute)?;

    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| Coordinate::new(*lat, *lng))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| RouteError::Decode(err.to_string()))?;

    Route::new(points)
}

#[async_trait]
impl RouteProvider for OsrmRouteProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        let url = self.route_url(origin, destination)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RouteError::Http(err.to_string()))?;
        let parsed: OsrmResponse = response
            .json()
            .await
            .map_err(|err| RouteError::Decode(err.to_string()))?;
        parse_route_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Route, RouteError> {
        let resp: OsrmResponse = serde_json::from_str(json).expect("valid OSRM json");
        parse_route_response(resp)
    }

    #[test]
    fn parses_geojson_geometry_as_lat_lng() {
        let route = parse(
            r#"{"code":"Ok","routes":[{"geometry":{"type":"LineString",
                "coordinates":[[77.5946,12.9716],[77.61,12.95],[77.6245,12.9352]]}}]}"#,
        )
        .expect("route");
        assert_eq!(route.len(), 3);
        assert_eq!(route.first().lat(), 12.9716);
        assert_eq!(route.first().lng(), 77.5946);
        assert_eq!(route.last().lat(), 12.9352);
    }

    #[test]
    fn no_route_code_maps_to_no_route() {
        let result = parse(r#"{"code":"NoRoute","message":"Impossible route"}"#);
        assert_eq!(result, Err(RouteError::NoRoute));
    }

    #[test]
    fn other_codes_map_to_upstream_error() {
        let result = parse(r#"{"code":"InvalidQuery","message":"bad coordinates"}"#);
        assert!(matches!(result, Err(RouteError::Upstream(msg)) if msg.contains("InvalidQuery")));
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let result = parse(r#"{"code":"Ok","routes":[{"geometry":{"coordinates":[]}}]}"#);
        assert_eq!(result, Err(RouteError::EmptyGeometry));
    }

    #[test]
    fn builds_lng_lat_route_url() {
        let provider = OsrmRouteProvider::new("http://localhost:5000/").expect("client");
        let origin = Coordinate::new(12.9716, 77.5946).expect("valid");
        let destination = Coordinate::new(12.9352, 77.6245).expect("valid");
        let url = provider.route_url(origin, destination).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/route/v1/driving/77.5946,12.9716;77.6245,12.9352?overview=full&geometries=geojson"
        );
    }
}
