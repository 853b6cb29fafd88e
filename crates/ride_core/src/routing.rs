//! Pluggable route providers: trait abstraction for routing backends.
//!
//! Implementations, selectable via [`RouteProviderKind`]:
//!
//! - **`StraightLineRouteProvider`**: densified straight line between the endpoints. Zero dependencies.
//! - **`OsrmRouteProvider`** (feature `osrm`): calls a local/remote OSRM HTTP endpoint.
//! - **`GoogleDirectionsProvider`** (feature `google-directions`): calls the Google Directions API
//!   and decodes its encoded overview polyline.
//!
//! HTTP providers are wrapped in a [`CachedRouteProvider`] by [`build_route_provider`]. Callers
//! that need the exact requested endpoints on the polyline go through [`fetch_pinned_route`].

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use h3o::{CellIndex, Resolution};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geo::{great_circle_distance_m, Coordinate};

#[cfg(feature = "google-directions")]
pub mod google;
#[cfg(feature = "osrm")]
pub mod osrm;
#[cfg(feature = "google-directions")]
pub mod polyline;


// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("no driving route between the requested points")]
    NoRoute,

    #[error("routing service error: {0}")]
    Upstream(String),

    #[error("routing request failed: {0}")]
    Http(String),

    #[error("could not decode routing response: {0}")]
    Decode(String),

    #[error("routing service returned an empty route")]
    EmptyGeometry,

    #[error("routing request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid routing configuration: {0}")]
    Config(String),
}

/// Ordered, non-empty polyline approximating a driving path.
#[derive(Debug, Clone, PartialEq)]
pub struct Route(Vec<Coordinate>);

impl Route {
    pub fn new(points: Vec<Coordinate>) -> Result<Self, RouteError> {
        if points.is_empty() {
            return Err(RouteError::EmptyGeometry);
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Coordinate {
        self.0[0]
    }

    pub fn last(&self) -> Coordinate {
        self.0[self.0.len() - 1]
    }

    /// Make the polyline start exactly at `origin` and end exactly at `destination`.
    ///
    /// Providers snap endpoints to the road network, so the rendered polyline
    /// usually starts a few metres away from what was asked for.
    pub fn pin_endpoints(mut self, origin: Coordinate, destination: Coordinate) -> Self {
        if self.first() != origin {
            self.0.insert(0, origin);
        }
        if self.last() != destination {
            self.0.push(destination);
        }
        self
    }
}

/// Trait for routing backends. Implementations must be `Send + Sync` so a single
/// provider can be shared across concurrent queries.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Compute a driving route between two coordinates.
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError>;
}

/// Fetch a route under `timeout` and pin the requested endpoints onto it.
pub async fn fetch_pinned_route(
    provider: &dyn RouteProvider,
    origin: Coordinate,
    destination: Coordinate,
    timeout: Duration,
) -> Result<Route, RouteError> {
    let route = tokio::time::timeout(timeout, provider.route(origin, destination))
        .await
        .map_err(|_| RouteError::Timeout(timeout))??;
    Ok(route.pin_endpoints(origin, destination))
}

// ---------------------------------------------------------------------------
// Straight-line provider (always available)
// ---------------------------------------------------------------------------

const DEFAULT_STRAIGHT_LINE_SPACING_M: f64 = 100.0;
const MAX_STRAIGHT_LINE_VERTICES: usize = 10_000;

/// Interpolates vertices every `spacing_m` metres along the straight line
/// between the endpoints (linear in degrees, fine at city scale).
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouteProvider {
    spacing_m: f64,
}

impl StraightLineRouteProvider {
    pub fn new(spacing_m: f64) -> Self {
        let spacing_m = if spacing_m.is_finite() && spacing_m > 0.0 {
            spacing_m
        } else {
            DEFAULT_STRAIGHT_LINE_SPACING_M
        };
        Self { spacing_m }
    }

    pub fn polyline(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        let distance_m = great_circle_distance_m(origin, destination);
        if distance_m == 0.0 {
            return Route::new(vec![origin]);
        }

        let segments = ((distance_m / self.spacing_m).ceil() as usize).clamp(1, MAX_STRAIGHT_LINE_VERTICES);
        let mut points = Vec::with_capacity(segments + 1);
        points.push(origin);
        for step in 1..segments {
            let t = step as f64 / segments as f64;
            let lat = origin.lat() + (destination.lat() - origin.lat()) * t;
            let lng = origin.lng() + (destination.lng() - origin.lng()) * t;
            let point = Coordinate::new(lat.clamp(-90.0, 90.0), lng.clamp(-180.0, 180.0))
                .map_err(|err| RouteError::Decode(err.to_string()))?;
            points.push(point);
        }
        points.push(destination);
        Route::new(points)
    }
}

impl Default for StraightLineRouteProvider {
    fn default() -> Self {
        Self::new(DEFAULT_STRAIGHT_LINE_SPACING_M)
    }
}

#[async_trait]
impl RouteProvider for StraightLineRouteProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        self.polyline(origin, destination)
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// Default route cache capacity.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 20_000;
const DEFAULT_ROUTE_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CACHE_RESOLUTION: Resolution = Resolution::Twelve;

struct CachedRoute {
    route: Route,
    fetched_at: Instant,
}

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// Cache key is the directional pair of H3 cells containing origin and destination, so
/// requests a few metres apart share one upstream call. Entries older than the TTL are
/// treated as misses: routing depends on live traffic and goes stale.
/// On inner failure the optional fallback provider is tried before returning the error;
/// its answers are never cached.
pub struct CachedRouteProvider {
    inner: Arc<dyn RouteProvider>,
    cache: Mutex<LruCache<(CellIndex, CellIndex), CachedRoute>>,
    ttl: Duration,
    resolution: Resolution,
    fallback: Option<Arc<dyn RouteProvider>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Arc<dyn RouteProvider>, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
            resolution: DEFAULT_CACHE_RESOLUTION,
            fallback: None,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn RouteProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn key(&self, origin: Coordinate, destination: Coordinate) -> Option<(CellIndex, CellIndex)> {
        let from = origin.to_cell(self.resolution).ok()?;
        let to = destination.to_cell(self.resolution).ok()?;
        Some((from, to))
    }

    fn lookup(&self, key: &(CellIndex, CellIndex)) -> Option<Route> {
        let mut cache = self.cache.lock().ok()?;
        let fresh = cache.get(key).map(|entry| entry.fetched_at.elapsed() < self.ttl)?;
        if fresh {
            cache.get(key).map(|entry| entry.route.clone())
        } else {
            cache.pop(key);
            None
        }
    }

    fn store(&self, key: (CellIndex, CellIndex), route: &Route) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CachedRoute {
                    route: route.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

#[async_trait]
impl RouteProvider for CachedRouteProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        let key = self.key(origin, destination);

        if let Some(route) = key.as_ref().and_then(|key| self.lookup(key)) {
            debug!(%origin, %destination, "route cache hit");
            return Ok(route);
        }

        let err = match self.inner.route(origin, destination).await {
            Ok(route) => {
                if let Some(key) = key {
                    self.store(key, &route);
                }
                return Ok(route);
            }
            Err(err) => err,
        };

        // Fallback answers are never cached.
        match &self.fallback {
            Some(fallback) => {
                warn!(%origin, %destination, error = %err, "route provider failed, using fallback");
                fallback.route(origin, destination).await
            }
            None => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Factory: build a provider from configuration
// ---------------------------------------------------------------------------

/// Which routing backend to use.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteProviderKind {
    /// Densified straight line, zero external dependencies.
    StraightLine {
        #[serde(default = "default_spacing_m")]
        spacing_m: f64,
    },
    /// OSRM HTTP endpoint (e.g. `"http://localhost:5000"`).
    #[cfg(feature = "osrm")]
    Osrm { endpoint: String },
    /// Google Directions API.
    #[cfg(feature = "google-directions")]
    GoogleDirections {
        api_key: String,
        #[serde(default = "google::default_endpoint")]
        endpoint: String,
    },
}

impl Default for RouteProviderKind {
    fn default() -> Self {
        Self::StraightLine {
            spacing_m: DEFAULT_STRAIGHT_LINE_SPACING_M,
        }
    }
}

fn default_spacing_m() -> f64 {
    DEFAULT_STRAIGHT_LINE_SPACING_M
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    #[serde(default)]
    pub provider: RouteProviderKind,

    /// Maximum cached routes; 0 disables the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// H3 resolution used to bucket cache keys.
    #[serde(default = "default_cache_resolution")]
    pub cache_resolution: u8,

    /// Fall back to a straight line when the upstream provider fails.
    #[serde(default)]
    pub fallback_to_straight_line: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            provider: RouteProviderKind::default(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_resolution: default_cache_resolution(),
            fallback_to_straight_line: false,
        }
    }
}

impl RoutingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn resolution(&self) -> Result<Resolution, RouteError> {
        Resolution::try_from(self.cache_resolution)
            .map_err(|err| RouteError::Config(format!("cache_resolution: {err}")))
    }
}

fn default_cache_capacity() -> usize {
    DEFAULT_ROUTE_CACHE_CAPACITY
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_ROUTE_CACHE_TTL.as_secs()
}

fn default_cache_resolution() -> u8 {
    u8::from(DEFAULT_CACHE_RESOLUTION)
}

/// Construct a shared [`RouteProvider`] from configuration.
///
/// - `StraightLine` is returned without caching (it is pure computation).
/// - HTTP providers are wrapped in a [`CachedRouteProvider`] unless the cache is disabled,
///   optionally falling back to a straight line on upstream failure.
pub fn build_route_provider(config: &RoutingConfig) -> Result<Arc<dyn RouteProvider>, RouteError> {
    let upstream: Arc<dyn RouteProvider> = match &config.provider {
        RouteProviderKind::StraightLine { spacing_m } => {
            return Ok(Arc::new(StraightLineRouteProvider::new(*spacing_m)));
        }

        #[cfg(feature = "osrm")]
        RouteProviderKind::Osrm { endpoint } => Arc::new(osrm::OsrmRouteProvider::new(endpoint)?),

        #[cfg(feature = "google-directions")]
        RouteProviderKind::GoogleDirections { api_key, endpoint } => {
            Arc::new(google::GoogleDirectionsProvider::new(endpoint, api_key)?)
        }
    };

    if config.cache_capacity == 0 {
        return Ok(upstream);
    }

    let mut cached = CachedRouteProvider::new(upstream, config.cache_capacity, config.cache_ttl())
        .with_resolution(config.resolution()?);
    if config.fallback_to_straight_line {
        cached = cached.with_fallback(Arc::new(StraightLineRouteProvider::default()));
    }
    Ok(Arc::new(cached))
}
