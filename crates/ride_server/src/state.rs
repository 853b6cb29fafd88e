use std::sync::Arc;

use ride_core::catalog::{InMemoryRideCatalog, RideCatalog};
use ride_core::matching::ProximityMatcher;
use ride_core::routing::{build_route_provider, RouteProvider};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Matcher instance (shared across requests)
    pub matcher: Arc<ProximityMatcher>,
}

impl ServerState {
    /// Create new server state from configuration.
    ///
    /// The catalog is seeded from `catalog_path` when set, otherwise it starts
    /// empty.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                let catalog = InMemoryRideCatalog::from_json_file(path)?;
                tracing::info!(path = %path, "seeded ride catalog");
                catalog
            }
            None => InMemoryRideCatalog::new(),
        };
        let routes = build_route_provider(&config.routing)?;
        Ok(Self::with_components(config, Arc::new(catalog), routes))
    }

    /// Create state around an existing catalog and route provider.
    pub fn with_components(
        config: ServerConfig,
        catalog: Arc<dyn RideCatalog>,
        routes: Arc<dyn RouteProvider>,
    ) -> Self {
        let matcher = Arc::new(ProximityMatcher::new(catalog, routes, config.matching.clone()));
        Self {
            config: Arc::new(config),
            matcher,
        }
    }
}
