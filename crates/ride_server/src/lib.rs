//! Ride matching server: HTTP API over the proximity matching engine.
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /api/v1/rides/search?s_lat=&s_lng=&d_lat=&d_lng=[&tolerance_m=]` -
//!   active rides passing near both rider endpoints
//! - `GET /search_rides` - alias of the search endpoint
//!
//! Configuration comes from an optional `rideshare.{toml,yaml,json}` file and
//! `RIDESHARE__*` environment variables, e.g. `RIDESHARE__PORT=9000` or
//! `RIDESHARE__ROUTING__PROVIDER__KIND=osrm`.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
