//! Ride catalog: the source of candidate rides for matching.
//!
//! The production system keeps rides in a document store; the matcher only needs
//! "every ride currently in the `Started` state", expressed by [`RideCatalog`].
//! [`InMemoryRideCatalog`] satisfies that contract from memory, optionally seeded
//! from a JSON file of ride records.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::geo::Coordinate;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("ride catalog unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read ride catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse ride catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideStatus {
    Started,
    Completed,
    Cancelled,
}

/// A ride record as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideCandidate {
    pub id: String,
    pub source: Coordinate,
    pub destination: Coordinate,
    pub status: RideStatus,
}

impl RideCandidate {
    pub fn started(id: impl Into<String>, source: Coordinate, destination: Coordinate) -> Self {
        Self {
            id: id.into(),
            source,
            destination,
            status: RideStatus::Started,
        }
    }
}

/// Read-only view over ride records.
#[async_trait]
pub trait RideCatalog: Send + Sync {
    /// All rides currently in the `Started` state, in stable catalog order.
    async fn active_rides(&self) -> Result<Vec<RideCandidate>, CatalogError>;
}

/// Ride catalog held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRideCatalog {
    rides: RwLock<Vec<RideCandidate>>,
}

impl InMemoryRideCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rides(rides: Vec<RideCandidate>) -> Self {
        Self {
            rides: RwLock::new(rides),
        }
    }

    /// Load a JSON array of ride records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path)?;
        let rides: Vec<RideCandidate> = serde_json::from_str(&data)?;
        Ok(Self::from_rides(rides))
    }

    /// Insert a ride, replacing any existing record with the same id in place.
    pub async fn upsert(&self, ride: RideCandidate) {
        let mut rides = self.rides.write().await;
        match rides.iter_mut().find(|existing| existing.id == ride.id) {
            Some(existing) => *existing = ride,
            None => rides.push(ride),
        }
    }

    /// Update a ride's status. Returns false if the ride is unknown.
    pub async fn set_status(&self, id: &str, status: RideStatus) -> bool {
        let mut rides = self.rides.write().await;
        match rides.iter_mut().find(|ride| ride.id == id) {
            Some(ride) => {
                ride.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.rides.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rides.read().await.is_empty()
    }
}

#[async_trait]
impl RideCatalog for InMemoryRideCatalog {
    async fn active_rides(&self) -> Result<Vec<RideCandidate>, CatalogError> {
        let rides = self.rides.read().await;
        Ok(rides
            .iter()
            .filter(|ride| ride.status == RideStatus::Started)
            .cloned()
            .collect())
    }
}
