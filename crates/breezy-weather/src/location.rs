//! Device position lookup.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use breezy_core::LocationConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::types::LocationError;

/// A resolved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub city: Option<String>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
            city: None,
        }
    }

    /// `"lat,lon"`, the form the forecast endpoint accepts as a query.
    pub fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Anything that can report where the user is.
pub trait Geolocator: Send + Sync {
    fn locate(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send;
}

/// Position reported by an IP geolocation service.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Arc<Client>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    city: Option<String>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            url: url.into(),
        }
    }
}

impl Geolocator for IpGeolocator {
    #[instrument(skip(self), level = "debug")]
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("IP lookup failed: {}", e);
                LocationError::ServiceUnavailable
            })?;

        if !response.status().is_success() {
            tracing::warn!("IP lookup returned {}", response.status());
            return Err(LocationError::ServiceUnavailable);
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        if body.status != "success" {
            return Err(LocationError::Other(
                body.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
                accuracy_meters: None,
                city: body.city.filter(|c| !c.is_empty()),
            }),
            _ => Err(LocationError::Other("lookup returned no position".to_string())),
        }
    }
}

/// Always reports the same position.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    coordinates: Coordinates,
}

impl FixedGeolocator {
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates.clone())
    }
}

/// Geolocator chosen from configuration: a fixed position when both
/// coordinates are set, otherwise the IP lookup.
#[derive(Debug, Clone)]
pub enum ConfiguredGeolocator {
    Fixed(FixedGeolocator),
    Ip(IpGeolocator),
}

impl ConfiguredGeolocator {
    pub fn from_config(config: &LocationConfig) -> Self {
        match (config.fixed_latitude, config.fixed_longitude) {
            (Some(lat), Some(lon)) => Self::Fixed(FixedGeolocator::new(Coordinates::new(lat, lon))),
            _ => Self::Ip(IpGeolocator::new(&config.ip_lookup_url)),
        }
    }
}

impl Geolocator for ConfiguredGeolocator {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        match self {
            Self::Fixed(g) => g.locate().await,
            Self::Ip(g) => g.locate().await,
        }
    }
}

/// One-shot position request bounded by `timeout`, as a forecast query.
pub async fn current_location_query<G: Geolocator>(
    geolocator: &G,
    timeout: Duration,
) -> Result<String, LocationError> {
    let coordinates = tokio::time::timeout(timeout, geolocator.locate())
        .await
        .map_err(|_| LocationError::Timeout)??;

    tracing::debug!("Located at {}", coordinates.to_query());
    Ok(coordinates.to_query())
}
