//! Automatic location detection.
//!
//! `LocationResolver` walks an ordered list of [`LocationStrategy`] values and
//! stops at the first one that yields a city name:
//!
//! 1. device geolocation, reverse-resolved through the weather API
//! 2. ipinfo.io
//! 3. the weather provider's own `ip.json`
//! 4. geolocation-db.com
//!
//! When every step fails the configured default city is returned with
//! [`LocationSource::Default`]. Failures are logged and never returned to the
//! caller; every step runs at most once and nothing is cached between calls.

use async_trait::async_trait;
use reqwest::Client;
use skycast_core::{Config, LocationConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::ipgeo;
use crate::provider::{build_http_client, WeatherApiClient};
use crate::types::{Coordinates, LocationError, LocationSource, ResolvedLocation};

/// Options for a device position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub timeout: Duration,
    pub high_accuracy: bool,
    /// Oldest cached fix the platform may return; zero forces a fresh one
    pub maximum_age: Duration,
}

impl Default for PositionRequest {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            high_accuracy: true,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Platform position source (GeoClue on Linux).
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn current_position(&self, request: &PositionRequest)
        -> Result<Coordinates, LocationError>;
}

/// Locator for platforms without a supported location service.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLocator;

#[async_trait]
impl DeviceLocator for UnavailableLocator {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// Best available device locator for the current platform.
pub fn platform_locator() -> Arc<dyn DeviceLocator> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(crate::geoclue::GeoClueLocator::new("skycast"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Arc::new(UnavailableLocator)
    }
}

/// One step of the detection chain.
#[async_trait]
pub trait LocationStrategy: Send + Sync {
    fn source(&self) -> LocationSource;

    async fn locate(&self) -> Result<ResolvedLocation, LocationError>;
}

/// Device position plus a reverse lookup through `current.json` for the name.
pub struct DeviceStrategy {
    locator: Arc<dyn DeviceLocator>,
    weather: Arc<WeatherApiClient>,
    request: PositionRequest,
}

impl DeviceStrategy {
    pub fn new(
        locator: Arc<dyn DeviceLocator>,
        weather: Arc<WeatherApiClient>,
        request: PositionRequest,
    ) -> Self {
        Self {
            locator,
            weather,
            request,
        }
    }
}

#[async_trait]
impl LocationStrategy for DeviceStrategy {
    fn source(&self) -> LocationSource {
        LocationSource::Geolocation
    }

    async fn locate(&self) -> Result<ResolvedLocation, LocationError> {
        let position = tokio::time::timeout(
            self.request.timeout,
            self.locator.current_position(&self.request),
        )
        .await
        .map_err(|_| LocationError::Timeout)??;

        tracing::debug!("Device position: {}, {}", position.lat, position.lon);

        let report = self.weather.current(&position.to_query()).await?;
        let name = report.location.name.trim();
        if name.is_empty() {
            return Err(LocationError::MissingCity("reverse lookup"));
        }

        Ok(ResolvedLocation {
            name: name.to_string(),
            coordinates: Some(position),
            source: LocationSource::Geolocation,
        })
    }
}

/// ipinfo.io lookup.
pub struct IpInfoStrategy {
    client: Client,
    url: String,
}

impl IpInfoStrategy {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl LocationStrategy for IpInfoStrategy {
    fn source(&self) -> LocationSource {
        LocationSource::IpPrimary
    }

    async fn locate(&self) -> Result<ResolvedLocation, LocationError> {
        let place = ipgeo::lookup_ipinfo(&self.client, &self.url).await?;
        Ok(ResolvedLocation {
            name: place.city,
            coordinates: place.coordinates,
            source: LocationSource::IpPrimary,
        })
    }
}

/// The weather provider's `ip.json` lookup.
pub struct ProviderIpStrategy {
    weather: Arc<WeatherApiClient>,
}

impl ProviderIpStrategy {
    pub fn new(weather: Arc<WeatherApiClient>) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl LocationStrategy for ProviderIpStrategy {
    fn source(&self) -> LocationSource {
        LocationSource::IpSecondary
    }

    async fn locate(&self) -> Result<ResolvedLocation, LocationError> {
        let lookup = self.weather.ip_lookup().await?;
        let city = lookup
            .city
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LocationError::MissingCity("weather provider ip.json"))?;

        let coordinates = match (lookup.lat, lookup.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        Ok(ResolvedLocation {
            name: city,
            coordinates,
            source: LocationSource::IpSecondary,
        })
    }
}

/// geolocation-db.com lookup.
pub struct GeolocationDbStrategy {
    client: Client,
    url: String,
}

impl GeolocationDbStrategy {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl LocationStrategy for GeolocationDbStrategy {
    fn source(&self) -> LocationSource {
        LocationSource::IpTertiary
    }

    async fn locate(&self) -> Result<ResolvedLocation, LocationError> {
        let place = ipgeo::lookup_geolocation_db(&self.client, &self.url).await?;
        Ok(ResolvedLocation {
            name: place.city,
            coordinates: place.coordinates,
            source: LocationSource::IpTertiary,
        })
    }
}

pub struct LocationResolver {
    strategies: Vec<Box<dyn LocationStrategy>>,
    fallback: ResolvedLocation,
}

impl LocationResolver {
    pub fn new(strategies: Vec<Box<dyn LocationStrategy>>, fallback: ResolvedLocation) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    /// Standard chain using the platform locator.
    pub fn from_config(config: &Config, weather: Arc<WeatherApiClient>) -> Result<Self, ApiError> {
        Self::from_config_with_locator(config, weather, platform_locator())
    }

    /// Standard chain with an explicit device locator.
    pub fn from_config_with_locator(
        config: &Config,
        weather: Arc<WeatherApiClient>,
        locator: Arc<dyn DeviceLocator>,
    ) -> Result<Self, ApiError> {
        let location = &config.location;
        let client = build_http_client()?;
        let mut strategies: Vec<Box<dyn LocationStrategy>> = Vec::with_capacity(4);

        if location.device_geolocation {
            let request = PositionRequest {
                timeout: Duration::from_secs(location.geolocation_timeout_secs),
                ..PositionRequest::default()
            };
            strategies.push(Box::new(DeviceStrategy::new(
                locator,
                weather.clone(),
                request,
            )));
        }
        strategies.push(Box::new(IpInfoStrategy::new(
            client.clone(),
            location.ipinfo_url.clone(),
        )));
        strategies.push(Box::new(ProviderIpStrategy::new(weather)));
        strategies.push(Box::new(GeolocationDbStrategy::new(
            client,
            location.geolocation_db_url.clone(),
        )));

        Ok(Self::new(strategies, Self::default_location(location)))
    }

    /// The location used when every strategy fails.
    pub fn default_location(config: &LocationConfig) -> ResolvedLocation {
        ResolvedLocation {
            name: config.default_city.clone(),
            coordinates: Some(Coordinates::new(config.default_lat, config.default_lon)),
            source: LocationSource::Default,
        }
    }

    /// Location typed by the user; the detection chain is skipped.
    pub fn resolve_query(query: &str) -> ResolvedLocation {
        let query = query.trim();
        ResolvedLocation {
            name: query.to_string(),
            coordinates: Coordinates::parse_pair(query),
            source: LocationSource::Manual,
        }
    }

    /// Run the chain until one strategy succeeds.
    pub async fn resolve(&self) -> ResolvedLocation {
        for strategy in &self.strategies {
            let source = strategy.source();
            match strategy.locate().await {
                Ok(location) => {
                    tracing::info!(
                        source = source.label(),
                        "Resolved location: {}",
                        location.name
                    );
                    return location;
                }
                Err(e) => {
                    tracing::debug!(source = source.label(), "Location step failed: {}", e);
                }
            }
        }

        tracing::warn!(
            "Automatic location detection failed; using default city {}",
            self.fallback.name
        );
        self.fallback.clone()
    }

    /// Like [`resolve`](Self::resolve) but abandons the in-flight step when
    /// `cancel` fires, returning `None`.
    pub async fn resolve_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Option<ResolvedLocation> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Location resolution cancelled");
                None
            }
            location = self.resolve() => Some(location),
        }
    }
}
