//! WeatherAPI.com REST client.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skycast_core::WeatherConfig;
use std::time::Duration;
use tracing::instrument;

use crate::error::ApiError;
use crate::types::{CurrentReport, ForecastReport, IpLookup, SearchHit};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));
const MAX_FORECAST_DAYS: u8 = 14;

/// Provider error code for "No matching location found."
const ERROR_CODE_NO_LOCATION: i32 = 1006;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Shared HTTP client settings for every outbound call.
pub fn build_http_client() -> Result<Client, ApiError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, ApiError> {
        Ok(Self::with_client(build_http_client()?, config))
    }

    pub fn with_client(client: Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        }
    }

    /// Current conditions for a city name, `"lat,lon"` pair, or `auto:ip`.
    #[instrument(skip(self), level = "info")]
    pub async fn current(&self, query: &str) -> Result<CurrentReport, ApiError> {
        self.get_json("/v1/current.json", &[("q", query), ("aqi", "yes")])
            .await
    }

    /// Multi-day forecast including air quality and alerts.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast(&self, query: &str, days: u8) -> Result<ForecastReport, ApiError> {
        let days = days.clamp(1, MAX_FORECAST_DAYS).to_string();
        self.get_json(
            "/v1/forecast.json",
            &[
                ("q", query),
                ("days", days.as_str()),
                ("aqi", "yes"),
                ("alerts", "yes"),
            ],
        )
        .await
    }

    /// Autocomplete search for locations.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, partial: &str) -> Result<Vec<SearchHit>, ApiError> {
        let partial = partial.trim();
        if partial.is_empty() {
            return Ok(Vec::new());
        }
        self.get_json("/v1/search.json", &[("q", partial)]).await
    }

    /// The provider's own IP geolocation.
    #[instrument(skip(self), level = "info")]
    pub async fn ip_lookup(&self) -> Result<IpLookup, ApiError> {
        self.get_json("/v1/ip.json", &[("q", "auto:ip")]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::status_error(status.as_u16(), &body, params));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Failed to parse {} response: {}", path, e);
            ApiError::Malformed(e.to_string())
        })
    }

    fn status_error(status: u16, body: &str, params: &[(&str, &str)]) -> ApiError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

        if status == 401 || status == 403 {
            return ApiError::InvalidApiKey;
        }

        match envelope {
            Some(env) if env.error.code == ERROR_CODE_NO_LOCATION => {
                let query = params
                    .iter()
                    .find(|(k, _)| *k == "q")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                ApiError::LocationNotFound(query)
            }
            Some(env) => ApiError::Status {
                status,
                message: env.error.message,
            },
            None => ApiError::Status {
                status,
                message: body.chars().take(200).collect(),
            },
        }
    }
}
