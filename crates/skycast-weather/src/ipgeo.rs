//! Third-party IP geolocation lookups (ipinfo.io, geolocation-db.com).
//! Both are free and keyless; they only need a non-empty `city` to count.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{Coordinates, LocationError};

/// City (and coordinates when the service reports them) derived from the caller's IP.
#[derive(Debug, Clone, PartialEq)]
pub struct IpPlace {
    pub city: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    city: Option<String>,
    /// `"lat,lon"`
    loc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeolocationDbResponse {
    city: Option<String>,
    // Either a number or the string "Not found"
    latitude: Option<Value>,
    longitude: Option<Value>,
}

/// Trim a reported city name and drop placeholders.
fn usable_city(city: Option<String>) -> Option<String> {
    city.map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("not found"))
}

async fn fetch_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    url: &str,
) -> Result<T, LocationError> {
    let response = client.get(url).send().await.map_err(ApiError::from)?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!("IP lookup {} returned status {}", url, status);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: format!("IP lookup failed: {}", url),
        }
        .into());
    }

    let body = response.text().await.map_err(ApiError::from)?;
    serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()).into())
}

/// `GET https://ipinfo.io/json`
pub async fn lookup_ipinfo(client: &Client, url: &str) -> Result<IpPlace, LocationError> {
    let body: IpInfoResponse = fetch_json(client, url).await?;
    let city = usable_city(body.city).ok_or(LocationError::MissingCity("ipinfo.io"))?;
    let coordinates = body.loc.as_deref().and_then(Coordinates::parse_pair);
    Ok(IpPlace { city, coordinates })
}

/// `GET https://geolocation-db.com/json/`
pub async fn lookup_geolocation_db(client: &Client, url: &str) -> Result<IpPlace, LocationError> {
    let body: GeolocationDbResponse = fetch_json(client, url).await?;
    let city =
        usable_city(body.city).ok_or(LocationError::MissingCity("geolocation-db.com"))?;
    let lat = body.latitude.as_ref().and_then(Value::as_f64);
    let lon = body.longitude.as_ref().and_then(Value::as_f64);
    let coordinates = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };
    Ok(IpPlace { city, coordinates })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_usable_city() {
        assert_eq!(usable_city(Some(" Lyon ".into())), Some("Lyon".into()));
        assert_eq!(usable_city(Some("".into())), None);
        assert_eq!(usable_city(Some("Not found".into())), None);
        assert_eq!(usable_city(None), None);
    }

    #[test]
    fn test_geolocation_db_placeholder_coordinates() {
        let body: GeolocationDbResponse = serde_json::from_str(
            r#"{"country_code":"Not found","city":"Not found","latitude":"Not found","longitude":"Not found"}"#,
        )
        .unwrap();
        assert!(usable_city(body.city).is_none());
        assert!(body.latitude.as_ref().and_then(Value::as_f64).is_none());
    }
}
