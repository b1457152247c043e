//! Integration tests for the location fallback chain using wiremock.
//!
//! Every remote service (weather API, ipinfo, geolocation-db) is served from
//! one mock server under different paths.

use async_trait::async_trait;
use skycast_core::Config;
use skycast_weather::location::DeviceLocator;
use skycast_weather::{
    Coordinates, LocationError, LocationResolver, LocationSource, PositionRequest,
    WeatherApiClient,
};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct DeniedLocator;

#[async_trait]
impl DeviceLocator for DeniedLocator {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

struct FixedLocator(Coordinates);

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.weather.api_key = "test-key".to_string();
    config.weather.base_url = server.uri();
    config.location.ipinfo_url = format!("{}/ipinfo/json", server.uri());
    config.location.geolocation_db_url = format!("{}/geodb/json/", server.uri());
    config
}

fn resolver(config: &Config, locator: Arc<dyn DeviceLocator>) -> LocationResolver {
    let weather = Arc::new(WeatherApiClient::new(&config.weather).unwrap());
    LocationResolver::from_config_with_locator(config, weather, locator).unwrap()
}

fn current_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "location": {
            "name": name,
            "region": "Ile-de-France",
            "country": "France",
            "lat": 48.87,
            "lon": 2.33,
            "tz_id": "Europe/Paris",
            "localtime": "2026-10-19 14:05"
        },
        "current": {
            "temp_c": 14.0,
            "temp_f": 57.2,
            "condition": { "text": "Partly cloudy", "icon": "//cdn/116.png", "code": 1003 },
            "humidity": 72,
            "wind_kph": 11.2
        }
    })
}

#[tokio::test]
async fn test_falls_through_to_provider_ip_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ipinfo/json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/ip.json"))
        .and(query_param("q", "auto:ip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Paris",
            "country_name": "France",
            "lat": 48.87,
            "lon": 2.33
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geodb/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Berlin"
        })))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let location = resolver(&config, Arc::new(DeniedLocator)).resolve().await;

    assert_eq!(location.name, "Paris");
    assert_eq!(location.source, LocationSource::IpSecondary);
    assert_eq!(location.coordinates, Some(Coordinates::new(48.87, 2.33)));
}

#[tokio::test]
async fn test_falls_through_to_geolocation_db() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ipinfo/json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/ip.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geodb/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "country_code": "DE",
            "city": "Berlin",
            "latitude": 52.52,
            "longitude": 13.40
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let location = resolver(&config, Arc::new(DeniedLocator)).resolve().await;

    assert_eq!(location.name, "Berlin");
    assert_eq!(location.source, LocationSource::IpTertiary);
    assert_eq!(location.coordinates, Some(Coordinates::new(52.52, 13.40)));
    assert!(location.degraded_notice().is_none());
}

#[tokio::test]
async fn test_all_sources_failing_yields_default_city() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ipinfo/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": ""
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/ip.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geodb/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Not found",
            "latitude": "Not found",
            "longitude": "Not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let location = resolver(&config, Arc::new(DeniedLocator)).resolve().await;

    assert_eq!(location.name, "New Delhi");
    assert_eq!(location.source, LocationSource::Default);
    assert!(location.degraded_notice().is_some());
}

#[tokio::test]
async fn test_device_position_is_reverse_resolved() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .and(query_param("q", "48.8566,2.3522"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Paris")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ipinfo/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Lyon"
        })))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let locator = Arc::new(FixedLocator(Coordinates::new(48.8566, 2.3522)));
    let location = resolver(&config, locator).resolve().await;

    assert_eq!(location.name, "Paris");
    assert_eq!(location.source, LocationSource::Geolocation);
    assert_eq!(location.coordinates, Some(Coordinates::new(48.8566, 2.3522)));
}

#[tokio::test]
async fn test_reverse_lookup_without_name_falls_through() {
    let server = MockServer::start().await;

    let mut body = current_body("Paris");
    body["location"]
        .as_object_mut()
        .unwrap()
        .remove("name");

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ipinfo/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Lyon",
            "loc": "45.7485,4.8467"
        })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let locator = Arc::new(FixedLocator(Coordinates::new(45.75, 4.85)));
    let location = resolver(&config, locator).resolve().await;

    assert_eq!(location.name, "Lyon");
    assert_eq!(location.source, LocationSource::IpPrimary);
    assert_eq!(location.coordinates, Some(Coordinates::new(45.7485, 4.8467)));
}
