use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Weather condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a WeatherAPI.com condition code to a WeatherCondition
    /// See: https://www.weatherapi.com/docs/weather_conditions.json
    pub fn from_provider_code(code: i32) -> Self {
        match code {
            1000 => Self::Clear,
            1003 => Self::PartlyCloudy,
            1006 | 1009 => Self::Cloudy,
            1030 | 1135 | 1147 => Self::Fog,
            1150 | 1153 => Self::Drizzle,
            1063 | 1180 | 1183 | 1186 | 1189 | 1240 => Self::Rain,
            1192 | 1195 | 1243 | 1246 => Self::HeavyRain,
            1066 | 1114 | 1117 | 1210 | 1213 | 1216 | 1219 | 1222 | 1225 | 1255 | 1258 => {
                Self::Snow
            }
            1069 | 1072 | 1168 | 1171 | 1198 | 1201 | 1204 | 1207 | 1237 | 1249 | 1252
            | 1261 | 1264 => Self::Sleet,
            1087 | 1273 | 1276 | 1279 | 1282 => Self::Thunderstorm,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Parse `"lat,lon"` as used by ipinfo's `loc` field and by API queries.
    pub fn parse_pair(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }

    /// Query string accepted by the weather API (`q=lat,lon`).
    pub fn to_query(&self) -> String {
        format!("{:.4},{:.4}", self.lat, self.lon)
    }
}

/// Which step of the detection chain produced a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Geolocation,
    IpPrimary,
    IpSecondary,
    IpTertiary,
    Default,
    /// Supplied by the user; detection was skipped
    Manual,
}

impl LocationSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Geolocation => "device geolocation",
            Self::IpPrimary => "ipinfo.io",
            Self::IpSecondary => "weather provider IP lookup",
            Self::IpTertiary => "geolocation-db.com",
            Self::Default => "default city",
            Self::Manual => "user input",
        }
    }
}

/// Outcome of location resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub source: LocationSource,
}

impl ResolvedLocation {
    /// String to pass as `q=` to the weather API.
    ///
    /// The name is preferred so that forecasts are labelled the way the user saw them.
    pub fn query(&self) -> String {
        if self.name.trim().is_empty() {
            if let Some(coords) = self.coordinates {
                return coords.to_query();
            }
        }
        self.name.clone()
    }

    /// Warning to show when automatic detection fell back to the default city.
    pub fn degraded_notice(&self) -> Option<String> {
        (self.source == LocationSource::Default).then(|| {
            format!(
                "Could not detect your location automatically; showing weather for {}.",
                self.name
            )
        })
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("{0} returned no city")]
    MissingCity(&'static str),
    #[error("Weather API error: {0}")]
    Api(#[from] ApiError),
    #[error("Location error: {0}")]
    Other(String),
}

// --- WeatherAPI.com response shapes ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tz_id: String,
    #[serde(default)]
    pub localtime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    #[serde(default)]
    pub icon: String,
    pub code: i32,
}

impl Condition {
    pub fn category(&self) -> WeatherCondition {
        WeatherCondition::from_provider_code(self.code)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirQuality {
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(rename = "us-epa-index", default)]
    pub us_epa_index: Option<u8>,
    #[serde(rename = "gb-defra-index", default)]
    pub gb_defra_index: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub temp_f: f64,
    #[serde(default)]
    pub feelslike_c: f64,
    #[serde(default)]
    pub feelslike_f: f64,
    pub condition: Condition,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_mph: f64,
    #[serde(default)]
    pub wind_dir: String,
    #[serde(default)]
    pub uv: f64,
    #[serde(default)]
    pub is_day: u8,
    #[serde(default)]
    pub air_quality: Option<AirQuality>,
}

/// `current.json` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentReport {
    pub location: LocationInfo,
    pub current: CurrentConditions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_f: f64,
    #[serde(default)]
    pub daily_chance_of_rain: u8,
    #[serde(default)]
    pub daily_chance_of_snow: u8,
    pub condition: Condition,
}

/// Astronomy block; times are `"hh:mm AM"` strings in local time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
    #[serde(default)]
    pub moonrise: String,
    #[serde(default)]
    pub moonset: String,
    #[serde(default)]
    pub moon_phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: chrono::NaiveDate,
    pub day: DaySummary,
    pub astro: Astro,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub effective: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alert: Vec<Alert>,
}

/// `forecast.json` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    #[serde(default)]
    pub forecast: Forecast,
    #[serde(default)]
    pub alerts: Alerts,
}

impl ForecastReport {
    pub fn today(&self) -> Option<&ForecastDay> {
        self.forecast.forecastday.first()
    }
}

/// `search.json` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl SearchHit {
    pub fn display_name(&self) -> String {
        [&self.name, &self.region, &self.country]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `ip.json` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpLookup {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_provider_code_clear() {
        assert_eq!(WeatherCondition::from_provider_code(1000), WeatherCondition::Clear);
    }

    #[test]
    fn test_provider_code_clouds() {
        assert_eq!(
            WeatherCondition::from_provider_code(1003),
            WeatherCondition::PartlyCloudy
        );
        assert_eq!(WeatherCondition::from_provider_code(1006), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_provider_code(1009), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_provider_code_precipitation() {
        assert_eq!(WeatherCondition::from_provider_code(1153), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_provider_code(1183), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_provider_code(1195), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_provider_code(1219), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_provider_code(1201), WeatherCondition::Sleet);
        assert_eq!(
            WeatherCondition::from_provider_code(1276),
            WeatherCondition::Thunderstorm
        );
    }

    #[test]
    fn test_provider_code_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_provider_code(9999), WeatherCondition::Clear);
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            Coordinates::parse_pair("48.8534,2.3488"),
            Some(Coordinates::new(48.8534, 2.3488))
        );
        assert_eq!(Coordinates::parse_pair("48.8"), None);
        assert_eq!(Coordinates::parse_pair("91,0"), None);
        assert_eq!(Coordinates::parse_pair("abc,def"), None);
    }

    #[test]
    fn test_degraded_notice_only_for_default() {
        let fallback = ResolvedLocation {
            name: "New Delhi".into(),
            coordinates: None,
            source: LocationSource::Default,
        };
        assert!(fallback.degraded_notice().unwrap().contains("New Delhi"));

        let detected = ResolvedLocation {
            source: LocationSource::IpPrimary,
            ..fallback
        };
        assert!(detected.degraded_notice().is_none());
    }

    #[test]
    fn test_query_falls_back_to_coordinates() {
        let loc = ResolvedLocation {
            name: String::new(),
            coordinates: Some(Coordinates::new(1.5, 2.25)),
            source: LocationSource::Geolocation,
        };
        assert_eq!(loc.query(), "1.5000,2.2500");
    }

    #[test]
    fn test_search_hit_display_name() {
        let hit = SearchHit {
            id: 1,
            name: "Paris".into(),
            region: "Ile-de-France".into(),
            country: "France".into(),
            lat: 48.87,
            lon: 2.33,
        };
        assert_eq!(hit.display_name(), "Paris, Ile-de-France, France");
    }
}
