//! Unit conversion and air-quality labels.

pub use skycast_core::TemperatureUnit;

use crate::types::CurrentConditions;

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn kph_to_mph(kph: f64) -> f64 {
    kph * 0.621_371
}

/// Format a Celsius reading in the requested unit, rounded: `"21°C"`, `"70°F"`.
pub fn format_temperature(celsius: f64, unit: TemperatureUnit) -> String {
    let value = match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
    };
    // Avoid printing "-0"
    let rounded = value.round() + 0.0;
    format!("{}{}", rounded, unit.symbol())
}

/// Wind speed in km/h or mph depending on the temperature unit family.
pub fn format_wind(kph: f64, unit: TemperatureUnit) -> String {
    match unit {
        TemperatureUnit::Celsius => format!("{:.0} km/h", kph),
        TemperatureUnit::Fahrenheit => format!("{:.0} mph", kph_to_mph(kph)),
    }
}

/// Text for the US EPA air quality index (1–6).
pub fn aqi_description(us_epa_index: u8) -> &'static str {
    match us_epa_index {
        1 => "Good",
        2 => "Moderate",
        3 => "Unhealthy for Sensitive Groups",
        4 => "Unhealthy",
        5 => "Very Unhealthy",
        6 => "Hazardous",
        _ => "Unknown",
    }
}

/// Air quality label for a current reading, if the provider sent one.
pub fn current_aqi(current: &CurrentConditions) -> Option<(u8, &'static str)> {
    let index = current.air_quality.as_ref()?.us_epa_index?;
    Some((index, aqi_description(index)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 1e-9);
        assert!((fahrenheit_to_celsius(32.0)).abs() < 1e-9);
        assert!((fahrenheit_to_celsius(celsius_to_fahrenheit(21.5)) - 21.5).abs() < 1e-9);
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature(21.4, TemperatureUnit::Celsius), "21°C");
        assert_eq!(format_temperature(21.0, TemperatureUnit::Fahrenheit), "70°F");
        assert_eq!(format_temperature(-0.3, TemperatureUnit::Celsius), "0°C");
    }

    #[test]
    fn test_format_wind() {
        assert_eq!(format_wind(10.0, TemperatureUnit::Celsius), "10 km/h");
        assert_eq!(format_wind(16.0934, TemperatureUnit::Fahrenheit), "10 mph");
    }

    #[test]
    fn test_aqi_description() {
        assert_eq!(aqi_description(1), "Good");
        assert_eq!(aqi_description(3), "Unhealthy for Sensitive Groups");
        assert_eq!(aqi_description(6), "Hazardous");
        assert_eq!(aqi_description(0), "Unknown");
        assert_eq!(aqi_description(7), "Unknown");
    }
}
