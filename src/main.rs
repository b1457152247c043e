//! `skycast`: terminal weather dashboard.

mod cli;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, NaiveTime};
use clap::Parser;
use skycast_core::{AppError, Config, ProgressCurve, TemperatureUnit};
use skycast_prefs::{Preferences, SqliteStore};
use skycast_weather::units::{current_aqi, format_temperature, format_wind};
use skycast_weather::{
    DayNightState, DayNightTicker, ForecastReport, LocationResolver, ResolvedLocation,
    SolarWindow, WeatherApiClient,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{CompareCmd, FavoritesCmd, Opts, SubCommand};

/// Everything a command needs, built once from the configuration.
struct Context {
    config: Config,
    weather: Arc<WeatherApiClient>,
    cancel: CancellationToken,
}

impl Context {
    fn new(config: Config) -> Result<Self> {
        let weather = WeatherApiClient::new(&config.weather).map_err(AppError::from)?;
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupted");
                token.cancel();
            }
        });

        Ok(Self {
            config,
            weather: Arc::new(weather),
            cancel,
        })
    }

    fn prefs(&self) -> Result<Preferences<SqliteStore>> {
        let store = SqliteStore::new(self.config.prefs_path()).map_err(AppError::from)?;
        Ok(Preferences::new(store))
    }

    /// Stored unit, falling back to the config file when preferences are unavailable.
    fn unit(&self) -> TemperatureUnit {
        let fallback = self.config.weather.temperature_unit;
        match self.prefs().and_then(|p| Ok(p.temperature_unit_or(fallback)?)) {
            Ok(unit) => unit,
            Err(e) => {
                tracing::warn!("Using configured unit, preferences unavailable: {}", e);
                fallback
            }
        }
    }

    fn record_search(&self, query: &str) {
        if let Err(e) = self.prefs().and_then(|p| Ok(p.record_search(query)?)) {
            tracing::warn!("Could not record search '{}': {}", query, e);
        }
    }

    /// Explicit query, or automatic detection. `None` when interrupted.
    async fn locate(&self, city: Option<&str>) -> Result<Option<ResolvedLocation>> {
        if let Some(city) = city {
            return Ok(Some(LocationResolver::resolve_query(city)));
        }

        let resolver = LocationResolver::from_config(&self.config, Arc::clone(&self.weather))
            .map_err(AppError::from)?;
        let location = resolver.resolve_with_cancel(&self.cancel).await;
        if let Some(notice) = location.as_ref().and_then(ResolvedLocation::degraded_notice) {
            eprintln!("{}", notice);
        }
        Ok(location)
    }

    async fn forecast(&self, location: &ResolvedLocation, days: u8) -> Result<ForecastReport> {
        let report = self
            .weather
            .forecast(&location.query(), days)
            .await
            .map_err(AppError::from)?;
        Ok(report)
    }
}

/// Local wall-clock time at the forecast location, from the provider's `localtime`.
fn location_time(report: &ForecastReport) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&report.location.localtime, "%Y-%m-%d %H:%M").ok()
}

fn solar_window(report: &ForecastReport) -> Result<Option<SolarWindow>> {
    let Some(today) = report.today() else {
        return Ok(None);
    };
    let window =
        SolarWindow::parse(&today.astro.sunrise, &today.astro.sunset).map_err(AppError::from)?;
    Ok(Some(window))
}

fn day_night_line(state: &DayNightState) -> String {
    format!(
        "{:<8} {:>5.1}%  {}",
        state.bucket.label(),
        state.progress_percent,
        state.countdown_label()
    )
}

fn print_report(
    report: &ForecastReport,
    location: &ResolvedLocation,
    unit: TemperatureUnit,
    curve: ProgressCurve,
) -> Result<()> {
    let place = &report.location;
    let current = &report.current;

    println!("{}, {} ({})", place.name, place.country, location.source.label());
    println!(
        "{}  {} (feels like {})",
        current.condition.text,
        format_temperature(current.temp_c, unit),
        format_temperature(current.feelslike_c, unit)
    );
    println!(
        "Humidity {}%  Wind {} {}  UV {}",
        current.humidity,
        format_wind(current.wind_kph, unit),
        current.wind_dir,
        current.uv
    );
    if let Some((index, label)) = current_aqi(current) {
        println!("Air quality: {} ({})", label, index);
    }

    // Polar day/night arrives as "No sunrise" / "No sunset"; skip the sky line then
    match solar_window(report) {
        Ok(Some(window)) => {
            let now = location_time(report)
                .map(|dt| dt.time())
                .unwrap_or_else(|| Local::now().time());
            println!("Sky: {}", day_night_line(&window.state_at(now, curve)));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Skipping day/night line for {}: {}", place.name, e),
    }

    for alert in &report.alerts.alert {
        println!("! {} [{}]: {}", alert.event, alert.severity, alert.headline);
    }

    if !report.forecast.forecastday.is_empty() {
        println!();
        for day in &report.forecast.forecastday {
            println!(
                "{}  {:<24} {:>5} / {:<5} rain {}%",
                day.date.format("%a %d %b"),
                day.day.condition.text,
                format_temperature(day.day.maxtemp_c, unit),
                format_temperature(day.day.mintemp_c, unit),
                day.day.daily_chance_of_rain
            );
        }
    }
    Ok(())
}

// ------

async fn cmd_now(ctx: &Context, city: Option<String>, days: Option<u8>) -> Result<()> {
    let Some(location) = ctx.locate(city.as_deref()).await? else {
        return Ok(());
    };
    let days = days.unwrap_or(ctx.config.weather.forecast_days);
    let report = ctx.forecast(&location, days).await?;

    if let Some(city) = city.as_deref() {
        ctx.record_search(city);
    }
    print_report(&report, &location, ctx.unit(), ctx.config.display.progress_curve)
}

async fn cmd_watch(ctx: &Context, city: Option<String>) -> Result<()> {
    let Some(location) = ctx.locate(city.as_deref()).await? else {
        return Ok(());
    };
    let report = ctx.forecast(&location, 1).await?;
    if let Some(city) = city.as_deref() {
        ctx.record_search(city);
    }

    let window = match solar_window(&report) {
        Ok(Some(window)) => window,
        Ok(None) => anyhow::bail!("No sunrise/sunset data for {}", report.location.name),
        Err(e) => anyhow::bail!(
            "{} has no usable sunrise/sunset today: {}",
            report.location.name,
            e
        ),
    };

    // Follow the location's clock rather than the machine's
    let offset = location_time(&report)
        .map(|there| there - Local::now().naive_local())
        .unwrap_or_else(chrono::Duration::zero);
    let clock = move || -> NaiveTime { (Local::now().naive_local() + offset).time() };

    println!(
        "{}: sunrise {}, sunset {}",
        report.location.name,
        report.today().map(|d| d.astro.sunrise.as_str()).unwrap_or("?"),
        report.today().map(|d| d.astro.sunset.as_str()).unwrap_or("?")
    );

    let ticker = DayNightTicker::spawn(window, ctx.config.display.progress_curve, clock);
    let mut rx = ticker.subscribe();
    println!("{}", day_night_line(&ticker.current()));

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *rx.borrow_and_update();
                println!("{}", day_night_line(&state));
            }
        }
    }

    ticker.stop();
    Ok(())
}

async fn cmd_search(ctx: &Context, partial: &str) -> Result<()> {
    let hits = ctx.weather.search(partial).await.map_err(AppError::from)?;
    if hits.is_empty() {
        println!("No locations match '{}'", partial.trim());
        return Ok(());
    }
    ctx.record_search(partial);
    for hit in hits {
        println!("{:<48} {:>8.3},{:.3}", hit.display_name(), hit.lat, hit.lon);
    }
    Ok(())
}

fn cmd_favorites(ctx: &Context, cmd: Option<FavoritesCmd>) -> Result<()> {
    let prefs = ctx.prefs()?;
    match cmd.unwrap_or(FavoritesCmd::List) {
        FavoritesCmd::List => {
            let favorites = prefs.favorites().map_err(AppError::from)?;
            if favorites.is_empty() {
                println!("No favorite cities yet");
            }
            for name in favorites {
                println!("{}", name);
            }
        }
        FavoritesCmd::Add { name } => {
            if prefs.add_favorite(&name).map_err(AppError::from)? {
                println!("Added {}", name.trim());
            } else {
                println!("{} is already a favorite", name.trim());
            }
        }
        FavoritesCmd::Remove { name } => {
            if prefs.remove_favorite(&name).map_err(AppError::from)? {
                println!("Removed {}", name.trim());
            } else {
                println!("{} is not a favorite", name.trim());
            }
        }
    }
    Ok(())
}

fn cmd_history(ctx: &Context, clear: bool) -> Result<()> {
    let prefs = ctx.prefs()?;
    if clear {
        prefs.clear_history().map_err(AppError::from)?;
        println!("Search history cleared");
        return Ok(());
    }
    for query in prefs.search_history().map_err(AppError::from)? {
        println!("{}", query);
    }
    Ok(())
}

fn cmd_unit(ctx: &Context, unit: Option<TemperatureUnit>) -> Result<()> {
    let prefs = ctx.prefs()?;
    if let Some(unit) = unit {
        prefs.set_temperature_unit(unit).map_err(AppError::from)?;
    }
    let current = prefs
        .temperature_unit_or(ctx.config.weather.temperature_unit)
        .map_err(AppError::from)?;
    println!("{:?} ({})", current, current.symbol());
    Ok(())
}

async fn cmd_compare(ctx: &Context, cmd: Option<CompareCmd>) -> Result<()> {
    let prefs = ctx.prefs()?;
    match cmd {
        Some(CompareCmd::Add { name }) => {
            if !prefs.add_comparison(&name).map_err(AppError::from)? {
                println!("{} is already being compared", name.trim());
            }
            return Ok(());
        }
        Some(CompareCmd::Remove { name }) => {
            if !prefs.remove_comparison(&name).map_err(AppError::from)? {
                println!("{} is not being compared", name.trim());
            }
            return Ok(());
        }
        None => {}
    }

    let unit = ctx.unit();
    let names = prefs.comparisons().map_err(AppError::from)?;
    if names.is_empty() {
        println!("No comparison locations; add one with `skycast compare add <city>`");
    }
    for name in names {
        if ctx.cancel.is_cancelled() {
            break;
        }
        match ctx.weather.current(&name).await {
            Ok(report) => println!(
                "{:<20} {:>6}  {}",
                report.location.name,
                format_temperature(report.current.temp_c, unit),
                report.current.condition.category().description()
            ),
            Err(e) => {
                tracing::debug!("Comparison lookup for {} failed: {}", name, e);
                println!("{:<20} {}", name, AppError::from(e).user_message());
            }
        }
    }
    Ok(())
}

async fn run(opts: Opts) -> Result<()> {
    let (config, _validation) = Config::load_validated(opts.config.as_deref())?;
    let ctx = Context::new(config)?;

    match opts.subcmd {
        SubCommand::Now(now) => cmd_now(&ctx, now.city, now.days).await,
        SubCommand::Watch(watch) => cmd_watch(&ctx, watch.city).await,
        SubCommand::Search(search) => cmd_search(&ctx, &search.partial).await,
        SubCommand::Favorites(fav) => cmd_favorites(&ctx, fav.subcmd),
        SubCommand::History(history) => cmd_history(&ctx, history.clear),
        SubCommand::Unit(unit) => cmd_unit(&ctx, unit.unit.map(TemperatureUnit::from)),
        SubCommand::Compare(compare) => cmd_compare(&ctx, compare.subcmd).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    skycast_core::init_with_default_filter(opts.log_filter())?;

    if let Err(err) = run(opts).await {
        tracing::debug!("{:?}", err);
        match err.downcast_ref::<AppError>() {
            Some(app) => eprintln!("Error: {}\n  {}", app.user_message(), app),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn report_with_astro(sunrise: &str, sunset: &str) -> ForecastReport {
        serde_json::from_value(serde_json::json!({
            "location": {
                "name": "Tromso",
                "country": "Norway",
                "lat": 69.65,
                "lon": 18.96,
                "localtime": "2026-12-19 12:00"
            },
            "current": {
                "temp_c": -4.0,
                "temp_f": 24.8,
                "condition": { "text": "Light snow", "code": 1213 }
            },
            "forecast": {
                "forecastday": [{
                    "date": "2026-12-19",
                    "day": {
                        "maxtemp_c": -2.0,
                        "mintemp_c": -7.0,
                        "maxtemp_f": 28.4,
                        "mintemp_f": 19.4,
                        "condition": { "text": "Light snow", "code": 1213 }
                    },
                    "astro": { "sunrise": sunrise, "sunset": sunset }
                }]
            },
            "alerts": {
                "alert": [{ "event": "Snow", "severity": "Moderate", "headline": "Snow showers" }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_polar_night_report_still_prints() {
        let report = report_with_astro("No sunrise", "No sunset");
        assert!(solar_window(&report).is_err());

        let location = LocationResolver::resolve_query("Tromso");
        let result = print_report(
            &report,
            &location,
            TemperatureUnit::Celsius,
            ProgressCurve::Arc,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_regular_astro_gives_window() {
        let report = report_with_astro("09:45 AM", "01:30 PM");
        let window = solar_window(&report).unwrap().unwrap();
        assert_eq!(window.sunrise(), 585);
        assert_eq!(window.sunset(), 810);
    }

    #[test]
    fn test_location_time_parses_single_digit_hour() {
        let mut report = report_with_astro("09:45 AM", "01:30 PM");
        report.location.localtime = "2026-12-19 9:05".to_string();
        let time = location_time(&report).unwrap().time();
        assert_eq!(time, NaiveTime::from_hms_opt(9, 5, 0).unwrap());
    }
}
