//! Day/night progress engine.
//!
//! Turns the day's sunrise/sunset strings (`"06:30 AM"`) plus the wall clock
//! into a time-of-day bucket, a decorative 0–100 arc position and a countdown
//! to the next solar event. Everything here is a pure function of
//! `(sunrise, sunset, now)`; [`DayNightTicker`] only re-evaluates it on a timer.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use skycast_core::error::WeatherError;
use skycast_core::{AppError, ProgressCurve};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const MINUTES_PER_DAY: u16 = 1440;

const DAWN_MINUTES: i32 = 30;
const DUSK_MINUTES: i32 = 30;
const MORNING_MINUTES: i32 = 120;
const EVENING_MINUTES: i32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockParseError {
    #[error("empty time string")]
    Empty,
    #[error("missing AM/PM marker in {0:?}")]
    MissingMeridiem(String),
    #[error("missing ':' between hours and minutes in {0:?}")]
    MissingColon(String),
    #[error("hour must be 1-12 in {0:?}")]
    InvalidHour(String),
    #[error("minute must be 00-59 in {0:?}")]
    InvalidMinute(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DayNightError {
    #[error("invalid {field} time: {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: ClockParseError,
    },
    #[error("sunrise ({sunrise} min) must be before sunset ({sunset} min)")]
    InvalidWindow { sunrise: u16, sunset: u16 },
    #[error("minute of day out of range: {0}")]
    OutOfRange(u16),
}

impl From<DayNightError> for AppError {
    fn from(err: DayNightError) -> Self {
        AppError::Weather(WeatherError::InvalidTime(err.to_string()))
    }
}

/// Parse `"hh:mm AM"` / `"hh:mm PM"` into minutes since midnight.
///
/// `12 AM` is midnight and `12 PM` is noon. The marker is case-insensitive and
/// the space before it is optional.
pub fn parse_clock_time(input: &str) -> Result<u16, ClockParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClockParseError::Empty);
    }

    let split = trimmed.len().saturating_sub(2);
    if split == 0 || !trimmed.is_char_boundary(split) {
        return Err(ClockParseError::MissingMeridiem(trimmed.to_string()));
    }
    let (clock, marker) = trimmed.split_at(split);
    let is_pm = match marker.to_ascii_uppercase().as_str() {
        "AM" => false,
        "PM" => true,
        _ => return Err(ClockParseError::MissingMeridiem(trimmed.to_string())),
    };

    let clock = clock.strip_suffix(' ').unwrap_or(clock);
    let (hours, minutes) = clock
        .split_once(':')
        .ok_or_else(|| ClockParseError::MissingColon(trimmed.to_string()))?;

    let hour = parse_digits(hours, 1..=2)
        .filter(|h| (1..=12).contains(h))
        .ok_or_else(|| ClockParseError::InvalidHour(trimmed.to_string()))?;
    let minute = parse_digits(minutes, 2..=2)
        .filter(|m| *m < 60)
        .ok_or_else(|| ClockParseError::InvalidMinute(trimmed.to_string()))?;

    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    Ok(hour24 * 60 + minute)
}

fn parse_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> Option<u16> {
    if !len.contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Minutes since midnight for a wall-clock time.
pub fn minute_of_day(time: NaiveTime) -> u16 {
    // hour() < 24 and minute() < 60, so this always fits
    (time.hour() * 60 + time.minute()) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Day,
    Evening,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dawn => "Dawn",
            Self::Morning => "Morning",
            Self::Day => "Day",
            Self::Evening => "Evening",
            Self::Dusk => "Dusk",
            Self::Night => "Night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolarEvent {
    Sunrise,
    Sunset,
}

impl SolarEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sunrise => "Sunrise",
            Self::Sunset => "Sunset",
        }
    }
}

/// Derived sky state for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayNightState {
    pub progress_percent: f64,
    pub bucket: TimeOfDay,
    pub minutes_until_next_event: u32,
    pub next_event: SolarEvent,
}

impl DayNightState {
    /// `"Sunrise in 6h 40m"`
    pub fn countdown_label(&self) -> String {
        format!(
            "{} in {}h {}m",
            self.next_event.label(),
            self.minutes_until_next_event / 60,
            self.minutes_until_next_event % 60
        )
    }
}

/// A validated sunrise/sunset pair in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolarWindow {
    sunrise: u16,
    sunset: u16,
}

impl SolarWindow {
    pub fn new(sunrise: u16, sunset: u16) -> Result<Self, DayNightError> {
        if sunset >= MINUTES_PER_DAY {
            return Err(DayNightError::OutOfRange(sunset));
        }
        if sunrise >= sunset {
            return Err(DayNightError::InvalidWindow { sunrise, sunset });
        }
        Ok(Self { sunrise, sunset })
    }

    /// Build from the provider's astro strings.
    pub fn parse(sunrise: &str, sunset: &str) -> Result<Self, DayNightError> {
        let sunrise = parse_clock_time(sunrise).map_err(|source| DayNightError::Parse {
            field: "sunrise",
            source,
        })?;
        let sunset = parse_clock_time(sunset).map_err(|source| DayNightError::Parse {
            field: "sunset",
            source,
        })?;
        Self::new(sunrise, sunset)
    }

    pub fn sunrise(&self) -> u16 {
        self.sunrise
    }

    pub fn sunset(&self) -> u16 {
        self.sunset
    }

    pub fn day_length(&self) -> u16 {
        self.sunset - self.sunrise
    }

    pub fn night_length(&self) -> u16 {
        MINUTES_PER_DAY - self.day_length()
    }

    /// Time-of-day bucket. Ranges are checked in order, so on very short days
    /// the earlier bucket wins.
    pub fn bucket(&self, now: u16) -> TimeOfDay {
        let now = i32::from(now);
        let sunrise = i32::from(self.sunrise);
        let sunset = i32::from(self.sunset);

        if (sunrise - DAWN_MINUTES..sunrise).contains(&now) {
            TimeOfDay::Dawn
        } else if (sunrise..sunrise + MORNING_MINUTES).contains(&now) {
            TimeOfDay::Morning
        } else if (sunrise + MORNING_MINUTES..sunset - EVENING_MINUTES).contains(&now) {
            TimeOfDay::Day
        } else if (sunset - EVENING_MINUTES..sunset).contains(&now) {
            TimeOfDay::Evening
        } else if (sunset..sunset + DUSK_MINUTES).contains(&now) {
            TimeOfDay::Dusk
        } else {
            TimeOfDay::Night
        }
    }

    /// Marker position on the decorative arc, 0–100.
    pub fn progress(&self, now: u16, curve: ProgressCurve) -> f64 {
        let n = f64::from(now);
        match curve {
            ProgressCurve::Linear => n / f64::from(MINUTES_PER_DAY) * 100.0,
            ProgressCurve::Arc => {
                let sunrise = f64::from(self.sunrise);
                let sunset = f64::from(self.sunset);
                let half_night = f64::from(self.night_length()) / 2.0;

                if now >= self.sunrise && now < self.sunset {
                    (n - sunrise) / f64::from(self.day_length()) * 50.0 + 25.0
                } else if now >= self.sunset {
                    ((n - sunset) / half_night * 25.0 + 75.0).min(100.0)
                } else {
                    n / half_night * 25.0
                }
            }
        }
    }

    /// Next sunrise or sunset and the minutes until it.
    pub fn next_event(&self, now: u16) -> (SolarEvent, u32) {
        let now = u32::from(now);
        let sunrise = u32::from(self.sunrise);
        let sunset = u32::from(self.sunset);

        if now < sunrise {
            (SolarEvent::Sunrise, sunrise - now)
        } else if now < sunset {
            (SolarEvent::Sunset, sunset - now)
        } else {
            (
                SolarEvent::Sunrise,
                sunrise + u32::from(MINUTES_PER_DAY) - now,
            )
        }
    }

    pub fn state_at_minute(
        &self,
        now: u16,
        curve: ProgressCurve,
    ) -> Result<DayNightState, DayNightError> {
        if now >= MINUTES_PER_DAY {
            return Err(DayNightError::OutOfRange(now));
        }
        let (next_event, minutes_until_next_event) = self.next_event(now);
        Ok(DayNightState {
            progress_percent: self.progress(now, curve),
            bucket: self.bucket(now),
            minutes_until_next_event,
            next_event,
        })
    }

    pub fn state_at(&self, time: NaiveTime, curve: ProgressCurve) -> DayNightState {
        let now = minute_of_day(time);
        let (next_event, minutes_until_next_event) = self.next_event(now);
        DayNightState {
            progress_percent: self.progress(now, curve),
            bucket: self.bucket(now),
            minutes_until_next_event,
            next_event,
        }
    }
}

/// Re-evaluates a [`SolarWindow`] every tick and publishes the result.
///
/// Each ticker owns its own timer. Dropping the ticker or cancelling its token
/// stops the task.
pub struct DayNightTicker {
    rx: watch::Receiver<DayNightState>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DayNightTicker {
    /// One-second ticker driven by `clock`.
    pub fn spawn<C>(window: SolarWindow, curve: ProgressCurve, clock: C) -> Self
    where
        C: Fn() -> NaiveTime + Send + 'static,
    {
        Self::spawn_with(
            window,
            curve,
            clock,
            Duration::from_secs(1),
            CancellationToken::new(),
        )
    }

    pub fn spawn_with<C>(
        window: SolarWindow,
        curve: ProgressCurve,
        clock: C,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self
    where
        C: Fn() -> NaiveTime + Send + 'static,
    {
        let (tx, rx) = watch::channel(window.state_at(clock(), curve));
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let state = window.state_at(clock(), curve);
                        tx.send_if_modified(|current| {
                            if *current == state {
                                false
                            } else {
                                *current = state;
                                true
                            }
                        });
                    }
                }
            }
            tracing::debug!("Day/night ticker stopped");
        });

        Self { rx, cancel, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<DayNightState> {
        self.rx.clone()
    }

    pub fn current(&self) -> DayNightState {
        *self.rx.borrow()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DayNightTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
