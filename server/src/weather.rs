//! Time of day and weather of the shared scene.

use chrono::{FixedOffset, Timelike, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::ServerMessage;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown environment label {0:?}")]
pub struct UnknownLabel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Day,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Day, TimeOfDay::Dusk, TimeOfDay::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Day => "Day",
            TimeOfDay::Dusk => "Dusk",
            TimeOfDay::Night => "Night",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::ALL
            .into_iter()
            .find(|time| time.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 4] = [
        WeatherKind::Clear,
        WeatherKind::Cloudy,
        WeatherKind::Rain,
        WeatherKind::Snow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Clear => "Clear",
            WeatherKind::Cloudy => "Cloudy",
            WeatherKind::Rain => "Rain",
            WeatherKind::Snow => "Snow",
        }
    }
}

impl FromStr for WeatherKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeatherKind::ALL
            .into_iter()
            .find(|weather| weather.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentMode {
    Manual,
    Auto,
    /// Follows the museum's local clock.
    RealTime,
}

impl EnvironmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentMode::Manual => "manual",
            EnvironmentMode::Auto => "auto",
            EnvironmentMode::RealTime => "realtime",
        }
    }
}

/// Real-time mode: time of day comes from the wall clock at the museum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealTimeSettings {
    /// Start the scene in real-time mode.
    pub enabled: bool,
    pub utc_offset_hours: i32,
    /// Weather label shown while following the clock. No live feed is queried.
    pub weather: String,
    pub refresh_secs: f32,
}

impl Default for RealTimeSettings {
    fn default() -> Self {
        RealTimeSettings {
            enabled: false,
            utc_offset_hours: 8,
            weather: WeatherKind::Clear.to_string(),
            refresh_secs: 600.0,
        }
    }
}

/// Day from 06:00 to 17:00, dusk for the following hour, night otherwise.
pub fn time_of_day_for_hour(hour: u32) -> TimeOfDay {
    match hour {
        6..=16 => TimeOfDay::Day,
        17 => TimeOfDay::Dusk,
        _ => TimeOfDay::Night,
    }
}

/// Current hour at the given UTC offset. Out-of-range offsets read UTC.
pub fn local_hour(utc_offset_hours: i32) -> u32 {
    let now = Utc::now();
    match FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600)) {
        Some(offset) => now.with_timezone(&offset).hour(),
        None => {
            warn!("UTC offset {}h is out of range, using UTC", utc_offset_hours);
            now.hour()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    time: TimeOfDay,
    weather: WeatherKind,
    mode: EnvironmentMode,
    interval_secs: f32,
    elapsed: f32,
    realtime: RealTimeSettings,
}

impl Environment {
    pub fn new(interval_secs: f32) -> Self {
        Environment {
            time: TimeOfDay::Day,
            weather: WeatherKind::Clear,
            mode: EnvironmentMode::Manual,
            interval_secs,
            elapsed: 0.0,
            realtime: RealTimeSettings::default(),
        }
    }

    /// Uses `settings` for real-time mode and enters it if `settings.enabled`.
    pub fn with_realtime(mut self, settings: RealTimeSettings) -> Self {
        let enabled = settings.enabled;
        self.realtime = settings;
        if enabled {
            self.enable_realtime(true);
        }
        self
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn weather(&self) -> WeatherKind {
        self.weather
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    /// Applies a preset picked on a phone and leaves auto mode.
    ///
    /// Unknown labels fall back to Day / Clear. Returns false if any label
    /// had to be replaced.
    pub fn set_from_mobile(&mut self, time: &str, weather: &str) -> bool {
        let parsed_time = time.parse::<TimeOfDay>();
        let parsed_weather = weather.parse::<WeatherKind>();
        let valid = parsed_time.is_ok() && parsed_weather.is_ok();

        self.time = parsed_time.unwrap_or_else(|err| {
            warn!("{}, falling back to {}", err, TimeOfDay::Day);
            TimeOfDay::Day
        });
        self.weather = parsed_weather.unwrap_or_else(|err| {
            warn!("{}, falling back to {}", err, WeatherKind::Clear);
            WeatherKind::Clear
        });
        self.mode = EnvironmentMode::Manual;
        self.elapsed = 0.0;

        info!("Environment set to {} / {}", self.time, self.weather);
        valid
    }

    /// Enters or leaves real-time mode. Entering syncs with the clock at once.
    /// Returns true when the preset changed.
    pub fn enable_realtime(&mut self, on: bool) -> bool {
        self.elapsed = 0.0;
        if !on {
            if self.mode == EnvironmentMode::RealTime {
                self.mode = EnvironmentMode::Manual;
                info!("Environment mode set to {}", self.mode.as_str());
            }
            return false;
        }

        self.mode = EnvironmentMode::RealTime;
        info!(
            "Environment mode set to {} (UTC{:+})",
            self.mode.as_str(),
            self.realtime.utc_offset_hours
        );
        self.apply_clock_hour(local_hour(self.realtime.utc_offset_hours))
    }

    /// Maps a local hour onto the preset. Returns true when the preset changed.
    pub fn apply_clock_hour(&mut self, hour: u32) -> bool {
        let time = time_of_day_for_hour(hour);
        let weather = self.realtime.weather.parse::<WeatherKind>().unwrap_or_else(|err| {
            warn!("{}, falling back to {}", err, WeatherKind::Clear);
            WeatherKind::Clear
        });

        let changed = time != self.time || weather != self.weather;
        self.time = time;
        self.weather = weather;
        if changed {
            info!("Real-time environment is now {} / {}", self.time, self.weather);
        }
        changed
    }

    pub fn enable_auto(&mut self, auto: bool) {
        self.mode = if auto {
            EnvironmentMode::Auto
        } else {
            EnvironmentMode::Manual
        };
        self.elapsed = 0.0;
        info!("Environment mode set to {}", self.mode.as_str());
    }

    /// Advances the auto cycle. Returns true when the preset changed.
    pub fn tick(&mut self, dt: f32) -> bool {
        match self.mode {
            EnvironmentMode::Manual => false,
            EnvironmentMode::Auto => {
                self.elapsed += dt;
                if self.elapsed < self.interval_secs {
                    return false;
                }
                self.elapsed -= self.interval_secs;
                self.advance();
                true
            }
            EnvironmentMode::RealTime => {
                self.elapsed += dt;
                if self.elapsed < self.realtime.refresh_secs {
                    return false;
                }
                self.elapsed -= self.realtime.refresh_secs;
                self.apply_clock_hour(local_hour(self.realtime.utc_offset_hours))
            }
        }
    }

    fn advance(&mut self) {
        let weather_count = WeatherKind::ALL.len();
        let time_index = TimeOfDay::ALL.iter().position(|t| *t == self.time).unwrap_or(0);
        let weather_index = WeatherKind::ALL
            .iter()
            .position(|w| *w == self.weather)
            .unwrap_or(0);

        let next = (time_index * weather_count + weather_index + 1)
            % (TimeOfDay::ALL.len() * weather_count);
        self.time = TimeOfDay::ALL[next / weather_count];
        self.weather = WeatherKind::ALL[next % weather_count];
        info!("Auto environment advanced to {} / {}", self.time, self.weather);
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Environment {
            time: self.time.to_string(),
            weather: self.weather.to_string(),
            mode: self.mode.as_str().to_string(),
        }
    }
}
