//! Scene and server configuration.
//!
//! Everything has a default so the server runs without a config file; a JSON
//! scene file only needs the keys it wants to override.

use crate::navigation::NavSettings;
use crate::physics::Vector3;
use crate::utils::fragment_landmark_name;
use crate::weather::RealTimeSettings;
use log::warn;
use serde::{Deserialize, Serialize};
use shared::{DEFAULT_FRAGMENT_COUNT, DEFAULT_PORT};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A player avatar prefab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarTemplate {
    pub name: String,
    /// The prefab ships with a name label child that must be purged on spawn.
    #[serde(default)]
    pub baked_label: bool,
}

impl AvatarTemplate {
    pub fn new(name: &str) -> Self {
        AvatarTemplate {
            name: name.to_string(),
            baked_label: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tick_rate: u32,
    pub fragment_count: usize,
    pub avatar_templates: Vec<AvatarTemplate>,
    pub spawn_point: Vector3,
    pub name_tag_offset: f32,
    pub navigation: NavSettings,
    /// Manual joystick speed in units per second.
    pub move_speed: f32,
    pub npc_landmark: String,
    /// Explicit fragment spots by 0-based index. Missing ones fall back to landmarks.
    pub fragment_locations: BTreeMap<usize, Vector3>,
    pub landmarks: BTreeMap<String, Vector3>,
    pub walkable_min: Vector3,
    pub walkable_max: Vector3,
    pub auto_weather_interval_secs: f32,
    pub realtime_weather: RealTimeSettings,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut landmarks = BTreeMap::new();
        landmarks.insert("NPC".to_string(), Vector3::new(0.0, 0.0, 25.0));
        for index in 0..DEFAULT_FRAGMENT_COUNT {
            let angle = index as f32 / DEFAULT_FRAGMENT_COUNT as f32 * std::f32::consts::TAU;
            landmarks.insert(
                fragment_landmark_name(index),
                Vector3::new(angle.sin() * 60.0, 0.0, angle.cos() * 60.0),
            );
        }

        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tick_rate: 30,
            fragment_count: DEFAULT_FRAGMENT_COUNT,
            avatar_templates: vec![
                AvatarTemplate {
                    name: "Explorer".to_string(),
                    baked_label: true,
                },
                AvatarTemplate::new("Scholar"),
                AvatarTemplate::new("Curator"),
            ],
            spawn_point: Vector3::ZERO,
            name_tag_offset: 2.0,
            navigation: NavSettings::default(),
            move_speed: 4.0,
            npc_landmark: "NPC".to_string(),
            fragment_locations: BTreeMap::new(),
            landmarks,
            walkable_min: Vector3::new(-100.0, 0.0, -100.0),
            walkable_max: Vector3::new(100.0, 0.0, 100.0),
            auto_weather_interval_secs: 30.0,
            realtime_weather: RealTimeSettings::default(),
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if self.fragment_count == 0 {
            return Err(ConfigError::Invalid("fragment_count must be positive".into()));
        }
        if !(self.navigation.speed > 0.0) {
            return Err(ConfigError::Invalid("navigation.speed must be positive".into()));
        }
        if !(self.auto_weather_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "auto_weather_interval_secs must be positive".into(),
            ));
        }
        if !(self.realtime_weather.refresh_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "realtime_weather.refresh_secs must be positive".into(),
            ));
        }
        if !(-12..=14).contains(&self.realtime_weather.utc_offset_hours) {
            return Err(ConfigError::Invalid(
                "realtime_weather.utc_offset_hours must be between -12 and 14".into(),
            ));
        }
        if let Some(index) = self
            .fragment_locations
            .keys()
            .find(|index| **index >= self.fragment_count)
        {
            return Err(ConfigError::Invalid(format!(
                "fragment location {} is out of range for {} fragments",
                index, self.fragment_count
            )));
        }
        if self.avatar_templates.is_empty() {
            warn!("No avatar templates configured, every connection will be refused a player");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:8888");
        assert_eq!(config.fragment_count, 9);
        assert_eq!(config.navigation.stopping_distance, 15.0);
        assert!(config.landmarks.contains_key("NPC"));
        assert!(config.landmarks.contains_key("09"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServerConfig::from_json(
            r#"{"port": 9000, "navigation": {"speed": 3.5}, "fragment_locations": {"2": {"x": 1.0, "y": 0.0, "z": 2.0}}}"#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.navigation.speed, 3.5);
        assert_eq!(config.navigation.acceleration, 20.0);
        assert_eq!(
            config.fragment_locations.get(&2),
            Some(&Vector3::new(1.0, 0.0, 2.0))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            ServerConfig::from_json(r#"{"tick_rate": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServerConfig::from_json(r#"{"fragment_locations": {"12": {"x": 0.0, "y": 0.0, "z": 0.0}}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServerConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_switches_from_file() {
        let config = ServerConfig::from_json(
            r#"{"navigation": {"enabled": false}, "realtime_weather": {"enabled": true, "utc_offset_hours": -5}}"#,
        )
        .unwrap();

        assert!(!config.navigation.enabled);
        assert!(config.realtime_weather.enabled);
        assert_eq!(config.realtime_weather.utc_offset_hours, -5);
        assert_eq!(config.realtime_weather.weather, "Clear");
        assert!(ServerConfig::default().navigation.enabled);

        assert!(matches!(
            ServerConfig::from_json(r#"{"realtime_weather": {"utc_offset_hours": 20}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ServerConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
