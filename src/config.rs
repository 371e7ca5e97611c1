//! Persistent configuration (TOML via `confy`).
//!
//! Every field has a serde default so older or hand-trimmed files keep loading.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::globe::{GlobeSettings, OrbitSettings};
use crate::map::MapSettings;
use crate::style::ViewStyle;

const APP_NAME: &str = "globe-map";
const CONFIG_NAME: &str = "config";

/// Globe camera and animation tunables
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GlobeConfig {
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f64,

    /// Seconds without input before auto-rotation resumes
    #[serde(default = "default_idle_resume_secs")]
    pub idle_resume_secs: f64,

    #[serde(default = "default_min_distance")]
    pub min_distance: f64,

    #[serde(default = "default_max_distance")]
    pub max_distance: f64,

    /// Rotate-to-location duration
    #[serde(default = "default_animation_ms")]
    pub rotate_duration_ms: u64,
}

/// Map view tunables
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MapConfig {
    /// Zoom level used when centering on a location (2 - 19)
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: f64,

    #[serde(default = "default_animation_ms")]
    pub recenter_duration_ms: u64,
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Style shown at startup
    #[serde(default)]
    pub default_style: ViewStyle,

    /// Directory with Natural Earth GeoJSON coastlines
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Sent with every HTTP request; tile and geocoding services require one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Override GPS latitude (for devices without GPS)
    #[serde(default)]
    pub override_gps_latitude: Option<f64>,

    /// Override GPS longitude (for devices without GPS)
    #[serde(default)]
    pub override_gps_longitude: Option<f64>,

    /// Pause between the end of the globe rotation and showing the map
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Never touch the network
    #[serde(default)]
    pub offline: bool,

    #[serde(default)]
    pub globe: GlobeConfig,

    #[serde(default)]
    pub map: MapConfig,
}

fn default_auto_rotate_speed() -> f64 {
    0.8
}

fn default_idle_resume_secs() -> f64 {
    3.0
}

fn default_min_distance() -> f64 {
    8.0
}

fn default_max_distance() -> f64 {
    30.0
}

fn default_animation_ms() -> u64 {
    1000
}

fn default_focus_zoom() -> f64 {
    12.0
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            auto_rotate_speed: default_auto_rotate_speed(),
            idle_resume_secs: default_idle_resume_secs(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            rotate_duration_ms: default_animation_ms(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            focus_zoom: default_focus_zoom(),
            recenter_duration_ms: default_animation_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_style: ViewStyle::default(),
            data_dir: None,
            user_agent: default_user_agent(),
            override_gps_latitude: None,
            override_gps_longitude: None,
            settle_delay_ms: default_settle_delay_ms(),
            offline: false,
            globe: GlobeConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Fixed device location, only when both halves are set
    pub fn gps_override(&self) -> Option<(f64, f64)> {
        self.override_gps_latitude.zip(self.override_gps_longitude)
    }

    pub fn globe_settings(&self) -> GlobeSettings {
        let g = &self.globe;
        let (min_distance, max_distance) = if g.min_distance <= g.max_distance {
            (g.min_distance, g.max_distance)
        } else {
            log::warn!("globe.min_distance exceeds globe.max_distance; swapping");
            (g.max_distance, g.min_distance)
        };
        GlobeSettings {
            orbit: OrbitSettings {
                min_distance,
                max_distance,
                auto_rotate_speed: g.auto_rotate_speed,
                idle_resume_s: g.idle_resume_secs.max(0.0),
                ..OrbitSettings::default()
            },
            rotate_duration_s: g.rotate_duration_ms as f64 / 1000.0,
        }
    }

    pub fn map_settings(&self) -> MapSettings {
        MapSettings {
            focus_zoom: self
                .map
                .focus_zoom
                .clamp(crate::map::MIN_ZOOM, crate::map::MAX_ZOOM),
            recenter_duration_s: self.map.recenter_duration_ms as f64 / 1000.0,
        }
    }

    pub fn settle_delay_s(&self) -> f64 {
        self.settle_delay_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_behaviour() {
        let config = AppConfig::default();
        assert_eq!(config.default_style, ViewStyle::Satellite);
        assert_eq!(config.settle_delay_s(), 0.5);

        let globe = config.globe_settings();
        assert_eq!(globe.rotate_duration_s, 1.0);
        assert_eq!(globe.orbit.min_distance, 8.0);
        assert_eq!(globe.orbit.max_distance, 30.0);
        assert_eq!(globe.orbit.idle_resume_s, 3.0);

        let map = config.map_settings();
        assert_eq!(map.focus_zoom, 12.0);
        assert_eq!(map.recenter_duration_s, 1.0);
        assert!(config.user_agent.starts_with("globe-map/"));
    }

    #[test]
    fn test_gps_override_needs_both_halves() {
        let mut config = AppConfig {
            override_gps_latitude: Some(10.0),
            ..AppConfig::default()
        };
        assert_eq!(config.gps_override(), None);
        config.override_gps_longitude = Some(20.0);
        assert_eq!(config.gps_override(), Some((10.0, 20.0)));
    }

    #[test]
    fn test_inverted_distances_are_swapped() {
        let mut config = AppConfig::default();
        config.globe.min_distance = 40.0;
        config.globe.max_distance = 10.0;
        let orbit = config.globe_settings().orbit;
        assert_eq!((orbit.min_distance, orbit.max_distance), (10.0, 40.0));
    }

    #[test]
    fn test_focus_zoom_clamped() {
        let mut config = AppConfig::default();
        config.map.focus_zoom = 30.0;
        assert_eq!(config.map_settings().focus_zoom, 19.0);
    }
}
