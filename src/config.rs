//! Engine configuration.
//!
//! Loaded once from `assets/config.ron`; a missing or malformed file logs a
//! warning and falls back to defaults, so the binary always starts. Every
//! section is optional in the file.

use std::path::Path;
use std::sync::OnceLock;

use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    /// Frame clear color, RGBA.
    pub clear_color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Movement per tick while a direction is held.
    pub move_speed: f32,
    /// Radians of camera turn per point of mouse travel.
    pub mouse_sensitivity: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            clear_color: [1.0, 0.0, 1.0, 1.0],
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Garnet".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 1.4,
            near: 0.03,
            far: 300.0,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.3,
            mouse_sensitivity: 0.003,
        }
    }
}

impl Config {
    /// Read a config file, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match ron::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    warn!("config {} is malformed, using defaults: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

/// The process-wide configuration, loaded on first use.
pub fn get() -> &'static Config {
    static CONFIG: OnceLock<Config> = OnceLock::new();
    CONFIG.get_or_init(|| Config::load(Path::new("assets/config.ron")))
}
