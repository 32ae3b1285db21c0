// src/config.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub fov_degrees: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Frames a bounding-box surface may wait for its camera image.
    pub pending_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
    /// Save a display snapshot every N frames. 0 disables saving.
    pub save_every: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig {
                width: 1280,
                height: 720,
            },
            camera: CameraConfig { fov_degrees: 90.0 },
            overlay: OverlayConfig {
                pending_capacity: 8,
            },
            output: OutputConfig {
                dir: "output".to_string(),
                save_every: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.display.width, 1280);
        assert_eq!(config.overlay.pending_capacity, 8);
    }

    #[test]
    fn test_load_fails_on_missing_file() {
        assert!(Config::load("does-not-exist.yaml").is_err());
    }
}
