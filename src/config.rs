use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detect::DetectionConfig;
use crate::error::MapError;
use crate::hit::{Tolerances, PLATFORM_TOLERANCE, PORTAL_TOLERANCE, SPAWN_TOLERANCE};

/// Editor settings. Every field is optional in the JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub window_size: [f32; 2],
    pub sidebar_width: f32,
    /// Canvas refresh period while idle.
    pub refresh_interval_ms: u64,
    pub zoom_step: f32,
    pub platform_tolerance: i32,
    pub portal_tolerance: f32,
    pub spawn_tolerance: f32,
    /// Drags covering this many pixels or fewer do not create a platform.
    pub min_drag_length: i32,
    pub detection: DetectionConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            window_size: [1200.0, 800.0],
            sidebar_width: 250.0,
            refresh_interval_ms: 33,
            zoom_step: 0.2,
            platform_tolerance: PLATFORM_TOLERANCE,
            portal_tolerance: PORTAL_TOLERANCE,
            spawn_tolerance: SPAWN_TOLERANCE,
            min_drag_length: 3,
            detection: DetectionConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let data = std::fs::read(path).map_err(|e| MapError::io(path, e))?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            platform: self.platform_tolerance,
            portal: self.portal_tolerance,
            spawn: self.spawn_tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"zoom_step": 0.5, "detection": {"threshold": 200}}"#).unwrap();
        assert_eq!(config.zoom_step, 0.5);
        assert_eq!(config.detection.threshold, 200);
        assert_eq!(config.detection.min_length, 15);
        assert_eq!(config.refresh_interval_ms, 33);
        assert_eq!(config.tolerances(), Tolerances::default());
    }
}
