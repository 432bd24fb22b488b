//! Tunables for the choreography engine. Every group deserializes with
//! defaults so a JSON override file only needs the fields it changes.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tree: TreeShape,
    pub counts: PoolCounts,
    pub motion: MotionConfig,
    pub gesture: GestureConfig,
    pub touch: TouchConfig,
    pub camera: CameraConfig,
}

impl EngineConfig {
    /// Load a (possibly partial) JSON document layered over the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gesture = &self.gesture;
        if gesture.pinch_end_level >= gesture.pinch_start_level {
            return Err(ConfigError::Invalid(format!(
                "pinch_end_level ({}) must be below pinch_start_level ({})",
                gesture.pinch_end_level, gesture.pinch_start_level
            )));
        }
        if gesture.pinch_closed_distance >= gesture.pinch_open_distance {
            return Err(ConfigError::Invalid(format!(
                "pinch_closed_distance ({}) must be below pinch_open_distance ({})",
                gesture.pinch_closed_distance, gesture.pinch_open_distance
            )));
        }
        if gesture.stable_frames == 0 {
            return Err(ConfigError::Invalid(
                "stable_frames must be at least 1".to_string(),
            ));
        }
        for (name, weight) in [
            ("scale_smoothing", gesture.scale_smoothing),
            ("pointer_smoothing", gesture.pointer_smoothing),
        ] {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1] (got {weight})"
                )));
            }
        }

        let motion = &self.motion;
        for (name, rate) in [
            ("foliage_rate", motion.foliage_rate),
            ("ornament_formed_rate", motion.ornament_formed_rate),
            ("ornament_chaos_rate", motion.ornament_chaos_rate),
            ("element_rate", motion.element_rate),
            ("light_rate", motion.light_rate),
            ("star_scale_rate", motion.star_scale_rate),
            ("focus_rate", motion.focus_rate),
            ("focus_scale_rate", motion.focus_scale_rate),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive (got {rate})"
                )));
            }
        }
        if motion.max_scale_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "max_scale_multiplier must be >= 1 (got {})",
                motion.max_scale_multiplier
            )));
        }

        if self.touch.min_scale > self.touch.max_scale {
            return Err(ConfigError::Invalid(format!(
                "touch min_scale ({}) exceeds max_scale ({})",
                self.touch.min_scale, self.touch.max_scale
            )));
        }
        if self.tree.height <= 0.0 || self.tree.radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "tree height and radius must be positive".to_string(),
            ));
        }
        if self.camera.min_distance > self.camera.max_distance {
            return Err(ConfigError::Invalid(format!(
                "camera min_distance ({}) exceeds max_distance ({})",
                self.camera.min_distance, self.camera.max_distance
            )));
        }
        Ok(())
    }
}

/// Cone the FORMED arrangement fills, plus where the pool sits in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeShape {
    pub height: f32,
    pub radius: f32,
    /// World-space origin of the pool's local frame.
    pub origin: [f32; 3],
    /// Number of photo slots ornaments cycle through (slot 0 is the top photo).
    pub photo_slots: u32,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            height: 22.0,
            radius: 9.0,
            origin: [0.0, -6.0, 0.0],
            photo_slots: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCounts {
    pub foliage: usize,
    pub ornaments: usize,
    pub elements: usize,
    pub lights: usize,
    pub top_star: bool,
}

impl Default for PoolCounts {
    fn default() -> Self {
        Self {
            foliage: 15_000,
            ornaments: 300,
            elements: 200,
            lights: 400,
            top_star: true,
        }
    }
}

/// Damping rates (1/s) and focus tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub foliage_rate: f32,
    /// Multiplied by the ornament's weight.
    pub ornament_formed_rate: f32,
    pub ornament_chaos_rate: f32,
    pub element_rate: f32,
    pub light_rate: f32,
    pub star_scale_rate: f32,
    pub star_spin: f32,
    pub focus_rate: f32,
    pub focus_scale_rate: f32,
    pub focus_distance: f32,
    pub max_scale_multiplier: f32,
    pub wobble_amplitude: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            foliage_rate: 1.5,
            ornament_formed_rate: 0.8,
            ornament_chaos_rate: 0.5,
            element_rate: 1.5,
            light_rate: 2.0,
            star_scale_rate: 3.0,
            star_spin: 0.5,
            focus_rate: 2.5,
            focus_scale_rate: 2.0,
            focus_distance: 25.0,
            max_scale_multiplier: 6.0,
            wobble_amplitude: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Classifications scoring at or below this are ignored.
    pub confidence_floor: f32,
    pub stable_frames: u32,
    pub pinch_open_distance: f32,
    pub pinch_closed_distance: f32,
    pub pinch_start_level: f32,
    pub pinch_end_level: f32,
    pub pinch_cooldown_ms: f64,
    pub index_extension_floor: f32,
    pub scale_smoothing: f32,
    pub pointer_smoothing: f32,
    pub rotation_gain: f32,
    pub rotation_noise_floor: f32,
    /// Publish per-frame detection details as the status text.
    pub debug: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.4,
            stable_frames: 6,
            pinch_open_distance: 0.12,
            pinch_closed_distance: 0.02,
            pinch_start_level: 0.85,
            pinch_end_level: 0.80,
            pinch_cooldown_ms: 1500.0,
            index_extension_floor: 0.08,
            scale_smoothing: 0.25,
            pointer_smoothing: 0.3,
            rotation_gain: 0.15,
            rotation_noise_floor: 0.01,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub initial_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            initial_scale: 2.5,
            min_scale: 1.0,
            max_scale: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Upper bound on the polar angle measured from +Y, in radians.
    pub max_polar_angle: f32,
    /// OrbitControls-style speed; 1.0 is one revolution per minute.
    pub auto_rotate_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 8.0, 60.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            aspect: 16.0 / 9.0,
            near_clip: 0.1,
            far_clip: 1000.0,
            min_distance: 30.0,
            max_distance: 120.0,
            max_polar_angle: std::f32::consts::PI / 1.7,
            auto_rotate_speed: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        EngineConfig::default()
            .validate()
            .expect("default config is valid");
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{ "counts": {{ "foliage": 10 }}, "gesture": {{ "stable_frames": 3 }} }}"#
        )
        .expect("write config");

        let config = EngineConfig::from_json_file(file.path()).expect("config loads");
        assert_eq!(config.counts.foliage, 10);
        assert_eq!(config.counts.ornaments, 300);
        assert_eq!(config.gesture.stable_frames, 3);
        assert_eq!(config.gesture.pinch_start_level, 0.85);
    }

    #[test]
    fn inverted_hysteresis_is_rejected() {
        let mut config = EngineConfig::default();
        config.gesture.pinch_end_level = 0.9;
        let err = config.validate().expect_err("end above start must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let mut config = EngineConfig::default();
        config.motion.light_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_json_file(Path::new("/nonexistent/tree.json"))
            .expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/tree.json"));
    }
}
