//! Lane tuning and session settings
//!
//! Loaded from a JSON file next to the binary. Every field has a default, so
//! a partial file only overrides what it names.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Gutter assist tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GutterTuning {
    /// Forward speed floor while in the gutter (units/s)
    pub min_forward_speed: f32,
    /// Height above the gutter centerline the ball is held at
    pub lift: f32,
    /// Centering rate (lerp factor per second)
    pub centering_rate: f32,
    /// Forward push: velocity change on entry, acceleration while inside
    pub push: f32,
}

impl Default for GutterTuning {
    fn default() -> Self {
        Self {
            min_forward_speed: GUTTER_MIN_SPEED,
            lift: GUTTER_LIFT,
            centering_rate: GUTTER_CENTERING_RATE,
            push: GUTTER_PUSH,
        }
    }
}

/// Lane settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneSettings {
    // === Ball ===
    /// Launch impulse magnitude
    pub launch_force: f32,
    /// Indicator height above the ball while in the gutter
    pub indicator_lift: f32,

    // === Gutter ===
    pub gutter: GutterTuning,

    // === Pins ===
    /// Where the pin-set is spawned
    pub pin_anchor: Vec3,
    /// Pin offsets from the pin-set root
    pub pin_layout: Vec<Vec3>,

    // === Simulation ===
    /// Fixed simulation timestep (seconds)
    pub fixed_dt: f32,

    // === Demo session ===
    /// RNG seed for aim jitter
    pub seed: u64,
    /// Rolls to play
    pub rolls: u32,
    /// Max camera yaw jitter per roll (radians)
    pub aim_jitter: f32,
    /// A roll is reset after this long even if the ball is still moving
    pub max_roll_seconds: f32,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            launch_force: LAUNCH_FORCE,
            indicator_lift: INDICATOR_LIFT,

            gutter: GutterTuning::default(),

            pin_anchor: Vec3::new(0.0, 0.0, 18.0),
            pin_layout: triangle_layout(4, 0.3),

            fixed_dt: SIM_DT,

            seed: 0x5eed,
            rolls: 10,
            aim_jitter: 0.05,
            max_roll_seconds: 4.0,
        }
    }
}

/// Classic pin triangle: row `r` holds `r + 1` pins, head pin first
pub fn triangle_layout(rows: u32, spacing: f32) -> Vec<Vec3> {
    let row_depth = spacing * 0.866;
    let mut pins = Vec::new();
    for row in 0..rows {
        for i in 0..=row {
            let x = (i as f32 - row as f32 / 2.0) * spacing;
            pins.push(Vec3::new(x, 0.0, row as f32 * row_depth));
        }
    }
    pins
}

impl LaneSettings {
    /// Default settings file name
    pub const DEFAULT_PATH: &'static str = "bowling_lane.json";

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings: LaneSettings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings.sanitized())
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Clamp values that would break the lane into range
    pub fn sanitized(mut self) -> Self {
        self.launch_force = self.launch_force.max(0.0);
        self.gutter.min_forward_speed = self.gutter.min_forward_speed.max(0.0);
        self.gutter.centering_rate = self.gutter.centering_rate.max(0.0);
        if self.fixed_dt.is_nan() || self.fixed_dt <= 0.0 {
            self.fixed_dt = SIM_DT;
        }
        self.max_roll_seconds = self.max_roll_seconds.max(self.fixed_dt);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let s = LaneSettings::default();
        assert_eq!(s.launch_force, 12.0);
        assert_eq!(s.gutter.min_forward_speed, 5.0);
        assert_eq!(s.gutter.lift, 0.1);
        assert_eq!(s.gutter.centering_rate, 10.0);
        assert_eq!(s.pin_layout.len(), 10);
    }

    #[test]
    fn test_triangle_layout_head_pin_first() {
        let pins = triangle_layout(3, 0.3);
        assert_eq!(pins.len(), 6);
        assert_eq!(pins[0], Vec3::ZERO);
        // Second row straddles the head pin
        assert!((pins[1].x + 0.15).abs() < 1e-6);
        assert!((pins[2].x - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "launch_force": 20.0, "gutter": { "push": 2.0 } }"#;
        let s: LaneSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.launch_force, 20.0);
        assert_eq!(s.gutter.push, 2.0);
        assert_eq!(s.gutter.min_forward_speed, GUTTER_MIN_SPEED);
        assert_eq!(s.pin_layout.len(), 10);
    }

    #[test]
    fn test_sanitized_fixes_bad_timestep() {
        let s = LaneSettings {
            fixed_dt: 0.0,
            launch_force: -3.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.fixed_dt, SIM_DT);
        assert_eq!(s.launch_force, 0.0);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("bowling_lane_{}.json", std::process::id()));
        let s = LaneSettings {
            rolls: 3,
            ..Default::default()
        };
        s.save(&path).unwrap();
        let loaded = LaneSettings::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, s);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let s = LaneSettings::load_or_default("/nonexistent/bowling_lane.json");
        assert_eq!(s, LaneSettings::default());
        assert!(matches!(
            LaneSettings::load("/nonexistent/bowling_lane.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
