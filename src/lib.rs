//! Bowling Lane - gameplay core for a bowling-style game
//!
//! Core modules:
//! - `sim`: Ball, gutter, fall triggers, launch indicator and the game coordinator
//! - `host`: Engine seams (transforms, bodies, prefabs, text, camera)
//! - `sandbox`: Headless host used by the demo and the tests
//! - `signal`: Observer lists for input and pin notifications
//! - `settings`: Data-driven lane tuning

pub mod error;
pub mod host;
pub mod sandbox;
pub mod settings;
pub mod signal;
pub mod sim;

pub use error::ConfigError;
pub use settings::LaneSettings;

use glam::{Quat, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Impulse magnitude applied on launch
    pub const LAUNCH_FORCE: f32 = 12.0;

    /// Forward speed the gutter never lets the ball drop below (units/s)
    pub const GUTTER_MIN_SPEED: f32 = 5.0;
    /// Vertical lift over the gutter centerline (avoids collider sticking)
    pub const GUTTER_LIFT: f32 = 0.1;
    /// Centering rate; lerp factor is `dt * GUTTER_CENTERING_RATE`
    pub const GUTTER_CENTERING_RATE: f32 = 10.0;
    /// Forward push, as velocity change on entry and acceleration while inside
    pub const GUTTER_PUSH: f32 = 5.0;

    /// Launch indicator height above the ball while in the gutter
    pub const INDICATOR_LIFT: f32 = 0.1;

    /// Score label prefix
    pub const SCORE_PREFIX: &str = "Score: ";
}

/// Project a direction onto the horizontal plane and normalize it.
///
/// Returns `Vec3::ZERO` when nothing is left after dropping the vertical part.
#[inline]
pub fn flatten_direction(dir: Vec3) -> Vec3 {
    Vec3::new(dir.x, 0.0, dir.z).normalize_or_zero()
}

/// Yaw-only rotation that faces the horizontal heading of `forward`.
///
/// `None` when `forward` is (nearly) vertical and has no heading.
#[inline]
pub fn yaw_facing(forward: Vec3) -> Option<Quat> {
    let flat = Vec3::new(forward.x, 0.0, forward.z);
    if flat.length_squared() < 1e-8 {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Format the score label shown on the display surface
#[inline]
pub fn score_label(score: u64) -> String {
    format!("{}{}", consts::SCORE_PREFIX, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_direction_strips_vertical() {
        let dir = flatten_direction(Vec3::new(0.0, -1.0, 1.0));
        assert!((dir - Vec3::Z).length() < 1e-6);

        assert_eq!(flatten_direction(Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn test_yaw_facing() {
        let rot = yaw_facing(Vec3::new(1.0, -0.5, 0.0)).unwrap();
        let fwd = rot * Vec3::Z;
        assert!((fwd - Vec3::X).length() < 1e-5);
        assert!(fwd.y.abs() < 1e-6);

        assert!(yaw_facing(Vec3::NEG_Y).is_none());
    }

    #[test]
    fn test_score_label() {
        assert_eq!(score_label(0), "Score: 0");
        assert_eq!(score_label(17), "Score: 17");
    }
}
