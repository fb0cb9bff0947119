//! Gutter assist zone
//!
//! While the ball is inside a gutter it is pulled onto the gutter's
//! centerline and kept rolling forward, so a gutter ball always reaches the
//! end of the lane instead of stalling.

use glam::Vec3;

use super::ball::BallController;
use crate::host::{EntityId, ForceMode, Host, Overlap, OverlapPhase, Tag};
use crate::settings::GutterTuning;

/// One gutter trigger region
#[derive(Debug, Clone)]
pub struct GutterZone {
    sensor: EntityId,
    /// The only ball this gutter reacts to; not owned
    ball: EntityId,
    tuning: GutterTuning,
}

impl GutterZone {
    pub fn new(sensor: EntityId, ball: EntityId, tuning: GutterTuning) -> Self {
        Self {
            sensor,
            ball,
            tuning,
        }
    }

    pub fn sensor(&self) -> EntityId {
        self.sensor
    }

    /// True if this overlap is our ball in our region
    pub fn accepts(&self, overlap: &Overlap) -> bool {
        overlap.sensor == self.sensor && overlap.other_tag == Tag::Ball && overlap.other == self.ball
    }

    /// Route an overlap event. Returns false if it was not for this gutter.
    pub fn handle<H: Host + ?Sized>(
        &self,
        overlap: &Overlap,
        ball: &mut BallController,
        host: &mut H,
        dt: f32,
    ) -> bool {
        if !self.accepts(overlap) || ball.entity() != self.ball {
            return false;
        }
        match overlap.phase {
            OverlapPhase::Enter => self.on_enter(ball, host),
            OverlapPhase::Stay => self.on_stay(ball, host, dt),
            OverlapPhase::Exit => self.on_exit(ball, host),
        }
        true
    }

    /// Centerline point level with the ball
    fn target<H: Host + ?Sized>(&self, host: &H) -> Option<Vec3> {
        let center = host.position(self.sensor)?;
        let ball_pos = host.position(self.ball)?;
        Some(Vec3::new(center.x, center.y + self.tuning.lift, ball_pos.z))
    }

    fn push_direction<H: Host + ?Sized>(&self, host: &H) -> Vec3 {
        host.forward(self.sensor).unwrap_or(Vec3::Z)
    }

    pub fn on_enter<H: Host + ?Sized>(&self, ball: &mut BallController, host: &mut H) {
        ball.set_in_gutter(true, host);
        // A ball still on its anchor belongs to the player
        if !ball.is_launched() {
            return;
        }
        log::debug!("Ball entered gutter {}; centering", self.sensor);

        if let Some(target) = self.target(host) {
            host.set_position(self.ball, target);
        }
        if let Some(v) = host.velocity(self.ball) {
            let forward = v.z.max(self.tuning.min_forward_speed);
            host.set_velocity(self.ball, Vec3::new(0.0, 0.0, forward));
        }
        let push = self.push_direction(host) * self.tuning.push;
        host.add_force(self.ball, push, ForceMode::VelocityChange);
    }

    pub fn on_stay<H: Host + ?Sized>(&self, ball: &BallController, host: &mut H, dt: f32) {
        if !ball.is_launched() {
            return;
        }
        if let (Some(target), Some(pos)) = (self.target(host), host.position(self.ball)) {
            let t = (dt * self.tuning.centering_rate).clamp(0.0, 1.0);
            host.set_position(self.ball, pos.lerp(target, t));
        }
        if let Some(v) = host.velocity(self.ball) {
            let forward = v.z.max(self.tuning.min_forward_speed);
            host.set_velocity(self.ball, Vec3::new(0.0, 0.0, forward));
        }
        let push = self.push_direction(host) * self.tuning.push;
        host.add_force(self.ball, push, ForceMode::Acceleration);
    }

    pub fn on_exit<H: Host + ?Sized>(&self, ball: &mut BallController, host: &mut H) {
        ball.set_in_gutter(false, host);
        log::debug!("Ball left gutter {}", self.sensor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Bodies, Transforms};
    use crate::sandbox::Sandbox;
    use crate::settings::LaneSettings;
    use crate::signal::InputSignals;
    use crate::sim::ball::BallSetup;

    fn rig() -> (Sandbox, BallController, GutterZone) {
        let mut sb = Sandbox::new();
        let anchor = sb.spawn("anchor", Tag::Untagged, Vec3::new(0.0, 0.1, 0.0));
        let ball = sb.spawn("ball", Tag::Ball, Vec3::ZERO);
        sb.add_body(ball, 1.0);
        let indicator = sb.spawn("indicator", Tag::Untagged, Vec3::ZERO);
        let gutter = sb.spawn("gutter", Tag::Gutter, Vec3::new(0.75, 0.0, 9.0));
        sb.add_region(gutter, Vec3::new(0.1, 0.3, 11.0));

        let mut inputs = InputSignals::new();
        let setup = BallSetup {
            ball: Some(ball),
            anchor: Some(anchor),
            indicator: Some(indicator),
        };
        let settings = LaneSettings::default();
        let controller = BallController::new(&setup, &settings, &mut sb, Some(&mut inputs)).unwrap();
        let zone = GutterZone::new(gutter, ball, settings.gutter.clone());
        (sb, controller, zone)
    }

    fn overlap(zone: &GutterZone, other: EntityId, other_tag: Tag, phase: OverlapPhase) -> Overlap {
        Overlap {
            sensor: zone.sensor(),
            other,
            other_tag,
            phase,
        }
    }

    #[test]
    fn test_enter_snaps_to_centerline_and_pushes() {
        let (mut sb, mut ball, zone) = rig();
        ball.launch(&mut sb);
        sb.set_position(ball.entity(), Vec3::new(0.68, 0.3, 7.0));
        sb.set_velocity(ball.entity(), Vec3::new(3.0, 2.0, 1.0));
        sb.clear_forces();

        let event = overlap(&zone, ball.entity(), Tag::Ball, OverlapPhase::Enter);
        assert!(zone.handle(&event, &mut ball, &mut sb, 0.0));

        assert!(ball.is_in_gutter());
        let pos = sb.position(ball.entity()).unwrap();
        assert!((pos - Vec3::new(0.75, 0.1, 7.0)).length() < 1e-6);
        // Clamped to 5, then a velocity change of 5 along the gutter
        assert_eq!(sb.velocity(ball.entity()), Some(Vec3::new(0.0, 0.0, 10.0)));
        let push = sb.forces().last().copied().unwrap();
        assert_eq!(push.mode, ForceMode::VelocityChange);
        assert_eq!(push.force, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_stay_eases_toward_center() {
        let (mut sb, mut ball, zone) = rig();
        ball.launch(&mut sb);
        ball.set_in_gutter(true, &mut sb);
        sb.set_position(ball.entity(), Vec3::new(0.65, 0.1, 7.0));
        sb.set_velocity(ball.entity(), Vec3::new(0.5, 0.0, 2.0));

        let event = overlap(&zone, ball.entity(), Tag::Ball, OverlapPhase::Stay);
        zone.handle(&event, &mut ball, &mut sb, 0.05);

        // Half way there: lerp factor 0.05 * 10
        let pos = sb.position(ball.entity()).unwrap();
        assert!((pos.x - 0.7).abs() < 1e-5);
        assert_eq!(sb.velocity(ball.entity()), Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(sb.forces().last().unwrap().mode, ForceMode::Acceleration);

        // Large steps never overshoot
        zone.handle(&event, &mut ball, &mut sb, 1.0);
        assert!((sb.position(ball.entity()).unwrap().x - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_exit_only_clears_flag() {
        let (mut sb, mut ball, zone) = rig();
        ball.launch(&mut sb);
        ball.set_in_gutter(true, &mut sb);
        sb.set_velocity(ball.entity(), Vec3::new(1.0, 1.0, 1.0));
        sb.clear_forces();

        let event = overlap(&zone, ball.entity(), Tag::Ball, OverlapPhase::Exit);
        assert!(zone.handle(&event, &mut ball, &mut sb, 0.1));
        assert!(!ball.is_in_gutter());
        assert_eq!(sb.velocity(ball.entity()), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert!(sb.forces().is_empty());
    }

    #[test]
    fn test_ignores_everything_but_the_ball() {
        let (mut sb, mut ball, zone) = rig();
        ball.launch(&mut sb);
        let pin = sb.spawn("pin", Tag::Pin, Vec3::new(0.75, 0.0, 5.0));

        let event = overlap(&zone, pin, Tag::Pin, OverlapPhase::Enter);
        assert!(!zone.handle(&event, &mut ball, &mut sb, 0.0));
        assert!(!ball.is_in_gutter());

        let elsewhere = Overlap {
            sensor: pin,
            ..overlap(&zone, ball.entity(), Tag::Ball, OverlapPhase::Enter)
        };
        assert!(!zone.handle(&elsewhere, &mut ball, &mut sb, 0.0));
    }

    #[test]
    fn test_attached_ball_is_left_alone() {
        let (mut sb, mut ball, zone) = rig();
        let before = sb.position(ball.entity());
        sb.clear_forces();

        let event = overlap(&zone, ball.entity(), Tag::Ball, OverlapPhase::Enter);
        zone.handle(&event, &mut ball, &mut sb, 0.0);
        assert!(ball.is_in_gutter());
        assert_eq!(sb.position(ball.entity()), before);
        assert!(sb.forces().is_empty());
    }
}
