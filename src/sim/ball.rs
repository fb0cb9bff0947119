//! Ball controller
//!
//! Owns the launch/reset state of the ball. Before launch the ball rides on
//! its anchor (the player position) as a kinematic body; launching detaches
//! it and hands it to physics with a single impulse.

use glam::Vec3;

use crate::error::ConfigError;
use crate::flatten_direction;
use crate::host::{EntityId, ForceMode, Host};
use crate::settings::LaneSettings;
use crate::signal::{InputListener, InputSignals};

/// Ball state - attached to the anchor or free-rolling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BallState {
    /// Riding on the anchor, physics suspended
    #[default]
    Attached,
    /// Launched, driven by physics
    Free,
}

/// Entities the ball controller is wired to
#[derive(Debug, Clone, Copy, Default)]
pub struct BallSetup {
    /// The ball itself (must carry a rigid body)
    pub ball: Option<EntityId>,
    /// Where the ball waits before launch
    pub anchor: Option<EntityId>,
    /// Camera-facing launch pointer
    pub indicator: Option<EntityId>,
}

/// Ball launch/reset state machine
#[derive(Debug, Clone)]
pub struct BallController {
    ball: EntityId,
    anchor: EntityId,
    indicator: EntityId,
    launch_force: f32,
    min_gutter_speed: f32,
    indicator_lift: f32,
    state: BallState,
    in_gutter: bool,
}

impl BallController {
    const NAME: &'static str = "BallController";

    /// Wire the controller, subscribe it to "launch pressed" and put the ball
    /// on its anchor.
    ///
    /// Any missing collaborator is fatal: it is logged and nothing is wired.
    pub fn new<H: Host + ?Sized>(
        setup: &BallSetup,
        settings: &LaneSettings,
        host: &mut H,
        inputs: Option<&mut InputSignals>,
    ) -> Result<Self, ConfigError> {
        let ball = setup
            .ball
            .filter(|b| host.exists(*b))
            .ok_or_else(|| ConfigError::missing(Self::NAME, "ball"))
            .inspect_err(|e| log::error!("{e}"))?;
        if !host.has_body(ball) {
            let err = ConfigError::MissingBody {
                component: Self::NAME,
                entity: ball.0,
            };
            log::error!("{err}");
            return Err(err);
        }
        let Some(inputs) = inputs else {
            let err = ConfigError::missing(Self::NAME, "input source");
            log::error!("{err}");
            return Err(err);
        };
        let anchor = setup
            .anchor
            .filter(|a| host.exists(*a))
            .ok_or_else(|| ConfigError::missing(Self::NAME, "ball anchor"))
            .inspect_err(|e| log::error!("{e}"))?;
        let indicator = setup
            .indicator
            .filter(|i| host.exists(*i))
            .ok_or_else(|| ConfigError::missing(Self::NAME, "launch indicator"))
            .inspect_err(|e| log::error!("{e}"))?;

        inputs.launch.subscribe(InputListener::Ball);

        let mut controller = Self {
            ball,
            anchor,
            indicator,
            launch_force: settings.launch_force,
            min_gutter_speed: settings.gutter.min_forward_speed,
            indicator_lift: settings.indicator_lift,
            state: BallState::Attached,
            in_gutter: false,
        };
        controller.reset(host);
        Ok(controller)
    }

    pub fn entity(&self) -> EntityId {
        self.ball
    }

    pub fn anchor(&self) -> EntityId {
        self.anchor
    }

    pub fn indicator(&self) -> EntityId {
        self.indicator
    }

    pub fn state(&self) -> BallState {
        self.state
    }

    pub fn is_launched(&self) -> bool {
        self.state == BallState::Free
    }

    pub fn is_in_gutter(&self) -> bool {
        self.in_gutter
    }

    /// Put the ball back on its anchor, un-launched. Safe to call repeatedly.
    pub fn reset<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.state = BallState::Attached;

        host.set_kinematic(self.ball, true);
        host.set_active(self.indicator, true);

        host.set_parent(self.ball, Some(self.anchor));
        host.set_local_position(self.ball, Vec3::ZERO);
        log::debug!("Ball reset to anchor {}", self.anchor);
    }

    /// Launch along the indicator's horizontal heading.
    ///
    /// Returns false (and does nothing) if the ball is already launched or
    /// sitting in a gutter.
    pub fn launch<H: Host + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.is_launched() || self.in_gutter {
            log::debug!("Launch ignored (launched: {}, in gutter: {})", self.is_launched(), self.in_gutter);
            return false;
        }
        self.state = BallState::Free;

        host.set_parent(self.ball, None);
        host.set_kinematic(self.ball, false);
        host.set_velocity(self.ball, Vec3::ZERO);

        let heading = host.forward(self.indicator).unwrap_or(Vec3::Z);
        let direction = flatten_direction(heading);
        host.add_force(self.ball, direction * self.launch_force, ForceMode::Impulse);

        host.set_active(self.indicator, false);
        log::info!("Ball launched along {direction}");
        true
    }

    /// Record gutter membership. Entering also straightens out a rolling ball;
    /// a ball still on its anchor only has the flag recorded.
    pub fn set_in_gutter<H: Host + ?Sized>(&mut self, active: bool, host: &mut H) {
        self.in_gutter = active;
        if !active || !self.is_launched() {
            return;
        }

        if let Some(velocity) = host.velocity(self.ball) {
            let forward = velocity.z.max(self.min_gutter_speed);
            host.set_velocity(self.ball, Vec3::new(0.0, 0.0, forward));
        }

        // Keep the indicator centered over the ball
        if let (Some(ball_pos), Some(mut pointer)) =
            (host.position(self.ball), host.position(self.indicator))
        {
            pointer.x = ball_pos.x;
            pointer.y = ball_pos.y + self.indicator_lift;
            host.set_position(self.indicator, pointer);
        }
    }

    /// Per-tick anchor sync while un-launched
    pub fn update<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_launched() {
            return;
        }
        if let Some(anchor_pos) = host.position(self.anchor) {
            host.set_position(self.ball, anchor_pos);
        }
    }
}
