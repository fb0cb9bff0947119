//! Lane driver
//!
//! Owns every gameplay component and routes host callbacks to them:
//! - `update` once per rendered frame (input, anchor sync, indicator)
//! - `fixed_update` once per simulation step (overlap events)
//! - `end_of_frame` after the host has applied its deferred destroys/spawns

use super::ball::{BallController, BallSetup};
use super::coordinator::{CoordinatorSetup, GameCoordinator};
use super::gutter::GutterZone;
use super::indicator::LaunchIndicator;
use crate::error::ConfigError;
use crate::host::{EntityId, Host, Overlap, OverlapPhase, PrefabId};
use crate::settings::LaneSettings;
use crate::signal::{InputListener, InputSignals};

/// Input for a single frame
#[derive(Debug, Clone, Default)]
pub struct LaneInput {
    /// "launch pressed"
    pub launch: bool,
    /// "reset pressed"
    pub reset: bool,
    /// Zero the score and re-rack
    pub new_game: bool,
}

/// Scene handles the lane is wired to. `None` means "not assigned".
#[derive(Debug, Clone, Default)]
pub struct LaneHandles {
    pub ball: Option<EntityId>,
    pub anchor: Option<EntityId>,
    pub indicator: Option<EntityId>,
    pub pin_template: Option<PrefabId>,
    pub pin_anchor: Option<EntityId>,
    pub score_label: Option<EntityId>,
    pub gutters: Vec<EntityId>,
}

/// One bowling lane
#[derive(Debug, Clone)]
pub struct Lane {
    settings: LaneSettings,
    inputs: InputSignals,
    ball: BallController,
    indicator: LaunchIndicator,
    gutters: Vec<GutterZone>,
    coordinator: GameCoordinator,
    frame: u64,
}

impl Lane {
    pub fn new<H: Host + ?Sized>(
        settings: LaneSettings,
        handles: &LaneHandles,
        host: &mut H,
    ) -> Result<Self, ConfigError> {
        let mut inputs = InputSignals::new();
        let ball = BallController::new(
            &BallSetup {
                ball: handles.ball,
                anchor: handles.anchor,
                indicator: handles.indicator,
            },
            &settings,
            host,
            Some(&mut inputs),
        )?;
        let indicator = LaunchIndicator::new(ball.indicator());
        let gutters = handles
            .gutters
            .iter()
            .map(|g| GutterZone::new(*g, ball.entity(), settings.gutter.clone()))
            .collect();
        let coordinator = GameCoordinator::new(
            &CoordinatorSetup {
                pin_template: handles.pin_template,
                pin_anchor: handles.pin_anchor,
                score_label: handles.score_label,
            },
            host,
            Some(&mut inputs),
        )?;
        log::info!(
            "Lane ready: {} pins, {} gutters",
            coordinator.pin_count(),
            handles.gutters.len()
        );

        Ok(Self {
            settings,
            inputs,
            ball,
            indicator,
            gutters,
            coordinator,
            frame: 0,
        })
    }

    pub fn settings(&self) -> &LaneSettings {
        &self.settings
    }

    pub fn ball(&self) -> &BallController {
        &self.ball
    }

    pub fn coordinator(&self) -> &GameCoordinator {
        &self.coordinator
    }

    pub fn inputs(&self) -> &InputSignals {
        &self.inputs
    }

    /// Mutable access to the input signals (to unsubscribe a listener)
    pub fn inputs_mut(&mut self) -> &mut InputSignals {
        &mut self.inputs
    }

    pub fn score(&self) -> u64 {
        self.coordinator.score()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The player may launch: ball on its anchor and no reset in flight
    pub fn ready_to_launch(&self) -> bool {
        !self.ball.is_launched() && !self.coordinator.is_resetting()
    }

    /// Per-frame tick
    pub fn update<H: Host + ?Sized>(&mut self, host: &mut H, input: &LaneInput) {
        self.frame += 1;

        if input.new_game {
            self.coordinator.new_game(&mut self.ball, host);
        }
        if input.reset {
            self.emit_reset(host);
        }
        if input.launch {
            self.emit_launch(host);
        }

        self.ball.update(host);
        self.indicator.update(host);
    }

    fn emit_reset<H: Host + ?Sized>(&mut self, host: &mut H) {
        let listeners: Vec<InputListener> = self.inputs.reset.emit().copied().collect();
        for listener in listeners {
            match listener {
                InputListener::Coordinator => {
                    self.coordinator.handle_reset(&mut self.ball, host);
                }
                InputListener::Ball => self.ball.reset(host),
            }
        }
    }

    fn emit_launch<H: Host + ?Sized>(&mut self, host: &mut H) {
        let listeners: Vec<InputListener> = self.inputs.launch.emit().copied().collect();
        for listener in listeners {
            match listener {
                InputListener::Ball if self.coordinator.is_resetting() => {
                    log::debug!("Launch ignored while pins are being reset");
                }
                InputListener::Ball => {
                    self.ball.launch(host);
                }
                InputListener::Coordinator => {}
            }
        }
    }

    /// Per-simulation-step tick: deliver overlap events
    pub fn fixed_update<H: Host + ?Sized>(&mut self, host: &mut H, overlaps: &[Overlap], dt: f32) {
        for overlap in overlaps {
            self.route_overlap(overlap, host, dt);
        }
    }

    fn route_overlap<H: Host + ?Sized>(&mut self, overlap: &Overlap, host: &mut H, dt: f32) {
        if let Some(gutter) = self.gutters.iter().find(|g| g.sensor() == overlap.sensor) {
            gutter.handle(overlap, &mut self.ball, host, dt);
            return;
        }
        if overlap.phase == OverlapPhase::Enter {
            self.coordinator
                .on_pin_overlap(overlap.sensor, overlap.other_tag, host);
        }
    }

    /// Frame boundary: resume a suspended reset
    pub fn end_of_frame<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.coordinator.on_frame_boundary(host);
    }
}
