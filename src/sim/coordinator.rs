//! Game coordinator: score and pin-set lifecycle
//!
//! The coordinator exclusively owns the live pin-set. A reset replaces it
//! wholesale in a short sequence with two suspension points:
//!
//! ```text
//! Idle ──reset──▶ unbind listeners, destroy old set
//!        └──▶ AwaitingTeardown ──frame boundary, old set gone──▶ spawn new set
//!                   └──▶ AwaitingSpawn ──frame boundary, set ready──▶ bind ──▶ Idle
//! ```
//!
//! If the template has gone missing at the spawn step the sequence stops in
//! `Faulted` with no live pin-set.

use glam::Vec3;

use super::ball::BallController;
use super::fall_trigger::{FallTrigger, ScoreListener};
use crate::error::ConfigError;
use crate::host::{EntityId, Host, PrefabId, Tag};
use crate::score_label;
use crate::signal::{InputListener, InputSignals};

/// Where the reset sequence currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPhase {
    /// Pins live, listeners bound
    #[default]
    Idle,
    /// Old set destroyed; waiting for the engine to drop it
    AwaitingTeardown { old: Option<EntityId> },
    /// New set spawned; waiting for it to initialize
    AwaitingSpawn { pin_set: EntityId },
    /// Spawn failed; no live pin-set until the next reset
    Faulted,
}

/// The live pin-set and its triggers
#[derive(Debug, Clone)]
pub struct PinSet {
    root: EntityId,
    triggers: Vec<FallTrigger>,
}

impl PinSet {
    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn triggers(&self) -> &[FallTrigger] {
        &self.triggers
    }

    pub fn fallen(&self) -> usize {
        self.triggers.iter().filter(|t| t.has_fallen()).count()
    }
}

/// Entities the coordinator is wired to
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorSetup {
    /// Template new pin-sets are spawned from
    pub pin_template: Option<PrefabId>,
    /// Spawn location
    pub pin_anchor: Option<EntityId>,
    /// Text surface for the score
    pub score_label: Option<EntityId>,
}

/// Score aggregation and pin-set lifecycle
#[derive(Debug, Clone)]
pub struct GameCoordinator {
    template: PrefabId,
    pin_anchor: EntityId,
    label: EntityId,
    score: u64,
    score_text: String,
    pin_set: Option<PinSet>,
    phase: ResetPhase,
}

impl GameCoordinator {
    const NAME: &'static str = "GameCoordinator";

    /// Wire the coordinator, subscribe it to "reset pressed", then find or
    /// create the pin-set and bind its triggers.
    pub fn new<H: Host + ?Sized>(
        setup: &CoordinatorSetup,
        host: &mut H,
        inputs: Option<&mut InputSignals>,
    ) -> Result<Self, ConfigError> {
        let Some(inputs) = inputs else {
            let err = ConfigError::missing(Self::NAME, "input source");
            log::error!("{err}");
            return Err(err);
        };
        let template = setup
            .pin_template
            .ok_or_else(|| ConfigError::missing(Self::NAME, "pin template"))
            .inspect_err(|e| log::error!("{e}"))?;
        let pin_anchor = setup
            .pin_anchor
            .filter(|a| host.exists(*a))
            .ok_or_else(|| ConfigError::missing(Self::NAME, "pin anchor"))
            .inspect_err(|e| log::error!("{e}"))?;
        let label = setup
            .score_label
            .filter(|l| host.exists(*l))
            .ok_or_else(|| ConfigError::missing(Self::NAME, "score label"))
            .inspect_err(|e| log::error!("{e}"))?;

        let mut coordinator = Self {
            template,
            pin_anchor,
            label,
            score: 0,
            score_text: score_label(0),
            pin_set: None,
            phase: ResetPhase::Idle,
        };
        coordinator.find_or_create(host)?;
        host.set_text(label, &coordinator.score_text);

        inputs.reset.subscribe(InputListener::Coordinator);
        Ok(coordinator)
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn score_text(&self) -> &str {
        &self.score_text
    }

    pub fn phase(&self) -> ResetPhase {
        self.phase
    }

    /// A reset sequence is suspended at one of its frame-boundary waits
    pub fn is_resetting(&self) -> bool {
        matches!(
            self.phase,
            ResetPhase::AwaitingTeardown { .. } | ResetPhase::AwaitingSpawn { .. }
        )
    }

    pub fn pin_set(&self) -> Option<&PinSet> {
        self.pin_set.as_ref()
    }

    pub fn pin_count(&self) -> usize {
        self.pin_set.as_ref().map_or(0, |s| s.triggers.len())
    }

    pub fn fallen_count(&self) -> usize {
        self.pin_set.as_ref().map_or(0, PinSet::fallen)
    }

    fn find_or_create<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<(), ConfigError> {
        let root = match host.find_tagged(Tag::PinSet) {
            Some(root) => {
                log::info!("Existing pins found ({root}). Using them.");
                root
            }
            None => {
                log::info!("No existing pins found. Creating new pins.");
                self.spawn(host).ok_or_else(|| {
                    let err = ConfigError::MissingPinTemplate(self.template.0);
                    log::error!("{err}");
                    err
                })?
            }
        };
        self.bind(root, host);
        Ok(())
    }

    fn spawn<H: Host + ?Sized>(&self, host: &mut H) -> Option<EntityId> {
        let at = host.position(self.pin_anchor).unwrap_or(Vec3::ZERO);
        host.instantiate(self.template, at, Tag::PinSet)
    }

    /// Build triggers for every pin under `root` and attach the score listener
    fn bind<H: Host + ?Sized>(&mut self, root: EntityId, host: &H) {
        let listener = ScoreListener { pin_set: root };
        let triggers: Vec<FallTrigger> = host
            .fall_sensors(root)
            .into_iter()
            .map(|pin| {
                let name = host.name(pin).unwrap_or("pin").to_string();
                let mut trigger = FallTrigger::new(pin, name);
                trigger.clear_listeners();
                trigger.subscribe(listener);
                trigger
            })
            .collect();
        if triggers.is_empty() {
            log::warn!("Pin set {root} has no fall triggers");
        }
        log::debug!("Score tracking attached to {} pins", triggers.len());
        self.pin_set = Some(PinSet { root, triggers });
    }

    /// Handle "reset pressed": reset the ball and start replacing the pins.
    ///
    /// Ignored while a previous reset is still in flight.
    pub fn handle_reset<H: Host + ?Sized>(
        &mut self,
        ball: &mut BallController,
        host: &mut H,
    ) -> bool {
        if self.is_resetting() {
            log::warn!("Reset already in progress; ignoring");
            return false;
        }
        log::info!("Reset button pressed.");
        ball.reset(host);

        // Unbind first so teardown can't score
        if let Some(set) = self.pin_set.as_mut() {
            for trigger in &mut set.triggers {
                trigger.clear_listeners();
            }
        }

        let old = self.pin_set.take().map(|set| set.root);
        if let Some(root) = old {
            log::info!("Destroying old pin instance {root}");
            host.destroy(root);
        }
        self.phase = ResetPhase::AwaitingTeardown { old };
        true
    }

    /// Start a new game: score back to zero, then a normal reset
    pub fn new_game<H: Host + ?Sized>(&mut self, ball: &mut BallController, host: &mut H) -> bool {
        if self.is_resetting() {
            log::warn!("Reset already in progress; new game ignored");
            return false;
        }
        self.score = 0;
        self.score_text = score_label(0);
        host.set_text(self.label, &self.score_text);
        log::info!("New game");
        self.handle_reset(ball, host)
    }

    /// Resume the reset sequence at a frame boundary
    pub fn on_frame_boundary<H: Host + ?Sized>(&mut self, host: &mut H) {
        match self.phase {
            ResetPhase::Idle | ResetPhase::Faulted => {}
            ResetPhase::AwaitingTeardown { old } => {
                if old.is_some_and(|o| host.exists(o)) {
                    log::debug!("Old pins still alive; waiting another frame");
                    return;
                }
                if !host.has_prefab(self.template) {
                    log::error!(
                        "CRITICAL: pin template {} is unavailable; pin reset aborted",
                        self.template.0
                    );
                    self.phase = ResetPhase::Faulted;
                    return;
                }
                log::info!("Spawning new pins...");
                match self.spawn(host) {
                    Some(pin_set) => self.phase = ResetPhase::AwaitingSpawn { pin_set },
                    None => {
                        log::error!("CRITICAL: pin template {} failed to spawn", self.template.0);
                        self.phase = ResetPhase::Faulted;
                    }
                }
            }
            ResetPhase::AwaitingSpawn { pin_set } => {
                if !host.is_ready(pin_set) {
                    log::debug!("New pins not ready; waiting another frame");
                    return;
                }
                self.bind(pin_set, host);
                self.phase = ResetPhase::Idle;
                log::info!("Pin reset complete.");
            }
        }
    }

    /// A pin sensor touched something. Returns true if it scored.
    pub fn on_pin_overlap<H: Host + ?Sized>(
        &mut self,
        pin: EntityId,
        other_tag: Tag,
        host: &mut H,
    ) -> bool {
        let Some(set) = self.pin_set.as_mut() else {
            return false;
        };
        let root = set.root;
        let Some(trigger) = set.triggers.iter_mut().find(|t| t.pin() == pin) else {
            return false;
        };
        let hits = trigger
            .on_overlap(other_tag)
            .iter()
            .filter(|l| l.pin_set == root)
            .count();
        for _ in 0..hits {
            self.increment_score(host);
        }
        hits > 0
    }

    fn increment_score<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.score += 1;
        self.score_text = score_label(self.score);
        host.set_text(self.label, &self.score_text);
        log::debug!("{}", self.score_text);
    }
}
