//! Engine seams
//!
//! The lane never integrates physics, renders or lays out text itself. It
//! talks to the host engine through these traits, using plain handles. Any
//! engine (or the headless [`crate::sandbox::Sandbox`]) can sit behind them.

use std::fmt;

use glam::{Quat, Vec3};

/// Handle to an entity owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a spawnable template (the pin-set prefab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabId(pub u32);

/// Entity tags used for overlap filtering and identity lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    #[default]
    Untagged,
    Ball,
    Ground,
    PinSet,
    Pin,
    Gutter,
}

/// How a force is applied to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous, mass-dependent
    Force,
    /// Continuous, mass-independent
    Acceleration,
    /// Instant, mass-dependent
    Impulse,
    /// Instant, mass-independent
    VelocityChange,
}

/// Overlap event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPhase {
    Enter,
    Stay,
    Exit,
}

/// An overlap reported by the host between a sensor and another entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// The trigger volume that observed the overlap (gutter, pin)
    pub sensor: EntityId,
    /// The entity that entered/stayed/left
    pub other: EntityId,
    /// Tag of `other`
    pub other_tag: Tag,
    pub phase: OverlapPhase,
}

/// Spatial transforms and the scene hierarchy
pub trait Transforms {
    fn exists(&self, entity: EntityId) -> bool;
    fn tag(&self, entity: EntityId) -> Tag;
    fn name(&self, entity: EntityId) -> Option<&str>;

    /// World position
    fn position(&self, entity: EntityId) -> Option<Vec3>;
    fn set_position(&mut self, entity: EntityId, position: Vec3);
    /// Position relative to the parent (world position when unparented)
    fn set_local_position(&mut self, entity: EntityId, local: Vec3);

    fn rotation(&self, entity: EntityId) -> Option<Quat>;
    fn set_rotation(&mut self, entity: EntityId, rotation: Quat);

    /// Facing direction (+Z in local space)
    fn forward(&self, entity: EntityId) -> Option<Vec3> {
        self.rotation(entity).map(|r| r * Vec3::Z)
    }

    fn parent(&self, entity: EntityId) -> Option<EntityId>;
    /// Reparent, keeping the current world position
    fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>);

    fn is_active(&self, entity: EntityId) -> bool;
    fn set_active(&mut self, entity: EntityId, active: bool);
}

/// Rigid-body access
pub trait Bodies {
    fn has_body(&self, entity: EntityId) -> bool;
    fn velocity(&self, entity: EntityId) -> Option<Vec3>;
    fn set_velocity(&mut self, entity: EntityId, velocity: Vec3);
    fn add_force(&mut self, entity: EntityId, force: Vec3, mode: ForceMode);
    fn is_kinematic(&self, entity: EntityId) -> bool;
    /// Kinematic bodies are exempt from physics response
    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool);
}

/// Template instantiation and destruction
pub trait Prefabs {
    /// First live entity carrying `tag`
    fn find_tagged(&self, tag: Tag) -> Option<EntityId>;
    fn has_prefab(&self, prefab: PrefabId) -> bool;
    /// Spawn `prefab` at `position` and tag the instance root.
    /// `None` if the template is unavailable.
    fn instantiate(&mut self, prefab: PrefabId, position: Vec3, tag: Tag) -> Option<EntityId>;
    /// Request destruction. Takes effect at the next frame boundary.
    fn destroy(&mut self, entity: EntityId);
    /// True once a spawned instance finished initializing
    fn is_ready(&self, entity: EntityId) -> bool;
    /// Every descendant of `root` that carries a fall sensor, in stable order
    fn fall_sensors(&self, root: EntityId) -> Vec<EntityId>;
}

/// Text surface for the score label
pub trait TextDisplay {
    fn set_text(&mut self, label: EntityId, text: &str);
}

/// The main camera
pub trait CameraView {
    /// `None` when there is no main camera
    fn camera_forward(&self) -> Option<Vec3>;
}

/// Everything the lane needs from its host engine
pub trait Host: Transforms + Bodies + Prefabs + TextDisplay + CameraView {}

impl<T: Transforms + Bodies + Prefabs + TextDisplay + CameraView> Host for T {}
