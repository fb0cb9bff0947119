//! Headless host
//!
//! A small stand-in engine that implements the [`crate::host`] traits so the
//! lane can run without a renderer: flat entity storage, a translation-only
//! hierarchy, kinematic/dynamic bodies with Euler integration, AABB sensor
//! regions and pins that topple when the ball rolls through them.
//!
//! Destruction is deferred to [`Sandbox::end_frame`], and freshly spawned
//! instances only report ready after the frame boundary that follows them,
//! matching the engines the lane is written against.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::{Quat, Vec3};

use crate::host::{
    Bodies, CameraView, EntityId, ForceMode, Overlap, OverlapPhase, PrefabId, Prefabs, Tag,
    TextDisplay, Transforms,
};
use crate::settings::LaneSettings;
use crate::sim::LaneHandles;

/// Horizontal distance at which a rolling ball knocks a pin over
pub const KNOCK_RADIUS: f32 = 0.25;

/// Pin-set template
#[derive(Debug, Clone)]
pub struct PinTemplate {
    pub name: String,
    /// Pin offsets from the instance root
    pub pins: Vec<Vec3>,
}

/// A force recorded for inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedForce {
    pub entity: EntityId,
    pub force: Vec3,
    pub mode: ForceMode,
}

#[derive(Debug, Clone)]
struct Body {
    velocity: Vec3,
    mass: f32,
    kinematic: bool,
    /// Continuous acceleration accumulated for the next step
    pending_accel: Vec3,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    tag: Tag,
    parent: Option<EntityId>,
    local: Vec3,
    rotation: Quat,
    active: bool,
    body: Option<Body>,
    /// Half extents of a sensor region centered on the entity
    region: Option<Vec3>,
    fall_sensor: bool,
    toppled: bool,
    ready: bool,
    doomed: bool,
}

impl Node {
    fn new(name: &str, tag: Tag, local: Vec3) -> Self {
        Self {
            name: name.to_string(),
            tag,
            parent: None,
            local,
            rotation: Quat::IDENTITY,
            active: true,
            body: None,
            region: None,
            fall_sensor: false,
            toppled: false,
            ready: true,
            doomed: false,
        }
    }
}

/// Headless host
#[derive(Debug, Clone)]
pub struct Sandbox {
    nodes: BTreeMap<EntityId, Node>,
    prefabs: HashMap<PrefabId, PinTemplate>,
    labels: HashMap<EntityId, String>,
    camera_forward: Option<Vec3>,
    forces: Vec<AppliedForce>,
    /// (region, body) pairs overlapping after the last step
    contacts: HashSet<(EntityId, EntityId)>,
    /// Pins toppled since the last step, waiting to report ground contact
    falling: Vec<EntityId>,
    ground: EntityId,
    next_id: u32,
    next_prefab: u32,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        let mut sandbox = Self {
            nodes: BTreeMap::new(),
            prefabs: HashMap::new(),
            labels: HashMap::new(),
            camera_forward: Some(Vec3::Z),
            forces: Vec::new(),
            contacts: HashSet::new(),
            falling: Vec::new(),
            ground: EntityId(0),
            next_id: 1,
            next_prefab: 1,
        };
        sandbox.ground = sandbox.spawn("Ground", Tag::Ground, Vec3::ZERO);
        sandbox
    }

    fn alloc(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn a plain entity at a world position
    pub fn spawn(&mut self, name: &str, tag: Tag, position: Vec3) -> EntityId {
        let id = self.alloc();
        self.nodes.insert(id, Node::new(name, tag, position));
        id
    }

    /// Give an entity a dynamic rigid body
    pub fn add_body(&mut self, entity: EntityId, mass: f32) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.body = Some(Body {
                velocity: Vec3::ZERO,
                mass: mass.max(f32::EPSILON),
                kinematic: false,
                pending_accel: Vec3::ZERO,
            });
        }
    }

    /// Turn an entity into an axis-aligned sensor region
    pub fn add_region(&mut self, entity: EntityId, half_extents: Vec3) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.region = Some(half_extents.abs());
        }
    }

    /// Create a text surface
    pub fn add_label(&mut self, name: &str) -> EntityId {
        let id = self.spawn(name, Tag::Untagged, Vec3::ZERO);
        self.labels.insert(id, String::new());
        id
    }

    pub fn register_prefab(&mut self, template: PinTemplate) -> PrefabId {
        let id = PrefabId(self.next_prefab);
        self.next_prefab += 1;
        self.prefabs.insert(id, template);
        id
    }

    /// Make a template unavailable
    pub fn unload_prefab(&mut self, prefab: PrefabId) {
        self.prefabs.remove(&prefab);
    }

    /// Make a template available again under an existing handle
    pub fn reload_prefab(&mut self, prefab: PrefabId, template: PinTemplate) {
        self.prefabs.insert(prefab, template);
    }

    pub fn set_camera_forward(&mut self, forward: Option<Vec3>) {
        self.camera_forward = forward;
    }

    pub fn text(&self, label: EntityId) -> Option<&str> {
        self.labels.get(&label).map(String::as_str)
    }

    pub fn ground(&self) -> EntityId {
        self.ground
    }

    /// Every force/impulse applied so far, oldest first
    pub fn forces(&self) -> &[AppliedForce] {
        &self.forces
    }

    pub fn clear_forces(&mut self) {
        self.forces.clear();
    }

    /// Live (not yet destroyed) entities carrying `tag`
    pub fn count_tagged(&self, tag: Tag) -> usize {
        self.nodes
            .values()
            .filter(|n| n.tag == tag && !n.doomed)
            .count()
    }

    pub fn is_toppled(&self, pin: EntityId) -> bool {
        self.nodes.get(&pin).is_some_and(|n| n.toppled)
    }

    /// Knock a pin over; it reports ground contact on the next step
    pub fn topple(&mut self, pin: EntityId) {
        if let Some(node) = self.nodes.get_mut(&pin) {
            if node.fall_sensor && !node.toppled && !node.doomed {
                node.toppled = true;
                self.falling.push(pin);
            }
        }
    }

    fn world_of(&self, entity: EntityId) -> Option<Vec3> {
        let mut node = self.nodes.get(&entity)?;
        let mut pos = node.local;
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            pos += node.local;
        }
        Some(pos)
    }

    fn is_descendant(&self, entity: EntityId, root: EntityId) -> bool {
        let mut cur = self.nodes.get(&entity).and_then(|n| n.parent);
        while let Some(id) = cur {
            if id == root {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Advance one simulation step and report overlaps
    pub fn step(&mut self, dt: f32) -> Vec<Overlap> {
        // Integrate free bodies
        let free: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.body.as_ref().is_some_and(|b| !b.kinematic) && n.parent.is_none())
            .map(|(id, _)| *id)
            .collect();
        for node in self.nodes.values_mut() {
            if let Some(body) = node.body.as_mut() {
                if !body.kinematic && node.parent.is_none() {
                    body.velocity += body.pending_accel * dt;
                    node.local += body.velocity * dt;
                }
                body.pending_accel = Vec3::ZERO;
            }
        }

        // Rolling balls knock pins over
        let balls: Vec<Vec3> = free
            .iter()
            .filter(|id| self.tag(**id) == Tag::Ball)
            .filter_map(|id| self.world_of(*id))
            .collect();
        let standing: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.fall_sensor && n.ready && !n.doomed && !n.toppled)
            .map(|(id, _)| *id)
            .collect();
        for pin in standing {
            let Some(pin_pos) = self.world_of(pin) else {
                continue;
            };
            let hit = balls.iter().any(|b| {
                let d = *b - pin_pos;
                d.x * d.x + d.z * d.z < KNOCK_RADIUS * KNOCK_RADIUS
            });
            if hit {
                self.topple(pin);
            }
        }

        let mut overlaps = Vec::new();
        for pin in std::mem::take(&mut self.falling) {
            if self.nodes.get(&pin).is_some_and(|n| n.ready && !n.doomed) {
                overlaps.push(Overlap {
                    sensor: pin,
                    other: self.ground,
                    other_tag: Tag::Ground,
                    phase: OverlapPhase::Enter,
                });
            }
        }

        // Sensor regions vs bodies
        let regions: Vec<(EntityId, Vec3)> = self
            .nodes
            .iter()
            .filter(|(_, n)| !n.doomed)
            .filter_map(|(id, n)| n.region.map(|h| (*id, h)))
            .collect();
        let bodies: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.body.is_some() && !n.doomed)
            .map(|(id, _)| *id)
            .collect();
        let mut current = HashSet::new();
        for (region, half) in &regions {
            let Some(center) = self.world_of(*region) else {
                continue;
            };
            for body in &bodies {
                let Some(pos) = self.world_of(*body) else {
                    continue;
                };
                let d = (pos - center).abs();
                if d.x <= half.x && d.y <= half.y && d.z <= half.z {
                    current.insert((*region, *body));
                }
            }
        }
        let mut pairs: Vec<_> = current.union(&self.contacts).copied().collect();
        pairs.sort();
        for (region, body) in pairs {
            let phase = match (self.contacts.contains(&(region, body)), current.contains(&(region, body))) {
                (false, true) => OverlapPhase::Enter,
                (true, true) => OverlapPhase::Stay,
                _ => OverlapPhase::Exit,
            };
            overlaps.push(Overlap {
                sensor: region,
                other: body,
                other_tag: self.tag(body),
                phase,
            });
        }
        self.contacts = current;

        overlaps
    }

    /// Frame boundary: apply pending destroys, finish pending spawns
    pub fn end_frame(&mut self) {
        let doomed: Vec<EntityId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.doomed)
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            self.nodes.remove(id);
            self.labels.remove(id);
        }
        if !doomed.is_empty() {
            self.contacts
                .retain(|(a, b)| !doomed.contains(a) && !doomed.contains(b));
            log::debug!("Destroyed {} entities", doomed.len());
        }
        for node in self.nodes.values_mut() {
            node.ready = true;
        }
    }
}

impl Transforms for Sandbox {
    fn exists(&self, entity: EntityId) -> bool {
        self.nodes.contains_key(&entity)
    }

    fn tag(&self, entity: EntityId) -> Tag {
        self.nodes.get(&entity).map(|n| n.tag).unwrap_or_default()
    }

    fn name(&self, entity: EntityId) -> Option<&str> {
        self.nodes.get(&entity).map(|n| n.name.as_str())
    }

    fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.world_of(entity)
    }

    fn set_position(&mut self, entity: EntityId, position: Vec3) {
        let parent_pos = self
            .nodes
            .get(&entity)
            .and_then(|n| n.parent)
            .and_then(|p| self.world_of(p))
            .unwrap_or(Vec3::ZERO);
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.local = position - parent_pos;
        }
    }

    fn set_local_position(&mut self, entity: EntityId, local: Vec3) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.local = local;
        }
    }

    fn rotation(&self, entity: EntityId) -> Option<Quat> {
        self.nodes.get(&entity).map(|n| n.rotation)
    }

    fn set_rotation(&mut self, entity: EntityId, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.rotation = rotation.normalize();
        }
    }

    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.nodes.get(&entity).and_then(|n| n.parent)
    }

    fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) {
        let Some(world) = self.world_of(entity) else {
            return;
        };
        let parent = parent.filter(|p| *p != entity && self.nodes.contains_key(p));
        let parent_pos = parent.and_then(|p| self.world_of(p)).unwrap_or(Vec3::ZERO);
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.parent = parent;
            node.local = world - parent_pos;
        }
    }

    fn is_active(&self, entity: EntityId) -> bool {
        self.nodes.get(&entity).is_some_and(|n| n.active)
    }

    fn set_active(&mut self, entity: EntityId, active: bool) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.active = active;
        }
    }
}

impl Bodies for Sandbox {
    fn has_body(&self, entity: EntityId) -> bool {
        self.nodes.get(&entity).is_some_and(|n| n.body.is_some())
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec3> {
        self.nodes
            .get(&entity)
            .and_then(|n| n.body.as_ref())
            .map(|b| b.velocity)
    }

    fn set_velocity(&mut self, entity: EntityId, velocity: Vec3) {
        if let Some(body) = self.nodes.get_mut(&entity).and_then(|n| n.body.as_mut()) {
            body.velocity = velocity;
        }
    }

    fn add_force(&mut self, entity: EntityId, force: Vec3, mode: ForceMode) {
        let Some(body) = self.nodes.get_mut(&entity).and_then(|n| n.body.as_mut()) else {
            return;
        };
        self.forces.push(AppliedForce {
            entity,
            force,
            mode,
        });
        if body.kinematic {
            return;
        }
        match mode {
            ForceMode::Impulse => body.velocity += force / body.mass,
            ForceMode::VelocityChange => body.velocity += force,
            ForceMode::Acceleration => body.pending_accel += force,
            ForceMode::Force => body.pending_accel += force / body.mass,
        }
    }

    fn is_kinematic(&self, entity: EntityId) -> bool {
        self.nodes
            .get(&entity)
            .and_then(|n| n.body.as_ref())
            .is_some_and(|b| b.kinematic)
    }

    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool) {
        if let Some(body) = self.nodes.get_mut(&entity).and_then(|n| n.body.as_mut()) {
            body.kinematic = kinematic;
            if kinematic {
                body.velocity = Vec3::ZERO;
                body.pending_accel = Vec3::ZERO;
            }
        }
    }
}

impl Prefabs for Sandbox {
    fn find_tagged(&self, tag: Tag) -> Option<EntityId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.tag == tag && !n.doomed)
            .map(|(id, _)| *id)
    }

    fn has_prefab(&self, prefab: PrefabId) -> bool {
        self.prefabs.contains_key(&prefab)
    }

    fn instantiate(&mut self, prefab: PrefabId, position: Vec3, tag: Tag) -> Option<EntityId> {
        let template = self.prefabs.get(&prefab)?.clone();
        let root = self.alloc();
        let mut root_node = Node::new(&format!("{}(Clone)", template.name), tag, position);
        root_node.ready = false;
        self.nodes.insert(root, root_node);

        for (i, offset) in template.pins.iter().enumerate() {
            let pin = self.alloc();
            let mut node = Node::new(&format!("Pin {}", i + 1), Tag::Pin, *offset);
            node.parent = Some(root);
            node.fall_sensor = true;
            node.ready = false;
            self.nodes.insert(pin, node);
        }
        log::debug!("Instantiated {} as {}", template.name, root);
        Some(root)
    }

    fn destroy(&mut self, entity: EntityId) {
        let doomed: Vec<EntityId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| *id == entity || self.is_descendant(*id, entity))
            .collect();
        for id in doomed {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.doomed = true;
            }
        }
    }

    fn is_ready(&self, entity: EntityId) -> bool {
        self.nodes.get(&entity).is_some_and(|n| n.ready && !n.doomed)
    }

    fn fall_sensors(&self, root: EntityId) -> Vec<EntityId> {
        self.nodes
            .iter()
            .filter(|(id, n)| n.fall_sensor && self.is_descendant(**id, root))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl TextDisplay for Sandbox {
    fn set_text(&mut self, label: EntityId, text: &str) {
        if let Some(slot) = self.labels.get_mut(&label) {
            slot.clear();
            slot.push_str(text);
        }
    }
}

impl CameraView for Sandbox {
    fn camera_forward(&self) -> Option<Vec3> {
        self.camera_forward
    }
}

/// Build a complete lane: player anchor, ball, indicator, two gutters, a pin
/// template and a score label. The pin-set itself is left for the
/// coordinator to find or spawn.
pub fn lane_scene(settings: &LaneSettings) -> (Sandbox, LaneHandles) {
    let mut sb = Sandbox::new();

    let anchor = sb.spawn("BallAnchor", Tag::Untagged, Vec3::new(0.0, 0.11, 0.0));
    let ball = sb.spawn("Ball", Tag::Ball, Vec3::new(0.0, 0.11, 0.0));
    sb.add_body(ball, 1.0);
    let indicator = sb.spawn("LaunchIndicator", Tag::Untagged, Vec3::new(0.0, 0.2, 0.5));

    let mut gutters = Vec::new();
    for (name, x) in [("LeftGutter", -0.75), ("RightGutter", 0.75)] {
        let gutter = sb.spawn(name, Tag::Gutter, Vec3::new(x, 0.0, settings.pin_anchor.z / 2.0));
        sb.add_region(gutter, Vec3::new(0.1, 0.3, settings.pin_anchor.z / 2.0 + 2.0));
        gutters.push(gutter);
    }

    let pin_anchor = sb.spawn("PinAnchor", Tag::Untagged, settings.pin_anchor);
    let pin_template = sb.register_prefab(PinTemplate {
        name: "PinCollection".to_string(),
        pins: settings.pin_layout.clone(),
    });
    let score_label = sb.add_label("ScoreText");

    let handles = LaneHandles {
        ball: Some(ball),
        anchor: Some(anchor),
        indicator: Some(indicator),
        pin_template: Some(pin_template),
        pin_anchor: Some(pin_anchor),
        score_label: Some(score_label),
        gutters,
    };
    (sb, handles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> PinTemplate {
        PinTemplate {
            name: "Pins".to_string(),
            pins: vec![Vec3::ZERO, Vec3::new(0.3, 0.0, 0.3)],
        }
    }

    #[test]
    fn test_destroy_is_deferred_to_frame_end() {
        let mut sb = Sandbox::new();
        let prefab = sb.register_prefab(template());
        let root = sb.instantiate(prefab, Vec3::Z, Tag::PinSet).unwrap();
        assert_eq!(sb.fall_sensors(root).len(), 2);

        sb.destroy(root);
        assert!(sb.exists(root));
        assert_eq!(sb.count_tagged(Tag::PinSet), 0);
        assert_eq!(sb.find_tagged(Tag::PinSet), None);
        sb.end_frame();
        assert!(!sb.exists(root));
        assert_eq!(sb.count_tagged(Tag::Pin), 0);
    }

    #[test]
    fn test_spawn_ready_after_frame_end() {
        let mut sb = Sandbox::new();
        let prefab = sb.register_prefab(template());
        let root = sb.instantiate(prefab, Vec3::Z, Tag::PinSet).unwrap();
        assert!(!sb.is_ready(root));
        sb.end_frame();
        assert!(sb.is_ready(root));

        sb.unload_prefab(prefab);
        assert!(sb.instantiate(prefab, Vec3::Z, Tag::PinSet).is_none());
    }

    #[test]
    fn test_reparent_keeps_world_position() {
        let mut sb = Sandbox::new();
        let parent = sb.spawn("p", Tag::Untagged, Vec3::new(1.0, 0.0, 0.0));
        let child = sb.spawn("c", Tag::Untagged, Vec3::new(0.0, 0.0, 2.0));
        sb.set_parent(child, Some(parent));
        assert_eq!(sb.position(child), Some(Vec3::new(0.0, 0.0, 2.0)));

        sb.set_position(parent, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(sb.position(child), Some(Vec3::new(4.0, 0.0, 2.0)));

        sb.set_local_position(child, Vec3::ZERO);
        assert_eq!(sb.position(child), Some(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_force_modes() {
        let mut sb = Sandbox::new();
        let b = sb.spawn("b", Tag::Ball, Vec3::ZERO);
        sb.add_body(b, 2.0);

        sb.add_force(b, Vec3::new(0.0, 0.0, 4.0), ForceMode::Impulse);
        assert_eq!(sb.velocity(b), Some(Vec3::new(0.0, 0.0, 2.0)));

        sb.add_force(b, Vec3::new(0.0, 0.0, 1.0), ForceMode::VelocityChange);
        assert_eq!(sb.velocity(b), Some(Vec3::new(0.0, 0.0, 3.0)));

        sb.add_force(b, Vec3::new(0.0, 0.0, 10.0), ForceMode::Acceleration);
        sb.step(0.5);
        assert_eq!(sb.velocity(b), Some(Vec3::new(0.0, 0.0, 8.0)));
        assert_eq!(sb.forces().len(), 3);
    }

    #[test]
    fn test_region_enter_stay_exit() {
        let mut sb = Sandbox::new();
        let region = sb.spawn("g", Tag::Gutter, Vec3::new(0.0, 0.0, 5.0));
        sb.add_region(region, Vec3::new(1.0, 1.0, 1.0));
        let b = sb.spawn("b", Tag::Ball, Vec3::ZERO);
        sb.add_body(b, 1.0);
        sb.set_velocity(b, Vec3::new(0.0, 0.0, 4.0));

        let phases: Vec<Vec<OverlapPhase>> = (0..4)
            .map(|_| sb.step(0.5).iter().map(|o| o.phase).collect())
            .collect();
        // z = 2, 4, 6, 8
        assert!(phases[0].is_empty());
        assert_eq!(phases[1], vec![OverlapPhase::Enter]);
        assert_eq!(phases[2], vec![OverlapPhase::Stay]);
        assert_eq!(phases[3], vec![OverlapPhase::Exit]);
    }

    #[test]
    fn test_toppled_pin_reports_ground_once() {
        let mut sb = Sandbox::new();
        let prefab = sb.register_prefab(template());
        let root = sb.instantiate(prefab, Vec3::ZERO, Tag::PinSet).unwrap();
        sb.end_frame();
        let pin = sb.fall_sensors(root)[0];

        sb.topple(pin);
        sb.topple(pin);
        let first = sb.step(0.1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].other_tag, Tag::Ground);
        assert!(sb.step(0.1).is_empty());
    }
}
