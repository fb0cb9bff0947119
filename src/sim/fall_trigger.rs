//! One-shot pin fall sensor

use crate::host::{EntityId, Tag};
use crate::signal::Signal;

/// Listener handle bound by the coordinator: "score this for pin-set `pin_set`"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreListener {
    pub pin_set: EntityId,
}

/// Per-pin sensor that latches the first time the pin touches the ground
#[derive(Debug, Clone)]
pub struct FallTrigger {
    pin: EntityId,
    name: String,
    has_fallen: bool,
    on_fall: Signal<ScoreListener>,
}

impl FallTrigger {
    pub fn new(pin: EntityId, name: impl Into<String>) -> Self {
        Self {
            pin,
            name: name.into(),
            has_fallen: false,
            on_fall: Signal::new(),
        }
    }

    pub fn pin(&self) -> EntityId {
        self.pin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_fallen(&self) -> bool {
        self.has_fallen
    }

    pub fn subscribe(&mut self, listener: ScoreListener) -> bool {
        self.on_fall.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, listener: &ScoreListener) -> bool {
        self.on_fall.unsubscribe(listener)
    }

    pub fn clear_listeners(&mut self) {
        self.on_fall.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.on_fall.len()
    }

    /// Feed an overlap. Returns the listeners to notify: empty unless this is
    /// the first touch of the ground.
    pub fn on_overlap(&mut self, other_tag: Tag) -> Vec<ScoreListener> {
        if other_tag != Tag::Ground || self.has_fallen {
            return Vec::new();
        }
        self.has_fallen = true;
        log::info!("{} has fallen.", self.name);
        self.on_fall.emit().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SET: ScoreListener = ScoreListener {
        pin_set: EntityId(7),
    };

    #[test]
    fn test_only_ground_counts() {
        let mut trigger = FallTrigger::new(EntityId(1), "Pin 1");
        trigger.subscribe(SET);

        assert!(trigger.on_overlap(Tag::Ball).is_empty());
        assert!(trigger.on_overlap(Tag::Pin).is_empty());
        assert!(!trigger.has_fallen());

        assert_eq!(trigger.on_overlap(Tag::Ground), vec![SET]);
        assert!(trigger.has_fallen());
    }

    #[test]
    fn test_latches_without_listeners() {
        let mut trigger = FallTrigger::new(EntityId(1), "Pin 1");
        assert!(trigger.on_overlap(Tag::Ground).is_empty());
        assert!(trigger.has_fallen());

        // Binding later does not replay the fall
        trigger.subscribe(SET);
        assert!(trigger.on_overlap(Tag::Ground).is_empty());
    }

    #[test]
    fn test_unsubscribe_and_clear() {
        let mut trigger = FallTrigger::new(EntityId(1), "Pin 1");
        let other = ScoreListener {
            pin_set: EntityId(8),
        };
        trigger.subscribe(SET);
        trigger.subscribe(other);
        assert!(trigger.unsubscribe(&SET));
        assert!(!trigger.unsubscribe(&SET));
        assert_eq!(trigger.listener_count(), 1);

        trigger.clear_listeners();
        assert!(trigger.on_overlap(Tag::Ground).is_empty());
    }

    proptest! {
        #[test]
        fn prop_notifies_at_most_once(touches in proptest::collection::vec(0u8..3, 0..40)) {
            let mut trigger = FallTrigger::new(EntityId(1), "Pin 1");
            trigger.subscribe(SET);
            let tags = [Tag::Ground, Tag::Ball, Tag::Pin];
            let notified: usize = touches
                .iter()
                .map(|t| trigger.on_overlap(tags[*t as usize]).len())
                .sum();
            let touched_ground = touches.contains(&0);
            prop_assert_eq!(notified, usize::from(touched_ground));
        }
    }
}
