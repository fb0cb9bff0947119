//! Observer lists for input and pin notifications
//!
//! A [`Signal`] holds listener handles in subscription order. Emitting does
//! not call anything: it returns the listeners to notify, and the owner
//! routes each one. This keeps every component's `&mut self` borrow local to
//! the call that needs it.

/// Ordered, duplicate-free list of listeners for one signal
#[derive(Debug, Clone)]
pub struct Signal<L> {
    listeners: Vec<L>,
}

impl<L> Default for Signal<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> Signal<L> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners to notify, in subscription order
    pub fn emit(&self) -> impl Iterator<Item = &L> {
        self.listeners.iter()
    }
}

impl<L: PartialEq> Signal<L> {
    /// Add a listener. Returns false if it was already subscribed.
    pub fn subscribe(&mut self, listener: L) -> bool {
        if self.listeners.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, listener: &L) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l != listener);
        self.listeners.len() != before
    }

    pub fn is_subscribed(&self, listener: &L) -> bool {
        self.listeners.contains(listener)
    }
}

/// Who listens to the player's input signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputListener {
    Ball,
    Coordinator,
}

/// The two input signals the lane reacts to
#[derive(Debug, Clone, Default)]
pub struct InputSignals {
    /// "launch pressed"
    pub launch: Signal<InputListener>,
    /// "reset pressed"
    pub reset: Signal<InputListener>,
}

impl InputSignals {
    pub fn new() -> Self {
        Self::default()
    }
}
