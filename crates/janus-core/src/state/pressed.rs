// Janus Pressed Key Set
// Keys whose "down" has been forwarded and not yet released

use crate::Key;
use std::collections::BTreeSet;

/// Tracks keys held down on one side of the engine.
///
/// Ordered so that bulk releases come out in a stable order.
#[derive(Debug, Clone, Default)]
pub struct PressedKeyState {
    pressed: BTreeSet<Key>,
}

impl PressedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as pressed; returns false if it already was
    pub fn add(&mut self, key: Key) -> bool {
        self.pressed.insert(key)
    }

    /// Mark a key as released; returns false if it was not pressed
    pub fn remove(&mut self, key: Key) -> bool {
        self.pressed.remove(&key)
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn get_all(&self) -> Vec<Key> {
        self.pressed.iter().copied().collect()
    }

    /// Remove and return every pressed key
    pub fn drain(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.pressed).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}
