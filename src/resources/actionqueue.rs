//! Deferred level actions.
//!
//! Structural mutations requested while a tick is iterating (a modifier
//! deleting an object, an editor re-expanding a prefab) are queued here and
//! applied at a safe point: the pre-tick queue drains at the very start of a
//! tick, the post-tick queue at the very end.

use crate::events::action::LevelAction;

/// FIFO queue of [`LevelAction`]s.
#[derive(Debug, Default)]
pub struct ActionQueue {
    queue: Vec<LevelAction>,
}

impl ActionQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues an action for the next drain.
    pub fn push(&mut self, action: LevelAction) {
        self.queue.push(action);
    }

    /// Returns an iterator over the queued actions.
    pub fn iter(&self) -> impl Iterator<Item = &LevelAction> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear()
    }

    /// Takes all actions from the queue, leaving it empty.
    pub fn take(&mut self) -> Vec<LevelAction> {
        std::mem::take(&mut self.queue)
    }
}
