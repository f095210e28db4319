//! Sparse update keys and deferred level actions.
//!
//! [`ObjectAspect`] and [`PrefabAspect`] are the closed sets of "what changed"
//! keys accepted by the level's sparse update entry points. Each key touches
//! only the runtime state it implicates. [`LevelAction`] wraps those updates
//! (and a few structural edits) so they can be queued on an
//! [`ActionQueue`](crate::resources::actionqueue::ActionQueue) and applied
//! between ticks.

use crate::components::object::LevelObject;

/// Which aspect of a level object (or background) changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectAspect {
    /// Recompute start and kill times and re-sort.
    StartTime,
    /// Recompute the kill time and re-sort.
    Autokill,
    /// The parent id changed: rebuild the chain of the object and its subtree.
    Parent,
    /// Per-axis parent settings changed.
    ParentSettings,
    /// Rebuild the chain of the object and its subtree from scratch.
    ParentChain,
    /// Rebuild the visual payload only.
    Shape,
    /// Recache sequences; kill time follows if it depends on them.
    Keyframes,
    /// Detach and reattach the modifier bundle only.
    Modifiers,
    Hide,
    Selectable,
    Depth,
}

/// Which aspect of a prefab instance changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefabAspect {
    /// Start time, speed, or repeat settings: collapse and re-stamp.
    Timing,
    /// Lifetime ceiling: collapse and re-stamp.
    Autokill,
    /// External parent of the base copies.
    Parent,
    /// Static transform applied to the base copies.
    Transform,
    /// Detach and reattach the instance's own modifier bundle.
    Modifiers,
}

/// A level mutation that can be deferred to a safe point.
#[derive(Clone, Debug, PartialEq)]
pub enum LevelAction {
    UpdateObject { id: String, aspect: ObjectAspect },
    UpdateBackground { id: String, aspect: ObjectAspect },
    UpdatePrefabObject { id: String, aspect: PrefabAspect },
    AddObject(LevelObject),
    DeleteObject(String),
    DeleteBackground(String),
    ExpandPrefab(String),
    CollapsePrefab(String),
    /// Force a global re-sort and state recalculation.
    Sort,
}
