//! Scheduler-owned runtime nodes.
//!
//! A [`RuntimeNode`] wraps one logical thing on the timeline (a drawn object,
//! a background, a modifier bundle or a prefab instance) with its start time,
//! kill time and active flag. Nodes are created only by the object converter
//! and stored only inside a [`Spawner`](crate::systems::spawner::Spawner).

use slotmap::new_key_type;

use crate::resources::modifiers::BundleHandle;
use crate::resources::visuals::VisualHandle;

new_key_type! {
    /// Stable handle of a node inside one spawner.
    pub struct NodeKey;
}

/// What a node carries. One sum type for every payload kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodePayload {
    /// Something drawn. `None` when the visual could not be built; the node is
    /// still scheduled.
    Visual { handle: Option<VisualHandle> },
    /// A modifier bundle registered with the modifier runtime.
    Modifiers { bundle: BundleHandle },
    /// A prefab instance lifetime.
    PrefabInstance,
}

impl NodePayload {
    pub fn visual(&self) -> Option<VisualHandle> {
        match self {
            NodePayload::Visual { handle } => *handle,
            _ => None,
        }
    }

    pub fn bundle(&self) -> Option<BundleHandle> {
        match self {
            NodePayload::Modifiers { bundle } => Some(*bundle),
            _ => None,
        }
    }
}

/// One scheduled unit. `K` is the key of the declarative source in the data
/// store.
#[derive(Clone, Debug)]
pub struct RuntimeNode<K> {
    pub(crate) source: K,
    pub(crate) id: String,
    pub(crate) start_time: f32,
    pub(crate) kill_time: f32,
    pub(crate) active: bool,
    pub(crate) seq: u64,
    pub(crate) payload: NodePayload,
}

impl<K: Copy> RuntimeNode<K> {
    pub(crate) fn new(
        source: K,
        id: impl Into<String>,
        start_time: f32,
        kill_time: f32,
        payload: NodePayload,
    ) -> Self {
        RuntimeNode {
            source,
            id: id.into(),
            start_time,
            kill_time,
            active: false,
            seq: 0,
            payload,
        }
    }

    pub fn source(&self) -> K {
        self.source
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn kill_time(&self) -> f32 {
        self.kill_time
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Whether the node should be alive at `time`.
    pub fn alive_at(&self, time: f32) -> bool {
        self.start_time <= time && time < self.kill_time
    }
}
