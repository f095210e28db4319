//! Node lifecycle notifications.
//!
//! Every activation and deactivation edge delivered by a spawner is recorded
//! as a [`NodeEvent`]. The level keeps the events of the most recent tick so
//! hosts (and tests) can observe exactly what changed and in which order.

/// Direction of a liveness edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeEdge {
    Activated,
    Deactivated,
}

/// Which engine a node lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Objects,
    ObjectModifiers,
    Backgrounds,
    BackgroundModifiers,
    Prefabs,
    PrefabModifiers,
}

impl Category {
    /// Every category, in tick order.
    pub const ALL: [Category; 6] = [
        Category::ObjectModifiers,
        Category::BackgroundModifiers,
        Category::Objects,
        Category::Backgrounds,
        Category::Prefabs,
        Category::PrefabModifiers,
    ];
}

/// One delivered edge.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeEvent {
    pub edge: NodeEdge,
    pub category: Category,
    /// Authored id of the node's source.
    pub id: String,
    /// Clock time the edge was delivered at.
    pub time: f32,
}

impl NodeEvent {
    pub fn is_activation(&self) -> bool {
        self.edge == NodeEdge::Activated
    }
}
