//! Time-windowed activation engine.
//!
//! A [`Spawner`] owns the [`RuntimeNode`]s of one category and keeps two
//! orderings of them: the activation list sorted by start time and the
//! deactivation list sorted by kill time. Two cursors remember how far each
//! list has been consumed.
//!
//! # Tick policy
//!
//! - Clock moved forward (or stayed) and nothing changed structurally: scan
//!   forward from the cursors, activating nodes whose start time has been
//!   reached and deactivating nodes whose kill time has been reached. Each
//!   edge is delivered once.
//! - Clock moved backward, or the lists were mutated since the last tick:
//!   [`Spawner::recalculate_states`] re-sorts both lists and reconciles every
//!   node against `start <= time < kill` from scratch.
//!
//! After every tick, a node is active exactly when `start <= time < kill`.
//!
//! # Ordering
//!
//! Nodes with equal times are ordered by source id, then by insertion order,
//! so activation order is deterministic for a given level.
//!
//! [`ObjectEngine`] is the thin per-category driver that maps declarative
//! source keys onto spawner nodes.

use std::cmp::Ordering;

use log::{trace, warn};
use slotmap::{Key, SecondaryMap, SlotMap};

use crate::components::runtimenode::{NodeKey, NodePayload, RuntimeNode};
use crate::events::node::{Category, NodeEdge};

/// Sorted-list activation engine for one category of nodes.
#[derive(Debug)]
pub struct Spawner<K: Key> {
    nodes: SlotMap<NodeKey, RuntimeNode<K>>,
    activate_list: Vec<NodeKey>,
    deactivate_list: Vec<NodeKey>,
    activate_index: usize,
    deactivate_index: usize,
    current_time: f32,
    dirty: bool,
    next_seq: u64,
}

impl<K: Key> Default for Spawner<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn by_start<K: Key>(a: &RuntimeNode<K>, b: &RuntimeNode<K>) -> Ordering {
    a.start_time
        .total_cmp(&b.start_time)
        .then_with(|| a.id.cmp(&b.id))
        .then(a.seq.cmp(&b.seq))
}

fn by_kill<K: Key>(a: &RuntimeNode<K>, b: &RuntimeNode<K>) -> Ordering {
    a.kill_time
        .total_cmp(&b.kill_time)
        .then_with(|| a.id.cmp(&b.id))
        .then(a.seq.cmp(&b.seq))
}

/// Clamp malformed timing. Returns the (start, kill) pair to store.
fn sanitize_times(id: &str, start: f32, kill: f32) -> (f32, f32) {
    let start = if start.is_nan() {
        warn!("Node '{}' has a NaN start time, using 0", id);
        0.0
    } else {
        start
    };
    // also catches a NaN kill time
    if !(kill >= start) {
        warn!(
            "Node '{}' has kill time {} before start time {}, clamping",
            id, kill, start
        );
        (start, start)
    } else {
        (start, kill)
    }
}

impl<K: Key> Spawner<K> {
    pub fn new() -> Self {
        Spawner {
            nodes: SlotMap::with_key(),
            activate_list: Vec::new(),
            deactivate_list: Vec::new(),
            activate_index: 0,
            deactivate_index: 0,
            current_time: f32::NEG_INFINITY,
            dirty: true,
            next_seq: 0,
        }
    }

    /// Add a node. It starts inactive; the next tick reconciles it.
    pub fn insert(&mut self, mut node: RuntimeNode<K>) -> NodeKey {
        let (start, kill) = sanitize_times(&node.id, node.start_time, node.kill_time);
        node.start_time = start;
        node.kill_time = kill;
        node.active = false;
        node.seq = self.next_seq;
        self.next_seq += 1;
        let key = self.nodes.insert(node);
        self.activate_list.push(key);
        self.deactivate_list.push(key);
        self.dirty = true;
        key
    }

    /// Remove a node from both lists and return it. The caller is responsible
    /// for tearing down the payload of an active node.
    pub fn remove(&mut self, key: NodeKey) -> Option<RuntimeNode<K>> {
        let node = self.nodes.remove(key)?;
        self.activate_list.retain(|&k| k != key);
        self.deactivate_list.retain(|&k| k != key);
        self.dirty = true;
        Some(node)
    }

    /// Change a node's window. Returns false for unknown keys.
    pub fn set_times(&mut self, key: NodeKey, start: f32, kill: f32) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        let (start, kill) = sanitize_times(&node.id, start, kill);
        if node.start_time != start || node.kill_time != kill {
            node.start_time = start;
            node.kill_time = kill;
            self.dirty = true;
        }
        true
    }

    pub fn set_payload(&mut self, key: NodeKey, payload: NodePayload) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) => {
                node.payload = payload;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: NodeKey) -> Option<&RuntimeNode<K>> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next tick to take the full recalculation path.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Active nodes in activation order.
    pub fn active(&self) -> impl Iterator<Item = (NodeKey, &RuntimeNode<K>)> {
        self.activate_list[..self.activate_index]
            .iter()
            .filter_map(|&k| self.nodes.get(k).map(|n| (k, n)))
            .filter(|(_, n)| n.active)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &RuntimeNode<K>)> {
        self.nodes.iter()
    }

    /// Drop every node and return them, inactive ones included.
    pub fn clear(&mut self) -> Vec<RuntimeNode<K>> {
        self.activate_list.clear();
        self.deactivate_list.clear();
        self.activate_index = 0;
        self.deactivate_index = 0;
        self.dirty = true;
        self.nodes.drain().map(|(_, n)| n).collect()
    }

    /// Re-sort both lists.
    pub fn sort(&mut self) {
        let nodes = &self.nodes;
        self.activate_list.sort_by(|a, b| by_start(&nodes[*a], &nodes[*b]));
        self.deactivate_list.sort_by(|a, b| by_kill(&nodes[*a], &nodes[*b]));
        self.dirty = true;
    }

    /// Advance to `time`, delivering every liveness edge to `on_edge`.
    /// Deactivations are delivered before activations.
    pub fn tick<F>(&mut self, time: f32, mut on_edge: F)
    where
        F: FnMut(NodeEdge, NodeKey, &RuntimeNode<K>),
    {
        if self.dirty || time < self.current_time {
            self.recalculate_states(time, &mut on_edge);
            return;
        }

        while self.deactivate_index < self.deactivate_list.len() {
            let key = self.deactivate_list[self.deactivate_index];
            if let Some(node) = self.nodes.get_mut(key) {
                if node.kill_time > time {
                    break;
                }
                if node.active {
                    node.active = false;
                    trace!("deactivate '{}' at {}", node.id, time);
                    on_edge(NodeEdge::Deactivated, key, node);
                }
            }
            self.deactivate_index += 1;
        }

        while self.activate_index < self.activate_list.len() {
            let key = self.activate_list[self.activate_index];
            if let Some(node) = self.nodes.get_mut(key) {
                if node.start_time > time {
                    break;
                }
                // a node whose whole window was skipped never fires
                if !node.active && time < node.kill_time {
                    node.active = true;
                    trace!("activate '{}' at {}", node.id, time);
                    on_edge(NodeEdge::Activated, key, node);
                }
            }
            self.activate_index += 1;
        }

        self.current_time = time;
    }

    /// Full rescan: re-sort, reconcile every node against `time`, and reset
    /// both cursors. Deactivations are delivered before activations.
    pub fn recalculate_states<F>(&mut self, time: f32, mut on_edge: F)
    where
        F: FnMut(NodeEdge, NodeKey, &RuntimeNode<K>),
    {
        self.sort();

        for &key in self.deactivate_list.iter() {
            if let Some(node) = self.nodes.get_mut(key) {
                if node.active && !node.alive_at(time) {
                    node.active = false;
                    trace!("deactivate '{}' at {} (recalculated)", node.id, time);
                    on_edge(NodeEdge::Deactivated, key, node);
                }
            }
        }
        for &key in self.activate_list.iter() {
            if let Some(node) = self.nodes.get_mut(key) {
                if !node.active && node.alive_at(time) {
                    node.active = true;
                    trace!("activate '{}' at {} (recalculated)", node.id, time);
                    on_edge(NodeEdge::Activated, key, node);
                }
            }
        }

        let nodes = &self.nodes;
        self.activate_index = self
            .activate_list
            .partition_point(|k| nodes.get(*k).is_some_and(|n| n.start_time <= time));
        self.deactivate_index = self
            .deactivate_list
            .partition_point(|k| nodes.get(*k).is_some_and(|n| n.kill_time <= time));
        self.current_time = time;
        self.dirty = false;
    }
}

/// Per-category driver: one spawner plus the source-key index.
#[derive(Debug)]
pub struct ObjectEngine<K: Key> {
    category: Category,
    spawner: Spawner<K>,
    index: SecondaryMap<K, NodeKey>,
}

impl<K: Key> ObjectEngine<K> {
    pub fn new(category: Category) -> Self {
        ObjectEngine {
            category,
            spawner: Spawner::new(),
            index: SecondaryMap::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn spawner(&self) -> &Spawner<K> {
        &self.spawner
    }

    /// Schedule a node. A node already scheduled for the same source is
    /// replaced and returned so its payload can be torn down.
    pub fn insert(&mut self, node: RuntimeNode<K>) -> Option<RuntimeNode<K>> {
        let source = node.source;
        let old = self.remove(source);
        let key = self.spawner.insert(node);
        self.index.insert(source, key);
        old
    }

    pub fn remove(&mut self, source: K) -> Option<RuntimeNode<K>> {
        let key = self.index.remove(source)?;
        self.spawner.remove(key)
    }

    pub fn contains(&self, source: K) -> bool {
        self.index.contains_key(source)
    }

    pub fn node(&self, source: K) -> Option<&RuntimeNode<K>> {
        self.index.get(source).and_then(|&k| self.spawner.get(k))
    }

    pub fn set_times(&mut self, source: K, start: f32, kill: f32) -> bool {
        match self.index.get(source) {
            Some(&key) => self.spawner.set_times(key, start, kill),
            None => false,
        }
    }

    pub fn set_payload(&mut self, source: K, payload: NodePayload) -> bool {
        match self.index.get(source) {
            Some(&key) => self.spawner.set_payload(key, payload),
            None => false,
        }
    }

    /// Feed the current time into the spawner.
    pub fn update<F>(&mut self, time: f32, mut on_edge: F)
    where
        F: FnMut(NodeEdge, &RuntimeNode<K>),
    {
        self.spawner.tick(time, |edge, _, node| on_edge(edge, node));
    }

    /// Force a re-sort and full recalculation at `time`.
    pub fn recalculate<F>(&mut self, time: f32, mut on_edge: F)
    where
        F: FnMut(NodeEdge, &RuntimeNode<K>),
    {
        self.spawner
            .recalculate_states(time, |edge, _, node| on_edge(edge, node));
    }

    pub fn mark_dirty(&mut self) {
        self.spawner.mark_dirty();
    }

    /// Sources of the active nodes, in activation order.
    pub fn active_sources(&self) -> Vec<K> {
        self.spawner.active().map(|(_, n)| n.source).collect()
    }

    /// Active nodes in activation order.
    pub fn active(&self) -> impl Iterator<Item = &RuntimeNode<K>> {
        self.spawner.active().map(|(_, n)| n)
    }

    pub fn len(&self) -> usize {
        self.spawner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawner.is_empty()
    }

    pub fn clear(&mut self) -> Vec<RuntimeNode<K>> {
        self.index.clear();
        self.spawner.clear()
    }
}
