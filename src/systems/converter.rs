//! Object converter: declarative records to runtime nodes.
//!
//! The converter is the only place where [`RuntimeNode`]s are built and torn
//! down. It also owns the derived data the level needs every tick:
//!
//! - cached [`SequenceCollection`]s per object and background;
//! - resolved [`ParentChain`]s per object.
//!
//! Whether a record produces a node at all is decided here too: structural
//! [`ObjectKind::Empty`] objects never get a visual node, and records without
//! modifiers never get a modifier node. Callers do not special-case kinds.
//!
//! # Data inconsistencies
//!
//! Dangling parents, parent cycles and dangling `WithObject` kill references
//! are recovered locally (parentless, or killed never) and logged with
//! `warn!`. A visual that fails to build leaves the node scheduled without a
//! visual.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;

use crate::components::background::BackgroundObject;
use crate::components::modifier::{ModifierBundle, ModifierOwner};
use crate::components::object::{AutoKill, LevelObject, ObjectKind, ParentRef};
use crate::components::parentlink::{AxisLink, CameraLink, LinkSource, ParentChain, ParentLink};
use crate::components::runtimenode::{NodePayload, RuntimeNode};
use crate::components::sequence::SequenceCollection;
use crate::resources::datastore::{BackgroundKey, DataStore, ObjectKey, PrefabObjectKey};
use crate::resources::modifiers::ModifierRuntime;
use crate::resources::visuals::{VisualFactory, VisualHandle, VisualSource};

/// Nesting guard for walks over prefab instances.
const MAX_INSTANCE_WALK: usize = 64;

#[derive(Debug, Default)]
pub struct ObjectConverter {
    sequences: SecondaryMap<ObjectKey, SequenceCollection>,
    background_sequences: SecondaryMap<BackgroundKey, SequenceCollection>,
    chains: SecondaryMap<ObjectKey, ParentChain>,
    song_length: Option<f32>,
}

impl ObjectConverter {
    pub fn new(song_length: Option<f32>) -> Self {
        ObjectConverter {
            song_length,
            ..Default::default()
        }
    }

    pub fn song_length(&self) -> Option<f32> {
        self.song_length
    }

    pub fn set_song_length(&mut self, song_length: Option<f32>) {
        self.song_length = song_length;
    }

    /// Drop every cached sequence and chain.
    pub fn clear(&mut self) {
        self.sequences.clear();
        self.background_sequences.clear();
        self.chains.clear();
    }

    // ==================== SEQUENCES ====================

    /// Build the sequence collection of an object. Pure: the same keyframes
    /// always produce an identical collection.
    pub fn cache_sequence(object: &LevelObject) -> SequenceCollection {
        SequenceCollection::from_keyframes(&object.keyframes)
    }

    pub fn cache_background_sequence(background: &BackgroundObject) -> SequenceCollection {
        SequenceCollection::from_keyframes(&background.keyframes)
    }

    /// (Re)cache the sequences of an object.
    pub fn cache_object(&mut self, store: &DataStore, key: ObjectKey) {
        if let Some(object) = store.object(key) {
            self.sequences.insert(key, Self::cache_sequence(object));
        }
    }

    pub fn cache_background(&mut self, store: &DataStore, key: BackgroundKey) {
        if let Some(background) = store.background(key) {
            self.background_sequences.insert(key, Self::cache_background_sequence(background));
        }
    }

    pub fn sequences(&self, key: ObjectKey) -> Option<&SequenceCollection> {
        self.sequences.get(key)
    }

    pub fn background_sequences(&self, key: BackgroundKey) -> Option<&SequenceCollection> {
        self.background_sequences.get(key)
    }

    /// Forget everything derived from an object.
    pub fn evict_object(&mut self, key: ObjectKey) {
        self.sequences.remove(key);
        self.chains.remove(key);
    }

    pub fn evict_background(&mut self, key: BackgroundKey) {
        self.background_sequences.remove(key);
    }

    // ==================== TIMING ====================

    fn sequence_length(&self, key: ObjectKey, object: &LevelObject) -> f32 {
        match self.sequences.get(key) {
            Some(seq) => seq.length(),
            None => Self::cache_sequence(object).length(),
        }
    }

    /// Kill time of an object, following `WithObject` references.
    pub fn object_kill_time(&self, store: &DataStore, key: ObjectKey) -> f32 {
        let mut visited = FxHashSet::default();
        self.resolve_kill(store, key, &mut visited)
    }

    fn resolve_kill(
        &self,
        store: &DataStore,
        key: ObjectKey,
        visited: &mut FxHashSet<ObjectKey>,
    ) -> f32 {
        let Some(object) = store.object(key) else {
            return f32::INFINITY;
        };
        visited.insert(key);
        let kill = match &object.autokill {
            AutoKill::WithObject { id } => match store.object_key(id) {
                Some(target) if !visited.contains(&target) => {
                    self.resolve_kill(store, target, visited)
                }
                Some(_) => {
                    warn!(
                        "Object '{}' is killed with '{}' in a cycle, keeping it alive",
                        object.id, id
                    );
                    f32::INFINITY
                }
                None => {
                    warn!(
                        "Object '{}' is killed with missing object '{}', keeping it alive",
                        object.id, id
                    );
                    f32::INFINITY
                }
            },
            rule => rule.kill_time(
                object.start_time,
                self.sequence_length(key, object),
                self.song_length,
            ),
        };
        kill.min(object.kill_ceiling.unwrap_or(f32::INFINITY))
    }

    /// `(start, kill)` window of an object's visual node.
    pub fn object_window(&self, store: &DataStore, key: ObjectKey) -> Option<(f32, f32)> {
        let object = store.object(key)?;
        Some((object.start_time, self.object_kill_time(store, key)))
    }

    pub fn background_window(&self, store: &DataStore, key: BackgroundKey) -> Option<(f32, f32)> {
        let background = store.background(key)?;
        let kill = match &background.autokill {
            AutoKill::WithObject { id } => match store.object_key(id) {
                Some(target) => self.object_kill_time(store, target),
                None => {
                    warn!(
                        "Background '{}' is killed with missing object '{}', keeping it alive",
                        background.id, id
                    );
                    f32::INFINITY
                }
            },
            rule => {
                let length = match self.background_sequences.get(key) {
                    Some(seq) => seq.length(),
                    None => Self::cache_background_sequence(background).length(),
                };
                rule.kill_time(background.start_time, length, self.song_length)
            }
        };
        let kill = kill.min(background.kill_ceiling.unwrap_or(f32::INFINITY));
        Some((background.start_time, kill))
    }

    /// `(start, kill)` window of a prefab instance.
    ///
    /// A regular instance lives until its last copy dies; any other policy
    /// uses its ceiling.
    pub fn prefab_window(&self, store: &DataStore, key: PrefabObjectKey) -> Option<(f32, f32)> {
        self.prefab_window_at(store, key, 0)
    }

    fn prefab_window_at(
        &self,
        store: &DataStore,
        key: PrefabObjectKey,
        depth: usize,
    ) -> Option<(f32, f32)> {
        let po = store.prefab_object(key)?;
        let offset = store
            .prefab_by_id(&po.prefab_id)
            .map(|p| p.offset)
            .unwrap_or(0.0);
        let start = po.start_time;
        if let Some(ceiling) = po.autokill.ceiling(po.start_time, offset) {
            return Some((start, ceiling));
        }
        let mut kill = start;
        for id in po.expanded.iter() {
            let copy_kill = if let Some(k) = store.object_key(id) {
                self.object_kill_time(store, k)
            } else if let Some(k) = store.background_key(id) {
                self.background_window(store, k).map_or(start, |(_, kill)| kill)
            } else if let Some(k) = store.prefab_object_key(id) {
                if depth >= MAX_INSTANCE_WALK {
                    continue;
                }
                self.prefab_window_at(store, k, depth + 1)
                    .map_or(start, |(_, kill)| kill)
            } else {
                continue;
            };
            kill = kill.max(copy_kill);
        }
        Some((start, kill))
    }

    /// Window of a modifier node: the owner's, unless the bundle ignores it.
    pub fn modifier_window(bundle: &ModifierBundle, owner: (f32, f32)) -> (f32, f32) {
        if bundle.ignore_lifespan {
            (0.0, f32::INFINITY)
        } else {
            owner
        }
    }

    // ==================== NODES ====================

    /// Build a visual, logging instead of failing.
    pub fn create_visual<V: VisualFactory>(
        visuals: &mut V,
        source: VisualSource<'_>,
    ) -> Option<VisualHandle> {
        match visuals.create(source) {
            Ok(handle) => {
                match source {
                    VisualSource::Object(object) => {
                        visuals.set_depth(handle, object.depth);
                        if object.hidden {
                            visuals.set_hidden(handle, true);
                        }
                        if !object.selectable {
                            visuals.set_selectable(handle, false);
                        }
                    }
                    VisualSource::Background(background) => {
                        visuals.set_depth(handle, background.depth);
                        if background.hidden {
                            visuals.set_hidden(handle, true);
                        }
                    }
                }
                Some(handle)
            }
            Err(err) => {
                warn!(
                    "Visual for '{}' could not be built, scheduling without it: {}",
                    source.id(),
                    err
                );
                None
            }
        }
    }

    /// Visual node of an object, or `None` for objects that carry no visual.
    pub fn to_runtime_node<V: VisualFactory>(
        &self,
        store: &DataStore,
        key: ObjectKey,
        visuals: &mut V,
    ) -> Option<RuntimeNode<ObjectKey>> {
        let object = store.object(key)?;
        if object.kind == ObjectKind::Empty {
            return None;
        }
        let (start, kill) = self.object_window(store, key)?;
        let handle = Self::create_visual(visuals, VisualSource::Object(object));
        Some(RuntimeNode::new(
            key,
            object.id.as_str(),
            start,
            kill,
            NodePayload::Visual { handle },
        ))
    }

    /// Modifier node of an object, or `None` when it has no modifiers.
    pub fn to_modifier_node<M: ModifierRuntime>(
        &self,
        store: &DataStore,
        key: ObjectKey,
        modifiers: &mut M,
    ) -> Option<RuntimeNode<ObjectKey>> {
        let object = store.object(key)?;
        if object.modifiers.is_empty() {
            return None;
        }
        let owner = self.object_window(store, key)?;
        let (start, kill) = Self::modifier_window(&object.modifiers, owner);
        let bundle = modifiers.attach(
            &ModifierOwner::Object(object.id.clone()),
            &object.modifiers.modifiers,
        );
        Some(RuntimeNode::new(
            key,
            object.id.as_str(),
            start,
            kill,
            NodePayload::Modifiers { bundle },
        ))
    }

    pub fn to_background_node<V: VisualFactory>(
        &self,
        store: &DataStore,
        key: BackgroundKey,
        visuals: &mut V,
    ) -> Option<RuntimeNode<BackgroundKey>> {
        let background = store.background(key)?;
        let (start, kill) = self.background_window(store, key)?;
        let handle = Self::create_visual(visuals, VisualSource::Background(background));
        Some(RuntimeNode::new(
            key,
            background.id.as_str(),
            start,
            kill,
            NodePayload::Visual { handle },
        ))
    }

    pub fn to_background_modifier_node<M: ModifierRuntime>(
        &self,
        store: &DataStore,
        key: BackgroundKey,
        modifiers: &mut M,
    ) -> Option<RuntimeNode<BackgroundKey>> {
        let background = store.background(key)?;
        if background.modifiers.is_empty() {
            return None;
        }
        let owner = self.background_window(store, key)?;
        let (start, kill) = Self::modifier_window(&background.modifiers, owner);
        let bundle = modifiers.attach(
            &ModifierOwner::Background(background.id.clone()),
            &background.modifiers.modifiers,
        );
        Some(RuntimeNode::new(
            key,
            background.id.as_str(),
            start,
            kill,
            NodePayload::Modifiers { bundle },
        ))
    }

    pub fn to_prefab_node(
        &self,
        store: &DataStore,
        key: PrefabObjectKey,
    ) -> Option<RuntimeNode<PrefabObjectKey>> {
        let po = store.prefab_object(key)?;
        let (start, kill) = self.prefab_window(store, key)?;
        Some(RuntimeNode::new(
            key,
            po.id.as_str(),
            start,
            kill,
            NodePayload::PrefabInstance,
        ))
    }

    pub fn to_prefab_modifier_node<M: ModifierRuntime>(
        &self,
        store: &DataStore,
        key: PrefabObjectKey,
        modifiers: &mut M,
    ) -> Option<RuntimeNode<PrefabObjectKey>> {
        let po = store.prefab_object(key)?;
        if po.modifiers.is_empty() {
            return None;
        }
        let owner = self.prefab_window(store, key)?;
        let (start, kill) = Self::modifier_window(&po.modifiers, owner);
        let bundle = modifiers.attach(
            &ModifierOwner::PrefabObject(po.id.clone()),
            &po.modifiers.modifiers,
        );
        Some(RuntimeNode::new(
            key,
            po.id.as_str(),
            start,
            kill,
            NodePayload::Modifiers { bundle },
        ))
    }

    /// Tear down a node's payload. Active payloads are deactivated first.
    pub fn destroy_node<K: Copy, V: VisualFactory, M: ModifierRuntime>(
        node: RuntimeNode<K>,
        visuals: &mut V,
        modifiers: &mut M,
    ) {
        match node.payload {
            NodePayload::Visual {
                handle: Some(handle),
            } => {
                if node.active {
                    visuals.set_active(handle, false);
                }
                visuals.destroy(handle);
            }
            NodePayload::Modifiers { bundle } => {
                if node.active {
                    modifiers.deactivate(bundle);
                }
                modifiers.detach(bundle);
            }
            NodePayload::Visual { handle: None } | NodePayload::PrefabInstance => {}
        }
        debug!("node '{}' destroyed", node.id);
    }

    // ==================== PARENT CHAINS ====================

    pub fn chain(&self, key: ObjectKey) -> Option<&ParentChain> {
        self.chains.get(key)
    }

    /// Walk parent references upward from `key`.
    ///
    /// - A dangling parent ends the walk; that object is parentless.
    /// - A cycle through `key` makes `key` parentless; a cycle further up
    ///   ends the walk where it closes.
    /// - Reaching the camera records the axis settings of the object whose
    ///   parent is the camera.
    /// - Base copies of a prefab instance with a non-identity transform get a
    ///   static link for it above themselves.
    pub fn build_parent_chain(&self, store: &DataStore, key: ObjectKey) -> ParentChain {
        let mut chain = ParentChain::default();
        let Some(start) = store.object(key) else {
            return chain;
        };
        let mut visited = FxHashSet::default();
        visited.insert(key);
        let mut current = start;

        loop {
            push_instance_links(store, current, &mut chain);
            match &current.parent {
                ParentRef::None => break,
                ParentRef::Camera => {
                    chain.camera = Some(CameraLink::from(&current.parent_settings));
                    break;
                }
                ParentRef::Object(parent_id) => {
                    let Some(parent_key) = store.object_key(parent_id) else {
                        warn!(
                            "Object '{}' has dangling parent '{}', treating it as parentless",
                            current.id, parent_id
                        );
                        break;
                    };
                    if !visited.insert(parent_key) {
                        warn!(
                            "Parent cycle through '{}' reached from '{}'",
                            parent_id, start.id
                        );
                        if parent_key == key {
                            return ParentChain::default();
                        }
                        break;
                    }
                    let Some(parent) = store.object(parent_key) else {
                        break;
                    };
                    chain.links.push(ParentLink::from_settings(
                        LinkSource::Object(parent_key),
                        &current.parent_settings,
                        current.start_time,
                    ));
                    current = parent;
                }
            }
        }
        chain
    }

    pub fn rebuild_chain(&mut self, store: &DataStore, key: ObjectKey) {
        let chain = self.build_parent_chain(store, key);
        self.chains.insert(key, chain);
    }

    /// Rebuild the chain of `root` and of every object whose parent walk
    /// passes through it. Returns the rebuilt keys, `root` first.
    pub fn rebuild_subtree(&mut self, store: &DataStore, root: ObjectKey) -> Vec<ObjectKey> {
        let mut keys = vec![root];
        keys.extend(store.descendants(root));
        for &key in keys.iter() {
            self.rebuild_chain(store, key);
        }
        debug!("rebuilt {} parent chains", keys.len());
        keys
    }

    /// Rebuild every chain that mentions one of `removed`.
    pub fn repair_chains(&mut self, store: &DataStore, removed: &[ObjectKey]) -> usize {
        if removed.is_empty() {
            return 0;
        }
        let stale: Vec<ObjectKey> = self
            .chains
            .iter()
            .filter(|(k, chain)| {
                store.object(*k).is_some() && removed.iter().any(|r| chain.contains(*r))
            })
            .map(|(k, _)| k)
            .collect();
        for &key in stale.iter() {
            self.rebuild_chain(store, key);
        }
        stale.len()
    }
}

/// Static links for the prefab instances `object` is a base copy of.
fn push_instance_links(store: &DataStore, object: &LevelObject, chain: &mut ParentChain) {
    let mut instance = object.prefab_instance_id.as_deref();
    let mut internal = object
        .parent
        .object_id()
        .and_then(|id| store.object_by_id(id))
        .is_some_and(|p| instance.is_some() && p.prefab_instance_id.as_deref() == instance);

    let mut steps = 0;
    while let Some(instance_id) = instance {
        if internal || steps >= MAX_INSTANCE_WALK {
            break;
        }
        let Some(po) = store
            .prefab_object_key(instance_id)
            .and_then(|k| store.prefab_object(k))
        else {
            break;
        };
        if !po.transform.is_identity() {
            chain.links.push(ParentLink {
                source: LinkSource::Static(po.transform.to_world()),
                position: AxisLink::inherit(),
                scale: AxisLink::inherit(),
                rotation: AxisLink::inherit(),
                desync_time: None,
            });
        }
        let outer = po.prefab_instance_id.as_deref();
        internal = po
            .parent
            .object_id()
            .and_then(|id| store.object_by_id(id))
            .is_some_and(|p| outer.is_some() && p.prefab_instance_id.as_deref() == outer);
        instance = outer;
        steps += 1;
    }
}
