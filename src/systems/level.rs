//! Level orchestrator.
//!
//! [`LevelContext`] owns everything a running level needs: the data store,
//! the object converter, the prefab expander, one [`ObjectEngine`] per node
//! category, the two deferred action queues and the collaborators that draw
//! visuals and run modifiers. There is no global "current level"; a host
//! creates a context, calls [`LevelContext::init`], and ticks it.
//!
//! # Tick order
//!
//! Each phase completes before the next starts:
//!
//! 1. drain the pre-tick action queue
//! 2. advance the object-modifier engine, then tick its active bundles
//! 3. advance the background-modifier engine, then tick its active bundles
//! 4. advance the object engine, then push world transforms to active visuals
//! 5. advance the background engine, then push their transforms
//! 6. advance the prefab engine, then the prefab-modifier engine and tick it
//! 7. drain the post-tick action queue
//!
//! Modifiers never mutate the level directly; they push [`LevelAction`]s on
//! the post-tick queue through [`ModifierTick::actions`].

use log::{debug, info, warn};
use slotmap::Key;

use crate::components::background::BackgroundObject;
use crate::components::object::{AutoKill, LevelObject};
use crate::components::prefab::PrefabObject;
use crate::components::runtimenode::{NodePayload, RuntimeNode};
use crate::components::transform::WorldTransform;
use crate::error::LevelError;
use crate::events::action::LevelAction;
use crate::events::node::{Category, NodeEdge, NodeEvent};
use crate::resources::actionqueue::ActionQueue;
use crate::resources::datastore::{BackgroundKey, DataStore, ObjectKey, PrefabObjectKey};
use crate::resources::levelconfig::LevelConfig;
use crate::resources::modifiers::{ModifierRuntime, ModifierTick};
use crate::resources::spectrum::SpectrumReader;
use crate::resources::visuals::VisualFactory;
use crate::resources::worldtime::Clock;
use crate::systems::converter::ObjectConverter;
use crate::systems::prefab::{PrefabExpander, PrefabKeys};
use crate::systems::propagate_transforms::{background_world_transform, object_world_transform};
use crate::systems::spawner::ObjectEngine;

/// Guard for walks up nested prefab instances.
const MAX_INSTANCE_DEPTH: usize = 64;

/// Collaborators that receive liveness edges.
struct EdgeSink<'a, V, M> {
    visuals: &'a mut V,
    modifiers: &'a mut M,
    events: &'a mut Vec<NodeEvent>,
}

impl<V: VisualFactory, M: ModifierRuntime> EdgeSink<'_, V, M> {
    /// Forward one edge to the payload's collaborator and record it.
    fn deliver<K: Copy>(
        &mut self,
        category: Category,
        time: f32,
        edge: NodeEdge,
        node: &RuntimeNode<K>,
    ) {
        let active = edge == NodeEdge::Activated;
        match node.payload() {
            NodePayload::Visual {
                handle: Some(handle),
            } => self.visuals.set_active(*handle, active),
            NodePayload::Modifiers { bundle } => {
                if active {
                    self.modifiers.activate(*bundle);
                } else {
                    self.modifiers.deactivate(*bundle);
                }
            }
            NodePayload::Visual { handle: None } | NodePayload::PrefabInstance => {}
        }
        self.events.push(NodeEvent {
            edge,
            category,
            id: node.id().to_string(),
            time,
        });
    }

    /// Advance an engine to `time`, or fully reconcile it when `full`.
    fn step<K: Key>(&mut self, engine: &mut ObjectEngine<K>, time: f32, full: bool) {
        let category = engine.category();
        let on_edge =
            |edge: NodeEdge, node: &RuntimeNode<K>| self.deliver(category, time, edge, node);
        if full {
            engine.recalculate(time, on_edge);
        } else {
            engine.update(time, on_edge);
        }
    }
}

fn tick_bundles<K: Key, M: ModifierRuntime>(
    engine: &ObjectEngine<K>,
    modifiers: &mut M,
    ctx: &mut ModifierTick<'_>,
) {
    for node in engine.active() {
        if let Some(bundle) = node.payload().bundle() {
            modifiers.tick(bundle, ctx);
        }
    }
}

/// A running level.
pub struct LevelContext<V: VisualFactory, M: ModifierRuntime> {
    pub(crate) config: LevelConfig,
    pub(crate) store: DataStore,
    pub(crate) converter: ObjectConverter,
    pub(crate) expander: PrefabExpander,
    pub(crate) objects: ObjectEngine<ObjectKey>,
    pub(crate) object_modifiers: ObjectEngine<ObjectKey>,
    pub(crate) backgrounds: ObjectEngine<BackgroundKey>,
    pub(crate) background_modifiers: ObjectEngine<BackgroundKey>,
    pub(crate) prefabs: ObjectEngine<PrefabObjectKey>,
    pub(crate) prefab_modifiers: ObjectEngine<PrefabObjectKey>,
    pub(crate) visuals: V,
    pub(crate) modifiers: M,
    pre_tick: ActionQueue,
    post_tick: ActionQueue,
    pub(crate) events: Vec<NodeEvent>,
    spectrum: Option<SpectrumReader>,
    camera: WorldTransform,
    pub(crate) time: f32,
    initialized: bool,
}

impl<V: VisualFactory, M: ModifierRuntime> LevelContext<V, M> {
    /// Wrap a data store. Nothing is scheduled until [`LevelContext::init`].
    pub fn new(store: DataStore, config: LevelConfig, visuals: V, modifiers: M) -> Self {
        LevelContext {
            converter: ObjectConverter::new(config.song_length),
            expander: PrefabExpander::new(config.seed, config.max_prefab_depth),
            config,
            store,
            objects: ObjectEngine::new(Category::Objects),
            object_modifiers: ObjectEngine::new(Category::ObjectModifiers),
            backgrounds: ObjectEngine::new(Category::Backgrounds),
            background_modifiers: ObjectEngine::new(Category::BackgroundModifiers),
            prefabs: ObjectEngine::new(Category::Prefabs),
            prefab_modifiers: ObjectEngine::new(Category::PrefabModifiers),
            visuals,
            modifiers,
            pre_tick: ActionQueue::new(),
            post_tick: ActionQueue::new(),
            events: Vec::new(),
            spectrum: None,
            camera: WorldTransform::default(),
            time: 0.0,
            initialized: false,
        }
    }

    // ==================== LIFECYCLE ====================

    /// Expand every top-level prefab instance, cache sequences, build parent
    /// chains and schedule a node for every record.
    pub fn init(&mut self) {
        if self.initialized {
            debug!("level already initialized");
            return;
        }
        let top_level: Vec<PrefabObjectKey> = self
            .store
            .prefab_objects()
            .filter(|(_, po)| po.prefab_instance_id.is_none() && !po.is_expanded())
            .map(|(k, _)| k)
            .collect();
        for key in top_level {
            self.expander.expand(&mut self.store, key);
        }

        let object_keys = self.store.object_keys();
        let background_keys = self.store.background_keys();
        for &key in object_keys.iter() {
            self.converter.cache_object(&self.store, key);
        }
        for &key in background_keys.iter() {
            self.converter.cache_background(&self.store, key);
        }
        for &key in object_keys.iter() {
            self.converter.rebuild_chain(&self.store, key);
        }
        for &key in object_keys.iter() {
            self.spawn_object_nodes(key);
        }
        for &key in background_keys.iter() {
            self.spawn_background_nodes(key);
        }
        for key in self.store.prefab_object_keys() {
            self.spawn_prefab_nodes(key);
        }

        self.initialized = true;
        info!(
            "level initialized: {} objects, {} backgrounds, {} prefab instances",
            self.objects.len(),
            self.backgrounds.len(),
            self.prefabs.len()
        );
    }

    /// Tear down every runtime node. The data store is left as is.
    pub fn clear(&mut self) {
        for node in self.objects.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        for node in self.object_modifiers.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        for node in self.backgrounds.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        for node in self.background_modifiers.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        for node in self.prefabs.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        for node in self.prefab_modifiers.clear() {
            ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
        }
        self.converter.clear();
        self.pre_tick.clear();
        self.post_tick.clear();
        self.events.clear();
        self.initialized = false;
        info!("level cleared");
    }

    /// Clear and initialize again from the current data store.
    pub fn reinit(&mut self) {
        self.clear();
        self.init();
    }

    /// Recompute every window from the data store, re-sort every engine and
    /// reconcile it against the last tick time. Used after bulk edits.
    pub fn sort(&mut self) {
        self.refresh_all_times();
        let time = self.time;
        for category in Category::ALL {
            self.step(category, time, true);
        }
        debug!("level sorted at {}", time);
    }

    /// Advance (or fully reconcile) the engine of one category.
    fn step(&mut self, category: Category, time: f32, full: bool) {
        let mut sink = EdgeSink {
            visuals: &mut self.visuals,
            modifiers: &mut self.modifiers,
            events: &mut self.events,
        };
        match category {
            Category::Objects => sink.step(&mut self.objects, time, full),
            Category::ObjectModifiers => sink.step(&mut self.object_modifiers, time, full),
            Category::Backgrounds => sink.step(&mut self.backgrounds, time, full),
            Category::BackgroundModifiers => sink.step(&mut self.background_modifiers, time, full),
            Category::Prefabs => sink.step(&mut self.prefabs, time, full),
            Category::PrefabModifiers => sink.step(&mut self.prefab_modifiers, time, full),
        }
    }

    // ==================== TICK ====================

    /// Run one frame at the clock's current time.
    pub fn tick<C: Clock>(&mut self, clock: &C) {
        let song_length = clock.song_length();
        if self.config.song_length.is_none() && song_length != self.converter.song_length() {
            if self.initialized {
                self.set_song_length(song_length);
            } else {
                self.converter.set_song_length(song_length);
            }
        }
        if !self.initialized {
            self.init();
        }
        let time = clock.now();
        self.events.clear();
        self.time = time;

        // 1) deferred actions from outside the tick
        let pending = self.pre_tick.take();
        self.apply_actions(pending);

        let spectrum = self
            .spectrum
            .as_ref()
            .map(|reader| reader.snapshot())
            .unwrap_or_default();

        // 2) object modifiers
        self.step(Category::ObjectModifiers, time, false);
        {
            let mut ctx = ModifierTick {
                time,
                spectrum,
                actions: &mut self.post_tick,
            };
            tick_bundles(&self.object_modifiers, &mut self.modifiers, &mut ctx);
        }

        // 3) background modifiers
        self.step(Category::BackgroundModifiers, time, false);
        {
            let mut ctx = ModifierTick {
                time,
                spectrum,
                actions: &mut self.post_tick,
            };
            tick_bundles(&self.background_modifiers, &mut self.modifiers, &mut ctx);
        }

        // 4) objects
        self.step(Category::Objects, time, false);
        self.push_object_transforms(time);

        // 5) backgrounds
        self.step(Category::Backgrounds, time, false);
        self.push_background_transforms(time);

        // 6) prefab instances and their modifiers
        self.step(Category::Prefabs, time, false);
        self.step(Category::PrefabModifiers, time, false);
        {
            let mut ctx = ModifierTick {
                time,
                spectrum,
                actions: &mut self.post_tick,
            };
            tick_bundles(&self.prefab_modifiers, &mut self.modifiers, &mut ctx);
        }

        // 7) deferred actions raised during the tick
        let raised = self.post_tick.take();
        self.apply_actions(raised);
    }

    fn push_object_transforms(&mut self, time: f32) {
        for node in self.objects.active() {
            let Some(handle) = node.payload().visual() else {
                continue;
            };
            if let Some((world, color)) = object_world_transform(
                &self.converter,
                &self.store,
                node.source(),
                time,
                &self.camera,
            ) {
                self.visuals.update(handle, &world, color);
            }
        }
    }

    fn push_background_transforms(&mut self, time: f32) {
        for node in self.backgrounds.active() {
            let Some(handle) = node.payload().visual() else {
                continue;
            };
            if let Some((world, color)) =
                background_world_transform(&self.converter, &self.store, node.source(), time)
            {
                self.visuals.update(handle, &world, color);
            }
        }
    }

    /// Apply deferred actions in FIFO order. Failures are logged.
    pub(crate) fn apply_actions(&mut self, actions: Vec<LevelAction>) {
        for action in actions {
            let result = match action {
                LevelAction::UpdateObject { id, aspect } => self.update_object(&id, aspect),
                LevelAction::UpdateBackground { id, aspect } => self.update_background(&id, aspect),
                LevelAction::UpdatePrefabObject { id, aspect } => {
                    self.update_prefab_object(&id, aspect)
                }
                LevelAction::AddObject(object) => {
                    self.add_object(object);
                    Ok(())
                }
                LevelAction::DeleteObject(id) => self.delete_object(&id).map(|_| ()),
                LevelAction::DeleteBackground(id) => self.delete_background(&id).map(|_| ()),
                LevelAction::ExpandPrefab(id) => self.expand_prefab(&id).map(|_| ()),
                LevelAction::CollapsePrefab(id) => self.collapse_prefab(&id),
                LevelAction::Sort => {
                    self.sort();
                    Ok(())
                }
            };
            if let Err(err) = result {
                warn!("Deferred level action failed: {}", err);
            }
        }
    }

    // ==================== QUEUES & COLLABORATORS ====================

    /// Queue an action for the start of the next tick.
    pub fn queue_pre_tick(&mut self, action: LevelAction) {
        self.pre_tick.push(action);
    }

    /// Queue an action for the end of the current (or next) tick.
    pub fn queue_post_tick(&mut self, action: LevelAction) {
        self.post_tick.push(action);
    }

    pub fn set_spectrum(&mut self, reader: SpectrumReader) {
        self.spectrum = Some(reader);
    }

    pub fn set_camera(&mut self, camera: WorldTransform) {
        self.camera = camera;
    }

    pub fn camera(&self) -> &WorldTransform {
        &self.camera
    }

    /// Change the song length and recompute every kill time that uses it.
    pub fn set_song_length(&mut self, song_length: Option<f32>) {
        self.converter.set_song_length(song_length);
        self.refresh_all_times();
        debug!("song length set to {:?}", song_length);
    }

    // ==================== ACCESSORS ====================

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn converter(&self) -> &ObjectConverter {
        &self.converter
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }

    pub fn visuals_mut(&mut self) -> &mut V {
        &mut self.visuals
    }

    pub fn modifiers(&self) -> &M {
        &self.modifiers
    }

    pub fn modifiers_mut(&mut self) -> &mut M {
        &mut self.modifiers
    }

    /// Edges delivered by the most recent tick and by updates since.
    pub fn events(&self) -> &[NodeEvent] {
        &self.events
    }

    /// Clock time of the most recent tick.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut LevelObject> {
        let key = self.store.object_key(id)?;
        self.store.object_mut(key)
    }

    pub fn background_mut(&mut self, id: &str) -> Option<&mut BackgroundObject> {
        let key = self.store.background_key(id)?;
        self.store.background_mut(key)
    }

    pub fn prefab_object_mut(&mut self, id: &str) -> Option<&mut PrefabObject> {
        let key = self.store.prefab_object_key(id)?;
        self.store.prefab_object_mut(key)
    }

    pub fn object_node(&self, id: &str) -> Option<&RuntimeNode<ObjectKey>> {
        self.objects.node(self.store.object_key(id)?)
    }

    pub fn object_modifier_node(&self, id: &str) -> Option<&RuntimeNode<ObjectKey>> {
        self.object_modifiers.node(self.store.object_key(id)?)
    }

    pub fn background_node(&self, id: &str) -> Option<&RuntimeNode<BackgroundKey>> {
        self.backgrounds.node(self.store.background_key(id)?)
    }

    pub fn prefab_node(&self, id: &str) -> Option<&RuntimeNode<PrefabObjectKey>> {
        self.prefabs.node(self.store.prefab_object_key(id)?)
    }

    /// Ids of active objects in activation order.
    pub fn active_object_ids(&self) -> Vec<&str> {
        self.objects.active().map(|n| n.id()).collect()
    }

    pub fn active_background_ids(&self) -> Vec<&str> {
        self.backgrounds.active().map(|n| n.id()).collect()
    }

    pub fn is_object_active(&self, id: &str) -> bool {
        self.object_node(id).is_some_and(|n| n.is_active())
    }

    /// Every scheduled object node, active or not.
    pub fn object_nodes(&self) -> impl Iterator<Item = &RuntimeNode<ObjectKey>> {
        self.objects.spawner().nodes().map(|(_, n)| n)
    }

    // ==================== STRUCTURAL EDITS ====================

    /// Add (or replace) an object and schedule it. Children already pointing
    /// at its id pick it up as their parent.
    pub fn add_object(&mut self, object: LevelObject) -> ObjectKey {
        let id = object.id.clone();
        if let Some(old) = self.store.object_key(&id) {
            self.teardown_object(old);
            self.store.remove_object(old);
        }
        let key = self.store.insert_object(object);
        self.converter.cache_object(&self.store, key);
        self.converter.rebuild_subtree(&self.store, key);
        self.spawn_object_nodes(key);
        self.refresh_object_timing(key);
        debug!("object '{}' added", id);
        key
    }

    /// Remove an object and its nodes. Its children become parentless.
    pub fn delete_object(&mut self, id: &str) -> Result<LevelObject, LevelError> {
        let key = self
            .store
            .object_key(id)
            .ok_or_else(|| LevelError::UnknownObject(id.to_string()))?;
        let descendants = self.store.descendants(key);
        self.teardown_object(key);
        let object = self
            .store
            .remove_object(key)
            .ok_or_else(|| LevelError::UnknownObject(id.to_string()))?;

        if let Some(instance_key) = object
            .prefab_instance_id
            .as_deref()
            .and_then(|iid| self.store.prefab_object_key(iid))
        {
            if let Some(po) = self.store.prefab_object_mut(instance_key) {
                po.expanded.retain(|e| e != id);
            }
            self.refresh_prefab_times(instance_key);
        }
        for child in descendants {
            self.converter.rebuild_chain(&self.store, child);
        }
        for dependent in self.kill_dependents(id) {
            self.refresh_object_timing(dependent);
        }
        debug!("object '{}' deleted", id);
        Ok(object)
    }

    pub fn delete_background(
        &mut self,
        id: &str,
    ) -> Result<BackgroundObject, LevelError> {
        let key = self
            .store
            .background_key(id)
            .ok_or_else(|| LevelError::UnknownBackground(id.to_string()))?;
        self.teardown_background(key);
        let background = self
            .store
            .remove_background(key)
            .ok_or_else(|| LevelError::UnknownBackground(id.to_string()))?;
        if let Some(instance_key) = background
            .prefab_instance_id
            .as_deref()
            .and_then(|iid| self.store.prefab_object_key(iid))
        {
            if let Some(po) = self.store.prefab_object_mut(instance_key) {
                po.expanded.retain(|e| e != id);
            }
            self.refresh_prefab_times(instance_key);
        }
        debug!("background '{}' deleted", id);
        Ok(background)
    }

    /// Stamp a prefab instance, collapsing it first when already expanded.
    pub fn expand_prefab(&mut self, id: &str) -> Result<PrefabKeys, LevelError> {
        let key = self
            .store
            .prefab_object_key(id)
            .ok_or_else(|| LevelError::UnknownPrefabObject(id.to_string()))?;
        Ok(self.restamp(key))
    }

    /// Remove every copy of a prefab instance from the store and the engines.
    pub fn collapse_prefab(&mut self, id: &str) -> Result<(), LevelError> {
        let key = self
            .store
            .prefab_object_key(id)
            .ok_or_else(|| LevelError::UnknownPrefabObject(id.to_string()))?;
        self.collapse_instance(key);
        self.refresh_prefab_times(key);
        Ok(())
    }

    /// Add a new prefab instance, schedule it and expand it.
    pub fn instantiate_prefab(&mut self, instance: PrefabObject) -> Result<PrefabKeys, LevelError> {
        if self.store.prefab_by_id(&instance.prefab_id).is_none() {
            return Err(LevelError::UnknownPrefab(instance.prefab_id));
        }
        if let Some(old) = self.store.prefab_object_key(&instance.id) {
            self.collapse_instance(old);
            self.teardown_prefab(old);
            self.store.remove_prefab_object(old);
        }
        let key = self.store.insert_prefab_object(instance);
        self.spawn_prefab_nodes(key);
        Ok(self.restamp(key))
    }

    pub(crate) fn restamp(&mut self, key: PrefabObjectKey) -> PrefabKeys {
        if self.store.prefab_object(key).is_some_and(|po| po.is_expanded()) {
            self.collapse_instance(key);
        }
        let keys = self.expander.expand(&mut self.store, key);
        self.spawn_expansion(&keys);
        self.refresh_prefab_times(key);
        keys
    }

    /// The single removal routine for prefab copies: store, engines, caches
    /// and every chain that ran through a removed copy.
    pub(crate) fn collapse_instance(&mut self, key: PrefabObjectKey) -> PrefabKeys {
        let removed = PrefabExpander::collapse(&mut self.store, key);
        for &object in removed.objects.iter() {
            self.teardown_object(object);
        }
        for &background in removed.backgrounds.iter() {
            self.teardown_background(background);
        }
        for &instance in removed.prefab_objects.iter() {
            self.teardown_prefab(instance);
        }
        let repaired = self.converter.repair_chains(&self.store, &removed.objects);
        if repaired > 0 {
            debug!("{} parent chains repaired after collapse", repaired);
        }
        removed
    }

    fn spawn_expansion(&mut self, keys: &PrefabKeys) {
        for &key in keys.objects.iter() {
            self.converter.cache_object(&self.store, key);
        }
        for &key in keys.backgrounds.iter() {
            self.converter.cache_background(&self.store, key);
        }
        // every copy is in the store, so parents resolve in any order
        for &key in keys.objects.iter() {
            self.converter.rebuild_chain(&self.store, key);
        }
        for &key in keys.objects.iter() {
            self.spawn_object_nodes(key);
        }
        for &key in keys.backgrounds.iter() {
            self.spawn_background_nodes(key);
        }
        for &key in keys.prefab_objects.iter() {
            self.spawn_prefab_nodes(key);
        }
    }

    // ==================== NODES ====================

    /// Tear down a node removed from an engine.
    pub(crate) fn discard<K: Copy>(&mut self, category: Category, node: RuntimeNode<K>) {
        if node.is_active() {
            self.events.push(NodeEvent {
                edge: NodeEdge::Deactivated,
                category,
                id: node.id().to_string(),
                time: self.time,
            });
        }
        ObjectConverter::destroy_node(node, &mut self.visuals, &mut self.modifiers);
    }

    pub(crate) fn spawn_object_nodes(&mut self, key: ObjectKey) {
        if let Some(node) = self.converter.to_runtime_node(&self.store, key, &mut self.visuals) {
            if let Some(old) = self.objects.insert(node) {
                self.discard(Category::Objects, old);
            }
        }
        if let Some(node) = self
            .converter
            .to_modifier_node(&self.store, key, &mut self.modifiers)
        {
            if let Some(old) = self.object_modifiers.insert(node) {
                self.discard(Category::ObjectModifiers, old);
            }
        }
    }

    pub(crate) fn spawn_background_nodes(&mut self, key: BackgroundKey) {
        if let Some(node) = self
            .converter
            .to_background_node(&self.store, key, &mut self.visuals)
        {
            if let Some(old) = self.backgrounds.insert(node) {
                self.discard(Category::Backgrounds, old);
            }
        }
        if let Some(node) = self
            .converter
            .to_background_modifier_node(&self.store, key, &mut self.modifiers)
        {
            if let Some(old) = self.background_modifiers.insert(node) {
                self.discard(Category::BackgroundModifiers, old);
            }
        }
    }

    pub(crate) fn spawn_prefab_nodes(&mut self, key: PrefabObjectKey) {
        if let Some(node) = self.converter.to_prefab_node(&self.store, key) {
            if let Some(old) = self.prefabs.insert(node) {
                self.discard(Category::Prefabs, old);
            }
        }
        if let Some(node) = self
            .converter
            .to_prefab_modifier_node(&self.store, key, &mut self.modifiers)
        {
            if let Some(old) = self.prefab_modifiers.insert(node) {
                self.discard(Category::PrefabModifiers, old);
            }
        }
    }

    pub(crate) fn teardown_object(&mut self, key: ObjectKey) {
        if let Some(node) = self.objects.remove(key) {
            self.discard(Category::Objects, node);
        }
        if let Some(node) = self.object_modifiers.remove(key) {
            self.discard(Category::ObjectModifiers, node);
        }
        self.converter.evict_object(key);
    }

    pub(crate) fn teardown_background(&mut self, key: BackgroundKey) {
        if let Some(node) = self.backgrounds.remove(key) {
            self.discard(Category::Backgrounds, node);
        }
        if let Some(node) = self.background_modifiers.remove(key) {
            self.discard(Category::BackgroundModifiers, node);
        }
        self.converter.evict_background(key);
    }

    pub(crate) fn teardown_prefab(&mut self, key: PrefabObjectKey) {
        if let Some(node) = self.prefabs.remove(key) {
            self.discard(Category::Prefabs, node);
        }
        if let Some(node) = self.prefab_modifiers.remove(key) {
            self.discard(Category::PrefabModifiers, node);
        }
    }

    // ==================== TIMING ====================

    /// Objects whose kill time is tied to `id`.
    fn kill_dependents(&self, id: &str) -> Vec<ObjectKey> {
        self.store
            .objects()
            .filter(|(_, o)| {
                matches!(&o.autokill, AutoKill::WithObject { id: target } if target == id)
            })
            .map(|(k, _)| k)
            .collect()
    }

    /// Recompute the window of an object, of everything killed with it, and
    /// of the prefab instances they belong to.
    pub(crate) fn refresh_object_timing(&mut self, key: ObjectKey) {
        let mut pending = vec![key];
        let mut seen = rustc_hash::FxHashSet::default();
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            self.refresh_object_times(current);
            if let Some(id) = self.store.object(current).map(|o| o.id.clone()) {
                pending.extend(self.kill_dependents(&id));
            }
        }
        let backgrounds: Vec<BackgroundKey> = match self.store.object(key) {
            Some(object) => self
                .store
                .backgrounds()
                .filter(|(_, b)| {
                    matches!(&b.autokill, AutoKill::WithObject { id } if *id == object.id)
                })
                .map(|(k, _)| k)
                .collect(),
            None => Vec::new(),
        };
        for background in backgrounds {
            self.refresh_background_times(background);
        }
    }

    fn refresh_object_times(&mut self, key: ObjectKey) {
        let Some(window) = self.converter.object_window(&self.store, key) else {
            return;
        };
        self.objects.set_times(key, window.0, window.1);
        let Some(object) = self.store.object(key) else {
            return;
        };
        let (start, kill) = ObjectConverter::modifier_window(&object.modifiers, window);
        self.object_modifiers.set_times(key, start, kill);
        let instance = object
            .prefab_instance_id
            .as_deref()
            .and_then(|iid| self.store.prefab_object_key(iid));
        if let Some(instance) = instance {
            self.refresh_prefab_times(instance);
        }
    }

    pub(crate) fn refresh_background_times(&mut self, key: BackgroundKey) {
        let Some(window) = self.converter.background_window(&self.store, key) else {
            return;
        };
        self.backgrounds.set_times(key, window.0, window.1);
        let Some(background) = self.store.background(key) else {
            return;
        };
        let (start, kill) = ObjectConverter::modifier_window(&background.modifiers, window);
        self.background_modifiers.set_times(key, start, kill);
        let instance = background
            .prefab_instance_id
            .as_deref()
            .and_then(|iid| self.store.prefab_object_key(iid));
        if let Some(instance) = instance {
            self.refresh_prefab_times(instance);
        }
    }

    /// Recompute a prefab instance window and those of its outer instances.
    pub(crate) fn refresh_prefab_times(&mut self, key: PrefabObjectKey) {
        let mut current = Some(key);
        let mut depth = 0;
        while let Some(key) = current {
            if depth >= MAX_INSTANCE_DEPTH {
                break;
            }
            let Some(window) = self.converter.prefab_window(&self.store, key) else {
                break;
            };
            self.prefabs.set_times(key, window.0, window.1);
            let Some(po) = self.store.prefab_object(key) else {
                break;
            };
            let (start, kill) = ObjectConverter::modifier_window(&po.modifiers, window);
            self.prefab_modifiers.set_times(key, start, kill);
            current = po
                .prefab_instance_id
                .as_deref()
                .and_then(|iid| self.store.prefab_object_key(iid));
            depth += 1;
        }
    }

    fn refresh_all_times(&mut self) {
        for key in self.store.object_keys() {
            self.refresh_object_times(key);
        }
        for key in self.store.background_keys() {
            self.refresh_background_times(key);
        }
        for key in self.store.prefab_object_keys() {
            self.refresh_prefab_times(key);
        }
    }
}
