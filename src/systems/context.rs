//! Sparse context updates.
//!
//! An editor or a modifier changes one property of a record in the data
//! store, then tells the level which [`ObjectAspect`] (or [`PrefabAspect`])
//! changed. Each aspect touches only the runtime state it implicates:
//!
//! | aspect | runtime work |
//! |---|---|
//! | `StartTime`, `Autokill` | new window for the node, its bundle and dependents |
//! | `Keyframes` | recache sequences, then new window |
//! | `Parent`, `ParentSettings`, `ParentChain` | rebuild the chains of the subtree |
//! | `Shape` | replace the visual payload |
//! | `Modifiers` | detach and reattach the bundle |
//! | `Hide`, `Selectable`, `Depth` | forward to the visual |
//!
//! Prefab instances re-stamp on timing changes and rebuild the chains of
//! their base copies on parent or transform changes.

use log::debug;
use rustc_hash::FxHashSet;

use crate::components::object::ObjectKind;
use crate::components::runtimenode::NodePayload;
use crate::error::LevelError;
use crate::events::action::{ObjectAspect, PrefabAspect};
use crate::events::node::Category;
use crate::resources::datastore::{BackgroundKey, ObjectKey, PrefabObjectKey};
use crate::resources::modifiers::ModifierRuntime;
use crate::resources::visuals::{VisualFactory, VisualHandle, VisualSource};
use crate::systems::converter::ObjectConverter;
use crate::systems::level::LevelContext;
use crate::systems::prefab::PrefabExpander;

impl<V: VisualFactory, M: ModifierRuntime> LevelContext<V, M> {
    /// Apply one changed aspect of an object.
    pub fn update_object(&mut self, id: &str, aspect: ObjectAspect) -> Result<(), LevelError> {
        let key = self
            .store
            .object_key(id)
            .ok_or_else(|| LevelError::UnknownObject(id.to_string()))?;
        match aspect {
            ObjectAspect::StartTime => {
                self.refresh_object_timing(key);
                // desynced links sample at the spawn time baked into the chain
                if self
                    .store
                    .object(key)
                    .is_some_and(|o| o.parent_settings.desync)
                {
                    self.converter.rebuild_subtree(&self.store, key);
                }
            }
            ObjectAspect::Autokill => self.refresh_object_timing(key),
            ObjectAspect::Keyframes => {
                self.converter.cache_object(&self.store, key);
                self.refresh_object_timing(key);
            }
            ObjectAspect::Parent | ObjectAspect::ParentSettings | ObjectAspect::ParentChain => {
                self.converter.rebuild_subtree(&self.store, key);
            }
            ObjectAspect::Shape => self.rebuild_object_visual(key),
            ObjectAspect::Modifiers => self.reattach_object_modifiers(key),
            ObjectAspect::Hide => {
                if let (Some(handle), Some(object)) =
                    (self.object_handle(key), self.store.object(key))
                {
                    self.visuals.set_hidden(handle, object.hidden);
                }
            }
            ObjectAspect::Selectable => {
                if let (Some(handle), Some(object)) =
                    (self.object_handle(key), self.store.object(key))
                {
                    self.visuals.set_selectable(handle, object.selectable);
                }
            }
            ObjectAspect::Depth => {
                if let (Some(handle), Some(object)) =
                    (self.object_handle(key), self.store.object(key))
                {
                    self.visuals.set_depth(handle, object.depth);
                }
            }
        }
        debug!("object '{}' updated ({:?})", id, aspect);
        Ok(())
    }

    /// Apply one changed aspect of a background object. Parent aspects and
    /// `Selectable` do not apply to backgrounds.
    pub fn update_background(&mut self, id: &str, aspect: ObjectAspect) -> Result<(), LevelError> {
        let key = self
            .store
            .background_key(id)
            .ok_or_else(|| LevelError::UnknownBackground(id.to_string()))?;
        match aspect {
            ObjectAspect::StartTime | ObjectAspect::Autokill => self.refresh_background_times(key),
            ObjectAspect::Keyframes => {
                self.converter.cache_background(&self.store, key);
                self.refresh_background_times(key);
            }
            ObjectAspect::Shape => self.rebuild_background_visual(key),
            ObjectAspect::Modifiers => self.reattach_background_modifiers(key),
            ObjectAspect::Hide => {
                if let (Some(handle), Some(background)) =
                    (self.background_handle(key), self.store.background(key))
                {
                    self.visuals.set_hidden(handle, background.hidden);
                }
            }
            ObjectAspect::Depth => {
                if let (Some(handle), Some(background)) =
                    (self.background_handle(key), self.store.background(key))
                {
                    self.visuals.set_depth(handle, background.depth);
                }
            }
            ObjectAspect::Selectable
            | ObjectAspect::Parent
            | ObjectAspect::ParentSettings
            | ObjectAspect::ParentChain => {
                debug!("background '{}' ignores {:?}", id, aspect);
                return Ok(());
            }
        }
        debug!("background '{}' updated ({:?})", id, aspect);
        Ok(())
    }

    /// Apply one changed aspect of a prefab instance.
    pub fn update_prefab_object(
        &mut self,
        id: &str,
        aspect: PrefabAspect,
    ) -> Result<(), LevelError> {
        let key = self
            .store
            .prefab_object_key(id)
            .ok_or_else(|| LevelError::UnknownPrefabObject(id.to_string()))?;
        let expanded = self
            .store
            .prefab_object(key)
            .is_some_and(|po| po.is_expanded());
        match aspect {
            PrefabAspect::Timing | PrefabAspect::Autokill => {
                if expanded {
                    self.restamp(key);
                } else {
                    self.refresh_prefab_times(key);
                }
            }
            PrefabAspect::Parent => {
                for copy in PrefabExpander::reparent_base_copies(&mut self.store, key) {
                    self.converter.rebuild_subtree(&self.store, copy);
                }
            }
            PrefabAspect::Transform => {
                for copy in self.instance_copies(key) {
                    self.converter.rebuild_subtree(&self.store, copy);
                }
            }
            PrefabAspect::Modifiers => {
                if let Some(node) = self.prefab_modifiers.remove(key) {
                    self.discard(Category::PrefabModifiers, node);
                }
                if let Some(node) =
                    self.converter
                        .to_prefab_modifier_node(&self.store, key, &mut self.modifiers)
                {
                    self.prefab_modifiers.insert(node);
                }
            }
        }
        debug!("prefab object '{}' updated ({:?})", id, aspect);
        Ok(())
    }

    fn object_handle(&self, key: ObjectKey) -> Option<VisualHandle> {
        self.objects.node(key).and_then(|n| n.payload().visual())
    }

    fn background_handle(&self, key: BackgroundKey) -> Option<VisualHandle> {
        self.backgrounds.node(key).and_then(|n| n.payload().visual())
    }

    /// Copies stamped by an instance and by the instances nested in it.
    fn instance_copies(&self, key: PrefabObjectKey) -> Vec<ObjectKey> {
        let mut family: FxHashSet<&str> = FxHashSet::default();
        let Some(root) = self.store.prefab_object(key) else {
            return Vec::new();
        };
        family.insert(root.id.as_str());
        loop {
            let before = family.len();
            for (_, po) in self.store.prefab_objects() {
                if po
                    .prefab_instance_id
                    .as_deref()
                    .is_some_and(|outer| family.contains(outer))
                {
                    family.insert(po.id.as_str());
                }
            }
            if family.len() == before {
                break;
            }
        }
        self.store
            .objects()
            .filter(|(_, o)| {
                o.prefab_instance_id
                    .as_deref()
                    .is_some_and(|iid| family.contains(iid))
            })
            .map(|(k, _)| k)
            .collect()
    }

    /// Replace the visual payload of an object, or add/remove its node when
    /// the object switched to or from a kind without visuals.
    fn rebuild_object_visual(&mut self, key: ObjectKey) {
        let wants_node = self
            .store
            .object(key)
            .is_some_and(|o| o.kind != ObjectKind::Empty);
        let existing = self
            .objects
            .node(key)
            .map(|n| (n.payload().visual(), n.is_active()));

        match (existing, wants_node) {
            (Some((old, active)), true) => {
                if let Some(old) = old {
                    if active {
                        self.visuals.set_active(old, false);
                    }
                    self.visuals.destroy(old);
                }
                let Some(object) = self.store.object(key) else {
                    return;
                };
                let handle =
                    ObjectConverter::create_visual(&mut self.visuals, VisualSource::Object(object));
                if let (Some(handle), true) = (handle, active) {
                    self.visuals.set_active(handle, true);
                }
                self.objects.set_payload(key, NodePayload::Visual { handle });
            }
            (Some(_), false) => {
                if let Some(node) = self.objects.remove(key) {
                    self.discard(Category::Objects, node);
                }
            }
            (None, true) => {
                if let Some(node) =
                    self.converter.to_runtime_node(&self.store, key, &mut self.visuals)
                {
                    self.objects.insert(node);
                }
            }
            (None, false) => {}
        }
    }

    fn rebuild_background_visual(&mut self, key: BackgroundKey) {
        let Some((old, active)) = self
            .backgrounds
            .node(key)
            .map(|n| (n.payload().visual(), n.is_active()))
        else {
            return;
        };
        if let Some(old) = old {
            if active {
                self.visuals.set_active(old, false);
            }
            self.visuals.destroy(old);
        }
        let Some(background) = self.store.background(key) else {
            return;
        };
        let handle =
            ObjectConverter::create_visual(&mut self.visuals, VisualSource::Background(background));
        if let (Some(handle), true) = (handle, active) {
            self.visuals.set_active(handle, true);
        }
        self.backgrounds.set_payload(key, NodePayload::Visual { handle });
    }

    fn reattach_object_modifiers(&mut self, key: ObjectKey) {
        if let Some(node) = self.object_modifiers.remove(key) {
            self.discard(Category::ObjectModifiers, node);
        }
        if let Some(node) = self
            .converter
            .to_modifier_node(&self.store, key, &mut self.modifiers)
        {
            self.object_modifiers.insert(node);
        }
    }

    fn reattach_background_modifiers(&mut self, key: BackgroundKey) {
        if let Some(node) = self.background_modifiers.remove(key) {
            self.discard(Category::BackgroundModifiers, node);
        }
        if let Some(node) = self
            .converter
            .to_background_modifier_node(&self.store, key, &mut self.modifiers)
        {
            self.background_modifiers.insert(node);
        }
    }
}
