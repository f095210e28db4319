//! Level data store.
//!
//! The [`DataStore`] is the authoritative collection of declarative objects,
//! backgrounds, prefabs and prefab instances of one level. Every collection
//! lives in a [`SlotMap`] arena so the rest of the engine can hold stable
//! integer keys instead of references, and every arena has an id index for
//! lookups by authored id.
//!
//! [`LevelData`] is the plain, serializable shape of the same content. It is
//! what a loader produces and what [`DataStore::from_level_data`] consumes.

use std::path::Path;

use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::components::background::BackgroundObject;
use crate::components::object::LevelObject;
use crate::components::prefab::{Prefab, PrefabObject};
use crate::error::LevelError;

new_key_type! {
    /// Handle of a [`LevelObject`] in the store.
    pub struct ObjectKey;
    /// Handle of a [`BackgroundObject`] in the store.
    pub struct BackgroundKey;
    /// Handle of a [`Prefab`] in the store.
    pub struct PrefabKey;
    /// Handle of a [`PrefabObject`] in the store.
    pub struct PrefabObjectKey;
}

/// Serializable level content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub objects: Vec<LevelObject>,
    pub backgrounds: Vec<BackgroundObject>,
    pub prefabs: Vec<Prefab>,
    pub prefab_objects: Vec<PrefabObject>,
}

impl LevelData {
    pub fn from_json_str(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let data = Self::from_json_str(&json)?;
        info!(
            "Loaded level {:?}: {} objects, {} backgrounds, {} prefabs, {} prefab objects",
            path.as_ref(),
            data.objects.len(),
            data.backgrounds.len(),
            data.prefabs.len(),
            data.prefab_objects.len()
        );
        Ok(data)
    }
}

/// Arena-backed store of every declarative record of a level.
#[derive(Debug, Default)]
pub struct DataStore {
    objects: SlotMap<ObjectKey, LevelObject>,
    object_ids: FxHashMap<String, ObjectKey>,
    backgrounds: SlotMap<BackgroundKey, BackgroundObject>,
    background_ids: FxHashMap<String, BackgroundKey>,
    prefabs: SlotMap<PrefabKey, Prefab>,
    prefab_ids: FxHashMap<String, PrefabKey>,
    prefab_objects: SlotMap<PrefabObjectKey, PrefabObject>,
    prefab_object_ids: FxHashMap<String, PrefabObjectKey>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded data. Later duplicates of an id replace
    /// earlier ones.
    pub fn from_level_data(data: LevelData) -> Self {
        let mut store = DataStore::new();
        for prefab in data.prefabs {
            store.insert_prefab(prefab);
        }
        for object in data.objects {
            store.insert_object(object);
        }
        for background in data.backgrounds {
            store.insert_background(background);
        }
        for prefab_object in data.prefab_objects {
            store.insert_prefab_object(prefab_object);
        }
        store
    }

    /// Snapshot the authored content. Prefab copies are left out; they are
    /// derived from their instances.
    pub fn to_level_data(&self) -> LevelData {
        LevelData {
            objects: self
                .objects
                .values()
                .filter(|o| o.prefab_instance_id.is_none())
                .cloned()
                .collect(),
            backgrounds: self
                .backgrounds
                .values()
                .filter(|b| b.prefab_instance_id.is_none())
                .cloned()
                .collect(),
            prefabs: self.prefabs.values().cloned().collect(),
            prefab_objects: self
                .prefab_objects
                .values()
                .filter(|p| p.prefab_instance_id.is_none())
                .cloned()
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        *self = DataStore::default();
    }

    // ==================== OBJECTS ====================

    /// Insert an object, replacing any object with the same id.
    pub fn insert_object(&mut self, object: LevelObject) -> ObjectKey {
        if let Some(&old) = self.object_ids.get(&object.id) {
            warn!("Duplicate object id '{}', replacing previous object", object.id);
            self.objects.remove(old);
        }
        let id = object.id.clone();
        let key = self.objects.insert(object);
        self.object_ids.insert(id, key);
        key
    }

    pub fn remove_object(&mut self, key: ObjectKey) -> Option<LevelObject> {
        let object = self.objects.remove(key)?;
        if self.object_ids.get(&object.id) == Some(&key) {
            self.object_ids.remove(&object.id);
        }
        Some(object)
    }

    pub fn object(&self, key: ObjectKey) -> Option<&LevelObject> {
        self.objects.get(key)
    }

    /// Mutable access for editing. The id must not be changed through this.
    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut LevelObject> {
        self.objects.get_mut(key)
    }

    pub fn object_key(&self, id: &str) -> Option<ObjectKey> {
        self.object_ids.get(id).copied()
    }

    pub fn object_by_id(&self, id: &str) -> Option<&LevelObject> {
        self.object_key(id).and_then(|k| self.objects.get(k))
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &LevelObject)> {
        self.objects.iter()
    }

    pub fn object_keys(&self) -> Vec<ObjectKey> {
        self.objects.keys().collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects grouped by the id of their object parent.
    pub fn children_map(&self) -> FxHashMap<&str, SmallVec<[ObjectKey; 4]>> {
        let mut map: FxHashMap<&str, SmallVec<[ObjectKey; 4]>> = FxHashMap::default();
        for (key, object) in self.objects.iter() {
            if let Some(parent) = object.parent.object_id() {
                map.entry(parent).or_default().push(key);
            }
        }
        map
    }

    /// Every object whose parent walk passes through `root`, breadth first.
    /// `root` itself is not included. Safe against cycles.
    pub fn descendants(&self, root: ObjectKey) -> Vec<ObjectKey> {
        let Some(root_object) = self.objects.get(root) else {
            return Vec::new();
        };
        let children = self.children_map();
        let mut visited: FxHashSet<ObjectKey> = FxHashSet::default();
        visited.insert(root);
        let mut out = Vec::new();
        let mut frontier: Vec<&str> = vec![root_object.id.as_str()];
        while let Some(id) = frontier.pop() {
            let Some(kids) = children.get(id) else {
                continue;
            };
            for &kid in kids {
                if visited.insert(kid) {
                    out.push(kid);
                    if let Some(obj) = self.objects.get(kid) {
                        frontier.push(obj.id.as_str());
                    }
                }
            }
        }
        out
    }

    // ==================== BACKGROUNDS ====================

    pub fn insert_background(&mut self, background: BackgroundObject) -> BackgroundKey {
        if let Some(&old) = self.background_ids.get(&background.id) {
            warn!(
                "Duplicate background id '{}', replacing previous background",
                background.id
            );
            self.backgrounds.remove(old);
        }
        let id = background.id.clone();
        let key = self.backgrounds.insert(background);
        self.background_ids.insert(id, key);
        key
    }

    pub fn remove_background(&mut self, key: BackgroundKey) -> Option<BackgroundObject> {
        let background = self.backgrounds.remove(key)?;
        if self.background_ids.get(&background.id) == Some(&key) {
            self.background_ids.remove(&background.id);
        }
        Some(background)
    }

    pub fn background(&self, key: BackgroundKey) -> Option<&BackgroundObject> {
        self.backgrounds.get(key)
    }

    pub fn background_mut(&mut self, key: BackgroundKey) -> Option<&mut BackgroundObject> {
        self.backgrounds.get_mut(key)
    }

    pub fn background_key(&self, id: &str) -> Option<BackgroundKey> {
        self.background_ids.get(id).copied()
    }

    pub fn backgrounds(&self) -> impl Iterator<Item = (BackgroundKey, &BackgroundObject)> {
        self.backgrounds.iter()
    }

    pub fn background_keys(&self) -> Vec<BackgroundKey> {
        self.backgrounds.keys().collect()
    }

    // ==================== PREFABS ====================

    pub fn insert_prefab(&mut self, prefab: Prefab) -> PrefabKey {
        if let Some(&old) = self.prefab_ids.get(&prefab.id) {
            warn!("Duplicate prefab id '{}', replacing previous prefab", prefab.id);
            self.prefabs.remove(old);
        }
        let id = prefab.id.clone();
        let key = self.prefabs.insert(prefab);
        self.prefab_ids.insert(id, key);
        key
    }

    pub fn remove_prefab(&mut self, key: PrefabKey) -> Option<Prefab> {
        let prefab = self.prefabs.remove(key)?;
        if self.prefab_ids.get(&prefab.id) == Some(&key) {
            self.prefab_ids.remove(&prefab.id);
        }
        Some(prefab)
    }

    pub fn prefab(&self, key: PrefabKey) -> Option<&Prefab> {
        self.prefabs.get(key)
    }

    pub fn prefab_by_id(&self, id: &str) -> Option<&Prefab> {
        self.prefab_ids.get(id).and_then(|&k| self.prefabs.get(k))
    }

    pub fn prefab_key(&self, id: &str) -> Option<PrefabKey> {
        self.prefab_ids.get(id).copied()
    }

    // ==================== PREFAB OBJECTS ====================

    pub fn insert_prefab_object(&mut self, prefab_object: PrefabObject) -> PrefabObjectKey {
        if let Some(&old) = self.prefab_object_ids.get(&prefab_object.id) {
            warn!(
                "Duplicate prefab object id '{}', replacing previous prefab object",
                prefab_object.id
            );
            self.prefab_objects.remove(old);
        }
        let id = prefab_object.id.clone();
        let key = self.prefab_objects.insert(prefab_object);
        self.prefab_object_ids.insert(id, key);
        key
    }

    pub fn remove_prefab_object(&mut self, key: PrefabObjectKey) -> Option<PrefabObject> {
        let prefab_object = self.prefab_objects.remove(key)?;
        if self.prefab_object_ids.get(&prefab_object.id) == Some(&key) {
            self.prefab_object_ids.remove(&prefab_object.id);
        }
        Some(prefab_object)
    }

    pub fn prefab_object(&self, key: PrefabObjectKey) -> Option<&PrefabObject> {
        self.prefab_objects.get(key)
    }

    pub fn prefab_object_mut(&mut self, key: PrefabObjectKey) -> Option<&mut PrefabObject> {
        self.prefab_objects.get_mut(key)
    }

    pub fn prefab_object_key(&self, id: &str) -> Option<PrefabObjectKey> {
        self.prefab_object_ids.get(id).copied()
    }

    pub fn prefab_object_by_id(&self, id: &str) -> Option<&PrefabObject> {
        self.prefab_object(self.prefab_object_key(id)?)
    }

    pub fn prefab_objects(&self) -> impl Iterator<Item = (PrefabObjectKey, &PrefabObject)> {
        self.prefab_objects.iter()
    }

    pub fn prefab_object_keys(&self) -> Vec<PrefabObjectKey> {
        self.prefab_objects.keys().collect()
    }

    /// Whether any record already uses `id`.
    pub fn id_in_use(&self, id: &str) -> bool {
        self.object_ids.contains_key(id)
            || self.background_ids.contains_key(id)
            || self.prefab_object_ids.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::object::ParentRef;

    fn child(id: &str, parent: &str) -> LevelObject {
        LevelObject::new(id, 0.0).with_parent(ParentRef::Object(parent.into()))
    }

    #[test]
    fn insert_and_lookup_by_id() {
        let mut store = DataStore::new();
        let key = store.insert_object(LevelObject::new("a", 1.0));
        assert_eq!(store.object_key("a"), Some(key));
        assert_eq!(store.object_by_id("a").map(|o| o.start_time), Some(1.0));
    }

    #[test]
    fn duplicate_id_replaces() {
        let mut store = DataStore::new();
        let first = store.insert_object(LevelObject::new("a", 1.0));
        let second = store.insert_object(LevelObject::new("a", 2.0));
        assert!(store.object(first).is_none());
        assert_eq!(store.object_key("a"), Some(second));
        assert_eq!(store.object_count(), 1);
    }

    #[test]
    fn remove_clears_index() {
        let mut store = DataStore::new();
        let key = store.insert_object(LevelObject::new("a", 1.0));
        assert!(store.remove_object(key).is_some());
        assert!(store.object_key("a").is_none());
        assert!(store.remove_object(key).is_none());
    }

    #[test]
    fn descendants_walks_subtree() {
        let mut store = DataStore::new();
        let root = store.insert_object(LevelObject::new("root", 0.0));
        let a = store.insert_object(child("a", "root"));
        let b = store.insert_object(child("b", "a"));
        let _other = store.insert_object(LevelObject::new("other", 0.0));
        let d = store.descendants(root);
        assert_eq!(d.len(), 2);
        assert!(d.contains(&a));
        assert!(d.contains(&b));
    }

    #[test]
    fn descendants_survives_cycles() {
        let mut store = DataStore::new();
        let a = store.insert_object(child("a", "b"));
        let b = store.insert_object(child("b", "a"));
        let d = store.descendants(a);
        assert_eq!(d, vec![b]);
    }

    #[test]
    fn level_data_snapshot_skips_prefab_copies() {
        let mut store = DataStore::new();
        store.insert_object(LevelObject::new("authored", 0.0));
        let mut copy = LevelObject::new("copy", 0.0);
        copy.prefab_instance_id = Some("po".into());
        store.insert_object(copy);
        let data = store.to_level_data();
        assert_eq!(data.objects.len(), 1);
        assert_eq!(data.objects[0].id, "authored");
    }
}
