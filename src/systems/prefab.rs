//! Prefab expansion and collapse.
//!
//! A [`PrefabObject`] instance stamps its [`Prefab`] template into the data
//! store `repeat_count + 1` times. Iteration `i` is shifted by
//! `i * repeat_offset_time` on the template timeline, and every copy gets:
//!
//! - a fresh 16-character id (the old-to-new map is per iteration);
//! - parents remapped inside the iteration, kept when they resolve outside
//!   the prefab, cleared when they dangle;
//! - `start = instance.start + prefab.offset + (template.start + t_i) / speed`
//!   with its keyframes time-scaled by `speed`;
//! - the instance's external parent when it is a base copy;
//! - the instance's lifetime ceiling as its autokill when it would outlive it,
//!   or as a kill-time bound when its rule is resolved against the level;
//! - back-references to the instance, the prefab and its template.
//!
//! Nested prefab objects are stamped the same way and expanded recursively.
//!
//! Expansion only touches the data store. The level turns the returned keys
//! into runtime nodes, and tears them down again from the keys returned by
//! [`PrefabExpander::collapse`], which finds copies by their back-reference
//! rather than trusting the recorded expansion list.

use fastrand::Rng;
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::components::keyframe::Keyframes;
use crate::components::object::{AutoKill, ParentRef};
use crate::components::prefab::{ExpansionState, Prefab, PrefabAutoKill, PrefabObject};
use crate::components::sequence::SequenceCollection;
use crate::resources::datastore::{BackgroundKey, DataStore, ObjectKey, PrefabObjectKey};

/// Length of generated copy ids.
pub const COPY_ID_LEN: usize = 16;

/// Keys of records stamped into (or removed from) the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrefabKeys {
    pub objects: Vec<ObjectKey>,
    pub backgrounds: Vec<BackgroundKey>,
    pub prefab_objects: Vec<PrefabObjectKey>,
}

impl PrefabKeys {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.backgrounds.is_empty() && self.prefab_objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.backgrounds.len() + self.prefab_objects.len()
    }

    pub fn extend(&mut self, other: PrefabKeys) {
        self.objects.extend(other.objects);
        self.backgrounds.extend(other.backgrounds);
        self.prefab_objects.extend(other.prefab_objects);
    }
}

/// Timing shared by every copy of one iteration.
struct Stamp<'a> {
    instance: &'a PrefabObject,
    prefab: &'a Prefab,
    speed: f32,
    shift: f32,
    ceiling: Option<f32>,
}

impl Stamp<'_> {
    fn start(&self, template_start: f32) -> f32 {
        self.instance.start_time + self.prefab.offset + (template_start + self.shift) / self.speed
    }

    /// Rescale an autokill rule onto the copy's timeline.
    fn autokill(
        &self,
        rule: &AutoKill,
        template_start: f32,
        copy_start: f32,
        ids: &FxHashMap<String, String>,
    ) -> AutoKill {
        match rule {
            AutoKill::FixedTime { duration } => AutoKill::FixedTime {
                duration: duration / self.speed,
            },
            AutoKill::LastKeyframeOffset { offset } => AutoKill::LastKeyframeOffset {
                offset: offset / self.speed,
            },
            AutoKill::SongTime { time } => AutoKill::SongTime {
                time: copy_start + (time - template_start) / self.speed,
            },
            AutoKill::WithObject { id } => AutoKill::WithObject {
                id: ids.get(id).cloned().unwrap_or_else(|| id.clone()),
            },
            other => other.clone(),
        }
    }

    /// Clamp a copy's autokill to the instance ceiling.
    ///
    /// Self-contained rules that would outlive the ceiling are replaced by
    /// it. Rules resolved against the level (`WithObject`, `SongLength`) are
    /// kept, and the ceiling comes back as a bound on their kill time.
    fn clamp(
        &self,
        rule: AutoKill,
        copy_start: f32,
        keyframes: &Keyframes,
    ) -> (AutoKill, Option<f32>) {
        let Some(ceiling) = self.ceiling else {
            return (rule, None);
        };
        if matches!(rule, AutoKill::WithObject { .. } | AutoKill::SongLength) {
            return (rule, Some(ceiling));
        }
        let length = if rule.uses_keyframes() {
            SequenceCollection::from_keyframes(keyframes).length()
        } else {
            0.0
        };
        if rule.kill_time(copy_start, length, None) > ceiling {
            (AutoKill::SongTime { time: ceiling }, None)
        } else {
            (rule, None)
        }
    }

    /// Parent of a copy whose template parent is `parent`.
    ///
    /// Returns the new parent and whether the copy is a base copy.
    fn parent(
        &self,
        store: &DataStore,
        parent: &ParentRef,
        ids: &FxHashMap<String, String>,
        template_id: &str,
    ) -> (ParentRef, bool) {
        let remapped = match parent {
            ParentRef::Object(pid) => match ids.get(pid) {
                Some(new_id) if self.prefab.contains_object(pid) => {
                    return (ParentRef::Object(new_id.clone()), false);
                }
                _ if store.object_key(pid).is_some() => parent.clone(),
                _ => {
                    warn!(
                        "Template '{}' of prefab '{}' has dangling parent '{}', clearing it",
                        template_id, self.prefab.id, pid
                    );
                    ParentRef::None
                }
            },
            other => other.clone(),
        };
        if self.instance.parent.is_none() {
            (remapped, true)
        } else {
            (self.instance.parent.clone(), true)
        }
    }
}

/// Stamps prefab instances into the store.
#[derive(Debug)]
pub struct PrefabExpander {
    rng: Rng,
    max_depth: usize,
}

impl PrefabExpander {
    pub fn new(seed: u64, max_depth: usize) -> Self {
        PrefabExpander {
            rng: Rng::with_seed(seed),
            max_depth,
        }
    }

    /// A fresh id unused by the store and by `reserved`.
    pub fn fresh_id(&mut self, store: &DataStore, reserved: &FxHashSet<String>) -> String {
        loop {
            let id: String = (0..COPY_ID_LEN).map(|_| self.rng.alphanumeric()).collect();
            if !store.id_in_use(&id) && !reserved.contains(&id) {
                return id;
            }
        }
    }

    /// Expand an unexpanded instance. Already expanded instances and missing
    /// templates contribute nothing.
    pub fn expand(&mut self, store: &mut DataStore, key: PrefabObjectKey) -> PrefabKeys {
        let mut stack = Vec::new();
        self.expand_at(store, key, 0, &mut stack)
    }

    fn expand_at(
        &mut self,
        store: &mut DataStore,
        key: PrefabObjectKey,
        depth: usize,
        stack: &mut Vec<String>,
    ) -> PrefabKeys {
        let mut keys = PrefabKeys::default();
        let Some(instance) = store.prefab_object(key).cloned() else {
            return keys;
        };
        if instance.is_expanded() {
            debug!("prefab object '{}' is already expanded", instance.id);
            return keys;
        }
        let Some(prefab) = store.prefab_by_id(&instance.prefab_id).cloned() else {
            warn!(
                "Prefab object '{}' references missing prefab '{}', nothing expanded",
                instance.id, instance.prefab_id
            );
            return keys;
        };
        if stack.contains(&prefab.id) {
            warn!(
                "Prefab '{}' instantiates itself through '{}', nothing expanded",
                prefab.id, instance.id
            );
            return keys;
        }
        if depth > self.max_depth {
            warn!(
                "Prefab object '{}' is nested deeper than {}, nothing expanded",
                instance.id, self.max_depth
            );
            return keys;
        }

        let speed = instance.effective_speed();
        let ceiling = instance.autokill.ceiling(instance.start_time, prefab.offset);
        let mut expanded = Vec::new();

        for i in 0..=instance.repeat_count {
            let stamp = Stamp {
                instance: &instance,
                prefab: &prefab,
                speed,
                shift: i as f32 * instance.repeat_offset_time,
                ceiling,
            };
            let mut reserved = FxHashSet::default();
            let mut ids: FxHashMap<String, String> = FxHashMap::default();
            let templates = prefab
                .objects
                .iter()
                .map(|o| &o.id)
                .chain(prefab.backgrounds.iter().map(|b| &b.id))
                .chain(prefab.prefab_objects.iter().map(|p| &p.id));
            for template_id in templates {
                let id = self.fresh_id(store, &reserved);
                reserved.insert(id.clone());
                ids.insert(template_id.clone(), id);
            }

            for template in prefab.objects.iter() {
                let Some(id) = ids.get(&template.id).cloned() else {
                    continue;
                };
                let mut copy = template.clone();
                copy.start_time = stamp.start(template.start_time);
                copy.keyframes.scale_time(speed);
                let (parent, base) = stamp.parent(store, &template.parent, &ids, &template.id);
                copy.parent = parent;
                if base && !instance.parent.is_none() {
                    copy.parent_settings = instance.parent_settings;
                }
                let rule =
                    stamp.autokill(&template.autokill, template.start_time, copy.start_time, &ids);
                (copy.autokill, copy.kill_ceiling) =
                    stamp.clamp(rule, copy.start_time, &copy.keyframes);
                copy.original_id = Some(template.id.clone());
                copy.prefab_id = Some(prefab.id.clone());
                copy.prefab_instance_id = Some(instance.id.clone());
                copy.id = id.clone();
                keys.objects.push(store.insert_object(copy));
                expanded.push(id);
            }

            for template in prefab.backgrounds.iter() {
                let Some(id) = ids.get(&template.id).cloned() else {
                    continue;
                };
                let mut copy = template.clone();
                copy.start_time = stamp.start(template.start_time);
                copy.keyframes.scale_time(speed);
                let rule =
                    stamp.autokill(&template.autokill, template.start_time, copy.start_time, &ids);
                (copy.autokill, copy.kill_ceiling) =
                    stamp.clamp(rule, copy.start_time, &copy.keyframes);
                copy.original_id = Some(template.id.clone());
                copy.prefab_id = Some(prefab.id.clone());
                copy.prefab_instance_id = Some(instance.id.clone());
                copy.id = id.clone();
                keys.backgrounds.push(store.insert_background(copy));
                expanded.push(id);
            }

            for template in prefab.prefab_objects.iter() {
                let Some(id) = ids.get(&template.id).cloned() else {
                    continue;
                };
                let mut copy = template.clone();
                copy.start_time = stamp.start(template.start_time);
                copy.speed = template.effective_speed() * speed;
                let (parent, base) = stamp.parent(store, &template.parent, &ids, &template.id);
                copy.parent = parent;
                if base && !instance.parent.is_none() {
                    copy.parent_settings = instance.parent_settings;
                }
                copy.autokill = nested_autokill(template, &copy, ceiling, speed, store);
                copy.original_id = Some(template.id.clone());
                copy.prefab_instance_id = Some(instance.id.clone());
                copy.expanded.clear();
                copy.state = ExpansionState::Unexpanded;
                copy.id = id.clone();
                keys.prefab_objects.push(store.insert_prefab_object(copy));
                expanded.push(id);
            }
        }

        if let Some(po) = store.prefab_object_mut(key) {
            po.expanded = expanded;
            po.state = ExpansionState::Expanded;
        }
        info!(
            "expanded prefab object '{}' ({} x '{}'): {} copies",
            instance.id,
            instance.repeat_count + 1,
            prefab.id,
            keys.len()
        );

        stack.push(prefab.id.clone());
        let nested = keys.prefab_objects.clone();
        for nested_key in nested {
            let inner = self.expand_at(store, nested_key, depth + 1, stack);
            keys.extend(inner);
        }
        stack.pop();

        keys
    }

    /// Remove every record stamped by the instance, nested instances first,
    /// and mark it unexpanded. Returns the removed keys.
    pub fn collapse(store: &mut DataStore, key: PrefabObjectKey) -> PrefabKeys {
        let mut removed = PrefabKeys::default();
        let Some(instance_id) = store.prefab_object(key).map(|po| po.id.clone()) else {
            return removed;
        };
        let owned = |owner: &Option<String>| owner.as_deref() == Some(instance_id.as_str());

        let nested: Vec<PrefabObjectKey> = store
            .prefab_objects()
            .filter(|(_, po)| owned(&po.prefab_instance_id))
            .map(|(k, _)| k)
            .collect();
        for nested_key in nested {
            removed.extend(Self::collapse(store, nested_key));
            store.remove_prefab_object(nested_key);
            removed.prefab_objects.push(nested_key);
        }

        let objects: Vec<ObjectKey> = store
            .objects()
            .filter(|(_, o)| owned(&o.prefab_instance_id))
            .map(|(k, _)| k)
            .collect();
        for object_key in objects {
            store.remove_object(object_key);
            removed.objects.push(object_key);
        }

        let backgrounds: Vec<BackgroundKey> = store
            .backgrounds()
            .filter(|(_, b)| owned(&b.prefab_instance_id))
            .map(|(k, _)| k)
            .collect();
        for background_key in backgrounds {
            store.remove_background(background_key);
            removed.backgrounds.push(background_key);
        }

        if let Some(po) = store.prefab_object_mut(key) {
            po.expanded.clear();
            po.state = ExpansionState::Unexpanded;
        }
        info!(
            "collapsed prefab object '{}': {} records removed",
            instance_id,
            removed.len()
        );
        removed
    }

    /// Re-derive the parents of an expanded instance's base copies after the
    /// instance's own parent changed. Returns the reparented copies.
    pub fn reparent_base_copies(store: &mut DataStore, key: PrefabObjectKey) -> Vec<ObjectKey> {
        let Some(instance) = store.prefab_object(key).cloned() else {
            return Vec::new();
        };
        let Some(prefab) = store.prefab_by_id(&instance.prefab_id).cloned() else {
            return Vec::new();
        };
        let copies: Vec<ObjectKey> = store
            .objects()
            .filter(|(_, o)| o.prefab_instance_id.as_deref() == Some(instance.id.as_str()))
            .map(|(k, _)| k)
            .collect();

        let mut changed = Vec::new();
        for copy_key in copies {
            let Some(template) = store
                .object(copy_key)
                .and_then(|c| c.original_id.as_deref())
                .and_then(|tid| prefab.objects.iter().find(|t| t.id == tid))
            else {
                continue;
            };
            let internal = template
                .parent
                .object_id()
                .is_some_and(|pid| prefab.contains_object(pid));
            if internal {
                continue;
            }
            let (parent, settings) = if instance.parent.is_none() {
                let parent = match &template.parent {
                    ParentRef::Object(pid) if store.object_key(pid).is_none() => ParentRef::None,
                    other => other.clone(),
                };
                (parent, template.parent_settings)
            } else {
                (instance.parent.clone(), instance.parent_settings)
            };
            if let Some(copy) = store.object_mut(copy_key) {
                copy.parent = parent;
                copy.parent_settings = settings;
                changed.push(copy_key);
            }
        }
        changed
    }
}

/// Lifetime policy of a nested instance copy under an outer ceiling.
fn nested_autokill(
    template: &PrefabObject,
    copy: &PrefabObject,
    outer: Option<f32>,
    speed: f32,
    store: &DataStore,
) -> PrefabAutoKill {
    let offset = store
        .prefab_by_id(&template.prefab_id)
        .map(|p| p.offset)
        .unwrap_or(0.0);
    let own = match template.autokill {
        PrefabAutoKill::StartOffset { offset: o } => {
            PrefabAutoKill::StartOffset { offset: o / speed }.ceiling(copy.start_time, offset)
        }
        rule => rule.ceiling(copy.start_time, offset),
    };
    match (own, outer) {
        (Some(a), Some(b)) => PrefabAutoKill::SongTime { time: a.min(b) },
        (Some(a), None) => PrefabAutoKill::SongTime { time: a },
        (None, Some(b)) => PrefabAutoKill::SongTime { time: b },
        (None, None) => PrefabAutoKill::Regular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::background::BackgroundObject;
    use crate::components::object::LevelObject;
    use crate::components::parentlink::ParentSettings;

    fn store_with(prefab: Prefab, instance: PrefabObject) -> (DataStore, PrefabObjectKey) {
        let mut store = DataStore::new();
        store.insert_prefab(prefab);
        let key = store.insert_prefab_object(instance);
        (store, key)
    }

    fn starts(store: &DataStore, keys: &PrefabKeys) -> Vec<f32> {
        let mut s: Vec<f32> = keys
            .objects
            .iter()
            .filter_map(|k| store.object(*k))
            .map(|o| o.start_time)
            .collect();
        s.sort_by(f32::total_cmp);
        s
    }

    #[test]
    fn repeats_shift_start_times() {
        let prefab = Prefab::new("p").with_object(
            LevelObject::new("t", 0.0).with_autokill(AutoKill::FixedTime { duration: 2.0 }),
        );
        let instance = PrefabObject::new("i", "p", 10.0).with_repeat(2, 5.0);
        let (mut store, key) = store_with(prefab, instance);
        let mut expander = PrefabExpander::new(1, 8);
        let keys = expander.expand(&mut store, key);
        assert_eq!(starts(&store, &keys), vec![10.0, 15.0, 20.0]);
        let po = store.prefab_object(key).unwrap();
        assert!(po.is_expanded());
        assert_eq!(po.expanded.len(), 3);
    }

    #[test]
    fn speed_divides_template_time() {
        let mut prefab = Prefab::new("p").with_object(LevelObject::new("t", 4.0));
        prefab.offset = 1.0;
        let instance = PrefabObject::new("i", "p", 10.0).with_speed(2.0);
        let (mut store, key) = store_with(prefab, instance);
        let mut expander = PrefabExpander::new(1, 8);
        let keys = expander.expand(&mut store, key);
        assert_eq!(starts(&store, &keys), vec![13.0]);
    }

    #[test]
    fn copies_point_back_at_instance_and_template() {
        let prefab = Prefab::new("p").with_object(LevelObject::new("t", 0.0));
        let (mut store, key) = store_with(prefab, PrefabObject::new("i", "p", 0.0));
        let mut expander = PrefabExpander::new(7, 8);
        let keys = expander.expand(&mut store, key);
        let copy = store.object(keys.objects[0]).unwrap();
        assert_eq!(copy.id.len(), COPY_ID_LEN);
        assert_eq!(copy.original_id.as_deref(), Some("t"));
        assert_eq!(copy.prefab_instance_id.as_deref(), Some("i"));
        assert_eq!(copy.prefab_id.as_deref(), Some("p"));
    }

    #[test]
    fn internal_parents_are_remapped_per_iteration() {
        let prefab = Prefab::new("p")
            .with_object(LevelObject::new("root", 0.0))
            .with_object(
                LevelObject::new("kid", 0.0).with_parent(ParentRef::Object("root".into())),
            );
        let instance = PrefabObject::new("i", "p", 0.0).with_repeat(1, 1.0);
        let (mut store, key) = store_with(prefab, instance);
        let mut expander = PrefabExpander::new(3, 8);
        expander.expand(&mut store, key);
        for (_, kid) in store.objects().filter(|(_, o)| o.original_id.as_deref() == Some("kid")) {
            let parent = store.object_by_id(kid.parent.object_id().unwrap()).unwrap();
            assert_eq!(parent.original_id.as_deref(), Some("root"));
            assert_eq!(parent.start_time, kid.start_time);
        }
    }

    #[test]
    fn dangling_template_parent_is_cleared() {
        let prefab = Prefab::new("p").with_object(
            LevelObject::new("t", 0.0).with_parent(ParentRef::Object("nowhere".into())),
        );
        let (mut store, key) = store_with(prefab, PrefabObject::new("i", "p", 0.0));
        let keys = PrefabExpander::new(1, 8).expand(&mut store, key);
        assert!(store.object(keys.objects[0]).unwrap().parent.is_none());
    }

    #[test]
    fn base_copies_take_instance_parent() {
        let mut store = DataStore::new();
        store.insert_object(LevelObject::new("anchor", 0.0));
        store.insert_prefab(Prefab::new("p").with_object(LevelObject::new("t", 0.0)));
        let key = store.insert_prefab_object(
            PrefabObject::new("i", "p", 0.0)
                .with_parent(ParentRef::Object("anchor".into()), ParentSettings::all()),
        );
        let keys = PrefabExpander::new(1, 8).expand(&mut store, key);
        let copy = store.object(keys.objects[0]).unwrap();
        assert_eq!(copy.parent.object_id(), Some("anchor"));
        assert_eq!(copy.parent_settings, ParentSettings::all());
    }

    #[test]
    fn ceiling_overrides_longer_copies() {
        let prefab = Prefab::new("p")
            .with_object(LevelObject::new("long", 0.0).with_autokill(AutoKill::Forever))
            .with_object(
                LevelObject::new("short", 0.0)
                    .with_autokill(AutoKill::FixedTime { duration: 1.0 }),
            );
        let instance = PrefabObject::new("i", "p", 2.0)
            .with_autokill(PrefabAutoKill::StartOffset { offset: 3.0 });
        let (mut store, key) = store_with(prefab, instance);
        PrefabExpander::new(1, 8).expand(&mut store, key);
        let long = store
            .objects()
            .find(|(_, o)| o.original_id.as_deref() == Some("long"))
            .map(|(_, o)| o.autokill.clone());
        let short = store
            .objects()
            .find(|(_, o)| o.original_id.as_deref() == Some("short"))
            .map(|(_, o)| o.autokill.clone());
        assert_eq!(long, Some(AutoKill::SongTime { time: 5.0 }));
        assert_eq!(short, Some(AutoKill::FixedTime { duration: 1.0 }));
    }

    #[test]
    fn ceiling_bounds_level_resolved_rules_without_rewriting_them() {
        let prefab = Prefab::new("p")
            .with_object(
                LevelObject::new("target", 0.0)
                    .with_autokill(AutoKill::FixedTime { duration: 1.0 }),
            )
            .with_object(
                LevelObject::new("follower", 0.0)
                    .with_autokill(AutoKill::WithObject { id: "target".into() }),
            )
            .with_object(LevelObject::new("song", 0.0).with_autokill(AutoKill::SongLength));
        let instance = PrefabObject::new("i", "p", 0.0)
            .with_autokill(PrefabAutoKill::StartOffset { offset: 10.0 });
        let (mut store, key) = store_with(prefab, instance);
        PrefabExpander::new(1, 8).expand(&mut store, key);
        let copy = |template: &str| {
            store
                .objects()
                .find(|(_, o)| o.original_id.as_deref() == Some(template))
                .map(|(_, o)| (o.autokill.clone(), o.kill_ceiling))
        };
        let target_id = store
            .objects()
            .find(|(_, o)| o.original_id.as_deref() == Some("target"))
            .map(|(_, o)| o.id.clone())
            .unwrap();
        assert_eq!(
            copy("follower"),
            Some((AutoKill::WithObject { id: target_id }, Some(10.0)))
        );
        assert_eq!(copy("song"), Some((AutoKill::SongLength, Some(10.0))));
        assert_eq!(
            copy("target"),
            Some((AutoKill::FixedTime { duration: 1.0 }, None))
        );
    }

    #[test]
    fn missing_template_expands_nothing() {
        let mut store = DataStore::new();
        let key = store.insert_prefab_object(PrefabObject::new("i", "gone", 0.0));
        let keys = PrefabExpander::new(1, 8).expand(&mut store, key);
        assert!(keys.is_empty());
        assert!(!store.prefab_object(key).unwrap().is_expanded());
    }

    #[test]
    fn collapse_removes_every_copy_including_nested() {
        let mut store = DataStore::new();
        store.insert_prefab(Prefab::new("inner").with_object(LevelObject::new("leaf", 0.0)));
        store.insert_prefab(
            Prefab::new("outer")
                .with_object(LevelObject::new("t", 0.0))
                .with_background(BackgroundObject::new("bg", 0.0))
                .with_prefab_object(PrefabObject::new("nested", "inner", 1.0)),
        );
        let key = store.insert_prefab_object(PrefabObject::new("i", "outer", 0.0));
        let keys = PrefabExpander::new(5, 8).expand(&mut store, key);
        assert_eq!(store.object_count(), 2);
        assert_eq!(keys.prefab_objects.len(), 1);

        let removed = PrefabExpander::collapse(&mut store, key);
        assert_eq!(removed.objects.len(), 2);
        assert_eq!(removed.backgrounds.len(), 1);
        assert_eq!(removed.prefab_objects.len(), 1);
        assert_eq!(store.object_count(), 0);
        assert!(store.objects().all(|(_, o)| o.prefab_instance_id.is_none()));
        assert!(!store.prefab_object(key).unwrap().is_expanded());
    }

    #[test]
    fn self_nesting_stops() {
        let mut store = DataStore::new();
        store.insert_prefab(
            Prefab::new("loop")
                .with_object(LevelObject::new("t", 0.0))
                .with_prefab_object(PrefabObject::new("again", "loop", 0.0)),
        );
        let key = store.insert_prefab_object(PrefabObject::new("i", "loop", 0.0));
        let keys = PrefabExpander::new(1, 8).expand(&mut store, key);
        assert_eq!(keys.objects.len(), 1);
        assert_eq!(keys.prefab_objects.len(), 1);
    }

    #[test]
    fn same_seed_gives_same_ids() {
        let prefab = Prefab::new("p").with_object(LevelObject::new("t", 0.0));
        let (mut a, ka) = store_with(prefab.clone(), PrefabObject::new("i", "p", 0.0));
        let (mut b, kb) = store_with(prefab, PrefabObject::new("i", "p", 0.0));
        let ia = PrefabExpander::new(42, 8).expand(&mut a, ka);
        let ib = PrefabExpander::new(42, 8).expand(&mut b, kb);
        assert_eq!(
            a.object(ia.objects[0]).map(|o| o.id.clone()),
            b.object(ib.objects[0]).map(|o| o.id.clone())
        );
    }
}
