//! Prefab templates and prefab instances.
//!
//! A [`Prefab`] is an immutable bag of template objects. A [`PrefabObject`]
//! stamps that template onto the timeline one or more times, shifted in time
//! and optionally sped up, parented and transformed as a rigid unit.
//!
//! # Lifecycle
//!
//! ```text
//! Unexpanded --expand--> Expanded --collapse--> Unexpanded --expand--> Expanded
//! ```
//!
//! There is no partial state. See [`crate::systems::prefab`] for the expander.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::background::BackgroundObject;
use crate::components::modifier::ModifierBundle;
use crate::components::object::{LevelObject, ParentRef};
use crate::components::parentlink::ParentSettings;
use crate::components::transform::WorldTransform;

/// A reusable template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefab {
    pub id: String,
    pub name: String,
    /// Added to every copy's start time.
    pub offset: f32,
    pub objects: Vec<LevelObject>,
    pub backgrounds: Vec<BackgroundObject>,
    /// Nested instances of other prefabs.
    pub prefab_objects: Vec<PrefabObject>,
}

impl Prefab {
    pub fn new(id: impl Into<String>) -> Self {
        Prefab {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_object(mut self, object: LevelObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_background(mut self, background: BackgroundObject) -> Self {
        self.backgrounds.push(background);
        self
    }

    pub fn with_prefab_object(mut self, prefab_object: PrefabObject) -> Self {
        self.prefab_objects.push(prefab_object);
        self
    }

    /// Whether `id` names one of this template's objects.
    pub fn contains_object(&self, id: &str) -> bool {
        self.objects.iter().any(|o| o.id == id)
    }
}

/// Lifetime ceiling of a prefab instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefabAutoKill {
    /// Every copy keeps its own lifetime.
    #[default]
    Regular,
    /// Copies die `offset` seconds after the instance starts.
    StartOffset { offset: f32 },
    /// Copies die at an absolute song time.
    SongTime { time: f32 },
}

impl PrefabAutoKill {
    /// Ceiling applied to every copy, `None` for [`PrefabAutoKill::Regular`].
    pub fn ceiling(&self, instance_start: f32, prefab_offset: f32) -> Option<f32> {
        match self {
            PrefabAutoKill::Regular => None,
            PrefabAutoKill::StartOffset { offset } => Some(instance_start + prefab_offset + offset),
            PrefabAutoKill::SongTime { time } => Some(*time),
        }
    }
}

/// Static transform applied to the base copies of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabTransform {
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

impl Default for PrefabTransform {
    fn default() -> Self {
        PrefabTransform {
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

impl PrefabTransform {
    pub fn is_identity(&self) -> bool {
        *self == PrefabTransform::default()
    }

    pub fn to_world(&self) -> WorldTransform {
        WorldTransform::new(self.position, self.rotation, self.scale)
    }
}

/// Expansion state of an instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpansionState {
    #[default]
    Unexpanded,
    Expanded,
}

/// A live instance of a prefab.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabObject {
    pub id: String,
    pub prefab_id: String,
    pub start_time: f32,
    pub speed: f32,
    /// Extra copies after the first one.
    pub repeat_count: u32,
    pub repeat_offset_time: f32,
    pub autokill: PrefabAutoKill,
    /// External parent for the base copies.
    pub parent: ParentRef,
    pub parent_settings: ParentSettings,
    pub transform: PrefabTransform,
    pub modifiers: ModifierBundle,
    /// Set on instances stamped out of another prefab.
    pub prefab_instance_id: Option<String>,
    pub original_id: Option<String>,
    /// Ids of everything currently stamped out for this instance.
    #[serde(skip)]
    pub expanded: Vec<String>,
    #[serde(skip)]
    pub state: ExpansionState,
}

impl Default for PrefabObject {
    fn default() -> Self {
        PrefabObject {
            id: String::new(),
            prefab_id: String::new(),
            start_time: 0.0,
            speed: 1.0,
            repeat_count: 0,
            repeat_offset_time: 1.0,
            autokill: PrefabAutoKill::Regular,
            parent: ParentRef::None,
            parent_settings: ParentSettings::default(),
            transform: PrefabTransform::default(),
            modifiers: ModifierBundle::default(),
            prefab_instance_id: None,
            original_id: None,
            expanded: Vec::new(),
            state: ExpansionState::Unexpanded,
        }
    }
}

impl PrefabObject {
    pub fn new(id: impl Into<String>, prefab_id: impl Into<String>, start_time: f32) -> Self {
        PrefabObject {
            id: id.into(),
            prefab_id: prefab_id.into(),
            start_time,
            ..Default::default()
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_repeat(mut self, count: u32, offset_time: f32) -> Self {
        self.repeat_count = count;
        self.repeat_offset_time = offset_time;
        self
    }

    pub fn with_autokill(mut self, autokill: PrefabAutoKill) -> Self {
        self.autokill = autokill;
        self
    }

    pub fn with_parent(mut self, parent: ParentRef, settings: ParentSettings) -> Self {
        self.parent = parent;
        self.parent_settings = settings;
        self
    }

    /// Speed used for time scaling; non-positive speeds fall back to 1.
    pub fn effective_speed(&self) -> f32 {
        if self.speed > 0.0 && self.speed.is_finite() {
            self.speed
        } else {
            1.0
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.state == ExpansionState::Expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_per_policy() {
        assert_eq!(PrefabAutoKill::Regular.ceiling(10.0, 1.0), None);
        assert_eq!(
            PrefabAutoKill::StartOffset { offset: 3.0 }.ceiling(10.0, 1.0),
            Some(14.0)
        );
        assert_eq!(PrefabAutoKill::SongTime { time: 7.0 }.ceiling(10.0, 1.0), Some(7.0));
    }

    #[test]
    fn invalid_speed_falls_back_to_one() {
        let po = PrefabObject::new("p", "t", 0.0).with_speed(0.0);
        assert_eq!(po.effective_speed(), 1.0);
        let po = PrefabObject::new("p", "t", 0.0).with_speed(2.0);
        assert_eq!(po.effective_speed(), 2.0);
    }

    #[test]
    fn defaults_match_authoring_defaults() {
        let po = PrefabObject::new("p", "t", 0.0);
        assert_eq!(po.repeat_count, 0);
        assert_eq!(po.repeat_offset_time, 1.0);
        assert!(!po.is_expanded());
        assert!(po.transform.is_identity());
    }
}
