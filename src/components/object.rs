//! Declarative level objects.
//!
//! A [`LevelObject`] is the authored description of something that appears on
//! the timeline: when it spawns, how long it lives, what it is parented to and
//! how it animates. The runtime never mutates these on its own; the editor (or
//! the prefab expander) does, and then asks the level for a sparse update.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::keyframe::Keyframes;
use crate::components::modifier::ModifierBundle;
use crate::components::parentlink::ParentSettings;

/// What an object is parented to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    #[default]
    None,
    /// Follows the camera.
    Camera,
    /// Follows another object by id.
    Object(String),
}

impl ParentRef {
    pub fn object_id(&self) -> Option<&str> {
        match self {
            ParentRef::Object(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParentRef::None)
    }
}

/// Rule deciding when an object is killed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoKill {
    /// Lives for ever.
    Forever,
    /// Killed when the song ends.
    SongLength,
    /// Killed `duration` seconds after spawning.
    FixedTime { duration: f32 },
    /// Killed at an absolute song time.
    SongTime { time: f32 },
    /// Killed `offset` seconds after its last keyframe.
    #[default]
    LastKeyframe,
    LastKeyframeOffset { offset: f32 },
    /// Killed together with another object.
    WithObject { id: String },
}

impl AutoKill {
    /// Kill time for a self-contained rule.
    ///
    /// [`AutoKill::WithObject`] cannot be resolved without the level data and
    /// yields infinity here; the object converter resolves it.
    pub fn kill_time(
        &self,
        start_time: f32,
        sequence_length: f32,
        song_length: Option<f32>,
    ) -> f32 {
        match self {
            AutoKill::Forever | AutoKill::WithObject { .. } => f32::INFINITY,
            AutoKill::SongLength => song_length.unwrap_or(f32::INFINITY),
            AutoKill::FixedTime { duration } => start_time + duration,
            AutoKill::SongTime { time } => *time,
            AutoKill::LastKeyframe => start_time + sequence_length,
            AutoKill::LastKeyframeOffset { offset } => start_time + sequence_length + offset,
        }
    }

    /// Whether the rule depends on the animation length.
    pub fn uses_keyframes(&self) -> bool {
        matches!(
            self,
            AutoKill::LastKeyframe | AutoKill::LastKeyframeOffset { .. }
        )
    }
}

/// Semantic role of an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Normal,
    /// Visible but harmless.
    Helper,
    Decoration,
    Solid,
    /// Purely structural: exists for parenting and modifiers, never drawn.
    Empty,
}

/// What the visual factory should draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Polygon { sides: u32, roundness: f32 },
    Text { text: String },
    Image { path: String },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Polygon {
            sides: 4,
            roundness: 0.0,
        }
    }
}

impl Shape {
    /// External asset the payload needs, if any.
    pub fn asset(&self) -> Option<&str> {
        match self {
            Shape::Image { path } => Some(path),
            _ => None,
        }
    }
}

/// An authored, timed object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelObject {
    pub id: String,
    pub name: String,
    pub kind: ObjectKind,
    pub shape: Shape,
    pub parent: ParentRef,
    pub parent_settings: ParentSettings,
    pub start_time: f32,
    pub autokill: AutoKill,
    pub origin: Vec2,
    pub depth: i32,
    pub keyframes: Keyframes,
    pub modifiers: ModifierBundle,
    /// Hidden in the editor.
    pub hidden: bool,
    pub selectable: bool,
    /// Prefab this object was stamped from.
    pub prefab_id: Option<String>,
    /// Prefab instance that owns this copy.
    pub prefab_instance_id: Option<String>,
    /// Template object this copy was made from.
    pub original_id: Option<String>,
    /// Latest kill time allowed by the owning prefab instance.
    pub kill_ceiling: Option<f32>,
}

impl Default for LevelObject {
    fn default() -> Self {
        LevelObject {
            id: String::new(),
            name: String::new(),
            kind: ObjectKind::Normal,
            shape: Shape::default(),
            parent: ParentRef::None,
            parent_settings: ParentSettings::default(),
            start_time: 0.0,
            autokill: AutoKill::LastKeyframe,
            origin: Vec2::ZERO,
            depth: 0,
            keyframes: Keyframes::default(),
            modifiers: ModifierBundle::default(),
            hidden: false,
            selectable: true,
            prefab_id: None,
            prefab_instance_id: None,
            original_id: None,
            kill_ceiling: None,
        }
    }
}

impl LevelObject {
    pub fn new(id: impl Into<String>, start_time: f32) -> Self {
        LevelObject {
            id: id.into(),
            start_time,
            ..Default::default()
        }
    }

    pub fn with_autokill(mut self, autokill: AutoKill) -> Self {
        self.autokill = autokill;
        self
    }

    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_keyframes(mut self, keyframes: Keyframes) -> Self {
        self.keyframes = keyframes;
        self
    }

    pub fn with_parent_settings(mut self, settings: ParentSettings) -> Self {
        self.parent_settings = settings;
        self
    }

    pub fn is_prefab_copy(&self) -> bool {
        self.prefab_instance_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_time_per_rule() {
        assert_eq!(AutoKill::Forever.kill_time(1.0, 5.0, Some(60.0)), f32::INFINITY);
        assert_eq!(AutoKill::SongLength.kill_time(1.0, 5.0, Some(60.0)), 60.0);
        assert_eq!(AutoKill::SongLength.kill_time(1.0, 5.0, None), f32::INFINITY);
        assert_eq!(AutoKill::FixedTime { duration: 2.0 }.kill_time(1.0, 5.0, None), 3.0);
        assert_eq!(AutoKill::SongTime { time: 9.0 }.kill_time(1.0, 5.0, None), 9.0);
        assert_eq!(AutoKill::LastKeyframe.kill_time(1.0, 5.0, None), 6.0);
        assert_eq!(
            AutoKill::LastKeyframeOffset { offset: 0.5 }.kill_time(1.0, 5.0, None),
            6.5
        );
    }

    #[test]
    fn default_object_is_selectable_and_parentless() {
        let obj = LevelObject::new("a", 2.0);
        assert!(obj.selectable);
        assert!(obj.parent.is_none());
        assert!(!obj.is_prefab_copy());
    }

    #[test]
    fn parent_ref_deserializes_from_json() {
        let p: ParentRef = serde_json::from_str(r#"{"object":"abc"}"#).unwrap();
        assert_eq!(p.object_id(), Some("abc"));
        let c: ParentRef = serde_json::from_str(r#""camera""#).unwrap();
        assert_eq!(c, ParentRef::Camera);
    }
}
