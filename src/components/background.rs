//! Declarative background objects.
//!
//! Backgrounds are scheduled exactly like level objects but never take part
//! in parent chains: their transform is a fixed base plus an optional
//! animated offset.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::keyframe::Keyframes;
use crate::components::modifier::ModifierBundle;
use crate::components::object::{AutoKill, Shape};
use crate::components::transform::WorldTransform;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundObject {
    pub id: String,
    pub name: String,
    pub shape: Shape,
    pub start_time: f32,
    pub autokill: AutoKill,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub depth: i32,
    /// Animated offset on top of the base transform.
    pub keyframes: Keyframes,
    pub modifiers: ModifierBundle,
    pub hidden: bool,
    pub prefab_id: Option<String>,
    pub prefab_instance_id: Option<String>,
    pub original_id: Option<String>,
    /// Latest kill time allowed by the owning prefab instance.
    pub kill_ceiling: Option<f32>,
}

impl Default for BackgroundObject {
    fn default() -> Self {
        BackgroundObject {
            id: String::new(),
            name: String::new(),
            shape: Shape::default(),
            start_time: 0.0,
            autokill: AutoKill::Forever,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            depth: 0,
            keyframes: Keyframes::default(),
            modifiers: ModifierBundle::default(),
            hidden: false,
            prefab_id: None,
            prefab_instance_id: None,
            original_id: None,
            kill_ceiling: None,
        }
    }
}

impl BackgroundObject {
    pub fn new(id: impl Into<String>, start_time: f32) -> Self {
        BackgroundObject {
            id: id.into(),
            start_time,
            ..Default::default()
        }
    }

    pub fn with_autokill(mut self, autokill: AutoKill) -> Self {
        self.autokill = autokill;
        self
    }

    pub fn base_transform(&self) -> WorldTransform {
        WorldTransform::new(self.position, self.rotation, self.scale)
    }
}
