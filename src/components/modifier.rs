//! Modifier declarations attached to objects, backgrounds and prefab objects.
//!
//! The engine never interprets a modifier. It only decides *when* a bundle is
//! live and sequences the [`ModifierRuntime`](crate::resources::modifiers::ModifierRuntime)
//! calls accordingly.

use serde::{Deserialize, Serialize};

/// Whether a modifier tests a condition or performs an effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Trigger,
    #[default]
    Action,
}

/// A single named modifier with its raw argument list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
    pub values: Vec<String>,
    /// Inverts a trigger result.
    pub not: bool,
}

impl Modifier {
    pub fn action(name: impl Into<String>) -> Self {
        Modifier {
            name: name.into(),
            kind: ModifierKind::Action,
            ..Default::default()
        }
    }

    pub fn trigger(name: impl Into<String>) -> Self {
        Modifier {
            name: name.into(),
            kind: ModifierKind::Trigger,
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// The modifiers of one owner plus how their lifetime is bound.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierBundle {
    pub modifiers: Vec<Modifier>,
    /// Run for the whole level instead of only while the owner is alive.
    pub ignore_lifespan: bool,
}

impl ModifierBundle {
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

/// Who a modifier bundle belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModifierOwner {
    Object(String),
    Background(String),
    PrefabObject(String),
}

impl ModifierOwner {
    pub fn id(&self) -> &str {
        match self {
            ModifierOwner::Object(id)
            | ModifierOwner::Background(id)
            | ModifierOwner::PrefabObject(id) => id,
        }
    }
}
