//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};

use aberredlevel::components::keyframe::{Keyframe, Keyframes};
use aberredlevel::components::modifier::{Modifier, ModifierBundle, ModifierOwner};
use aberredlevel::components::object::{AutoKill, LevelObject, Shape};
use aberredlevel::components::transform::WorldTransform;
use aberredlevel::error::LevelError;
use aberredlevel::events::action::LevelAction;
use aberredlevel::resources::datastore::DataStore;
use aberredlevel::resources::levelconfig::LevelConfig;
use aberredlevel::resources::modifiers::{BundleHandle, ModifierRuntime, ModifierTick};
use aberredlevel::resources::spectrum::SpectrumSnapshot;
use aberredlevel::resources::visuals::{VisualFactory, VisualHandle, VisualSource};
use aberredlevel::systems::level::LevelContext;

pub const EPSILON: f32 = 1e-4;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Modifier name that makes [`RecordingModifiers`] delete the owner on tick.
pub const DELETE_OWNER: &str = "delete_owner";

/// Image path [`RecordingVisuals`] refuses to build.
pub const MISSING_IMAGE: &str = "missing.png";

#[derive(Debug, Default)]
pub struct RecordingVisuals {
    next: u64,
    pub ids: FxHashMap<u64, String>,
    pub live: FxHashSet<u64>,
    pub active: FxHashSet<u64>,
    pub hidden: FxHashSet<u64>,
    pub depth: FxHashMap<u64, i32>,
    pub updates: FxHashMap<u64, (WorldTransform, f32)>,
    pub created: Vec<String>,
    pub destroyed: Vec<String>,
}

impl RecordingVisuals {
    /// Live handle built for `id`, if any.
    pub fn handle_of(&self, id: &str) -> Option<u64> {
        self.live
            .iter()
            .copied()
            .find(|h| self.ids.get(h).is_some_and(|i| i == id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.handle_of(id).is_some_and(|h| self.active.contains(&h))
    }

    pub fn last_update(&self, id: &str) -> Option<(WorldTransform, f32)> {
        self.handle_of(id).and_then(|h| self.updates.get(&h).copied())
    }
}

impl VisualFactory for RecordingVisuals {
    fn create(&mut self, source: VisualSource<'_>) -> Result<VisualHandle, LevelError> {
        let shape = match source {
            VisualSource::Object(o) => &o.shape,
            VisualSource::Background(b) => &b.shape,
        };
        if shape.asset() == Some(MISSING_IMAGE) {
            return Err(LevelError::MissingAsset(MISSING_IMAGE.to_string()));
        }
        self.next += 1;
        self.ids.insert(self.next, source.id().to_string());
        self.live.insert(self.next);
        self.created.push(source.id().to_string());
        Ok(VisualHandle(self.next))
    }

    fn destroy(&mut self, handle: VisualHandle) {
        assert!(self.live.remove(&handle.0), "double destroy of {}", handle.0);
        self.active.remove(&handle.0);
        if let Some(id) = self.ids.get(&handle.0) {
            self.destroyed.push(id.clone());
        }
    }

    fn set_active(&mut self, handle: VisualHandle, active: bool) {
        assert!(self.live.contains(&handle.0), "inactive handle {}", handle.0);
        if active {
            assert!(self.active.insert(handle.0), "double activation of {}", handle.0);
        } else {
            assert!(self.active.remove(&handle.0), "double deactivation of {}", handle.0);
        }
    }

    fn update(&mut self, handle: VisualHandle, transform: &WorldTransform, color: f32) {
        assert!(self.active.contains(&handle.0), "update of inactive {}", handle.0);
        self.updates.insert(handle.0, (*transform, color));
    }

    fn set_hidden(&mut self, handle: VisualHandle, hidden: bool) {
        if hidden {
            self.hidden.insert(handle.0);
        } else {
            self.hidden.remove(&handle.0);
        }
    }

    fn set_depth(&mut self, handle: VisualHandle, depth: i32) {
        self.depth.insert(handle.0, depth);
    }
}

#[derive(Debug, Default)]
pub struct RecordingModifiers {
    next: u64,
    pub owners: FxHashMap<u64, String>,
    deleters: FxHashSet<u64>,
    pub active: FxHashSet<u64>,
    pub attached: Vec<String>,
    pub detached: Vec<String>,
    pub ticks: Vec<(String, f32)>,
    pub spectra: Vec<SpectrumSnapshot>,
}

impl RecordingModifiers {
    pub fn is_active(&self, owner: &str) -> bool {
        self.active
            .iter()
            .any(|h| self.owners.get(h).is_some_and(|o| o == owner))
    }
}

impl ModifierRuntime for RecordingModifiers {
    fn attach(&mut self, owner: &ModifierOwner, modifiers: &[Modifier]) -> BundleHandle {
        self.next += 1;
        self.owners.insert(self.next, owner.id().to_string());
        if modifiers.iter().any(|m| m.name == DELETE_OWNER) {
            self.deleters.insert(self.next);
        }
        self.attached.push(owner.id().to_string());
        BundleHandle(self.next)
    }

    fn detach(&mut self, bundle: BundleHandle) {
        assert!(!self.active.contains(&bundle.0), "detach of active bundle");
        if let Some(owner) = self.owners.remove(&bundle.0) {
            self.detached.push(owner);
        }
        self.deleters.remove(&bundle.0);
    }

    fn activate(&mut self, bundle: BundleHandle) {
        assert!(self.active.insert(bundle.0), "double activation");
    }

    fn deactivate(&mut self, bundle: BundleHandle) {
        assert!(self.active.remove(&bundle.0), "double deactivation");
    }

    fn tick(&mut self, bundle: BundleHandle, ctx: &mut ModifierTick<'_>) {
        let Some(owner) = self.owners.get(&bundle.0) else {
            return;
        };
        self.ticks.push((owner.clone(), ctx.time));
        self.spectra.push(ctx.spectrum);
        if self.deleters.contains(&bundle.0) {
            ctx.actions.push(LevelAction::DeleteObject(owner.clone()));
        }
    }
}

pub type TestLevel = LevelContext<RecordingVisuals, RecordingModifiers>;

pub fn level_with(store: DataStore) -> TestLevel {
    let config = LevelConfig::new().with_song_length(120.0).without_spectrum();
    LevelContext::new(
        store,
        config,
        RecordingVisuals::default(),
        RecordingModifiers::default(),
    )
}

/// Tick at a fixed clock time.
pub fn tick_at(level: &mut TestLevel, time: f32) {
    level.tick(&time);
}

/// Object alive over `[start, start + duration)`.
pub fn timed(id: &str, start: f32, duration: f32) -> LevelObject {
    LevelObject::new(id, start).with_autokill(AutoKill::FixedTime { duration })
}

pub fn with_modifiers(mut object: LevelObject, names: &[&str]) -> LevelObject {
    object.modifiers = ModifierBundle {
        modifiers: names.iter().map(|n| Modifier::action(*n)).collect(),
        ignore_lifespan: false,
    };
    object
}

pub fn with_image(mut object: LevelObject, path: &str) -> LevelObject {
    object.shape = Shape::Image {
        path: path.to_string(),
    };
    object
}

/// Position animation from `from` at 0 to `to` at `duration`.
pub fn moving(from: Vec2, to: Vec2, duration: f32) -> Keyframes {
    Keyframes {
        position: vec![Keyframe::new(0.0, from), Keyframe::new(duration, to)],
        ..Default::default()
    }
}

pub fn sorted(ids: Vec<&str>) -> Vec<String> {
    let mut ids: Vec<String> = ids.into_iter().map(str::to_string).collect();
    ids.sort();
    ids
}
