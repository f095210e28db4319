//! Visual factory collaborator.
//!
//! Drawing is not the level's business. A [`VisualFactory`] turns a
//! declarative object into an opaque [`VisualHandle`] and receives activation
//! and per-tick transform updates for it. The level never looks inside a
//! handle.

use log::debug;

use crate::components::background::BackgroundObject;
use crate::components::object::LevelObject;
use crate::components::transform::WorldTransform;
use crate::error::LevelError;

/// Opaque renderable handle issued by a [`VisualFactory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

/// What a visual is being built for.
#[derive(Clone, Copy, Debug)]
pub enum VisualSource<'a> {
    Object(&'a LevelObject),
    Background(&'a BackgroundObject),
}

impl VisualSource<'_> {
    pub fn id(&self) -> &str {
        match self {
            VisualSource::Object(o) => &o.id,
            VisualSource::Background(b) => &b.id,
        }
    }
}

/// Builds, updates and destroys visuals on behalf of the level.
pub trait VisualFactory {
    /// Build a visual. An error leaves the node scheduled without a visual.
    fn create(&mut self, source: VisualSource<'_>) -> Result<VisualHandle, LevelError>;

    fn destroy(&mut self, handle: VisualHandle);

    fn set_active(&mut self, handle: VisualHandle, active: bool);

    /// Push the composed transform and color of an active visual.
    fn update(&mut self, handle: VisualHandle, transform: &WorldTransform, color: f32);

    fn set_hidden(&mut self, _handle: VisualHandle, _hidden: bool) {}

    fn set_selectable(&mut self, _handle: VisualHandle, _selectable: bool) {}

    fn set_depth(&mut self, _handle: VisualHandle, _depth: i32) {}
}

/// Factory that hands out handles and draws nothing.
#[derive(Debug, Default)]
pub struct NullVisuals {
    next: u64,
}

impl VisualFactory for NullVisuals {
    fn create(&mut self, source: VisualSource<'_>) -> Result<VisualHandle, LevelError> {
        self.next += 1;
        debug!("visual {} created for '{}'", self.next, source.id());
        Ok(VisualHandle(self.next))
    }

    fn destroy(&mut self, _handle: VisualHandle) {}

    fn set_active(&mut self, _handle: VisualHandle, _active: bool) {}

    fn update(&mut self, _handle: VisualHandle, _transform: &WorldTransform, _color: f32) {}
}
