//! Modifier runtime collaborator.
//!
//! Modifiers are opaque to the level. The level registers each owner's
//! modifier list with a [`ModifierRuntime`], receives a [`BundleHandle`] back,
//! and from then on only sequences `activate`/`deactivate`/`tick` calls on that
//! handle according to the owner's lifetime.
//!
//! Structural changes a modifier wants to make (deleting an object, nudging a
//! property) must go through [`ModifierTick::actions`]; they are applied after
//! the tick finishes.

use crate::components::modifier::{Modifier, ModifierOwner};
use crate::resources::actionqueue::ActionQueue;
use crate::resources::spectrum::SpectrumSnapshot;

/// Opaque handle of a registered modifier bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleHandle(pub u64);

/// Per-call context handed to [`ModifierRuntime::tick`].
pub struct ModifierTick<'a> {
    /// Current playback time.
    pub time: f32,
    /// Latest audio spectrum bands.
    pub spectrum: SpectrumSnapshot,
    /// Deferred level mutations, drained after the tick.
    pub actions: &'a mut ActionQueue,
}

/// Runs modifier bundles on behalf of the level.
pub trait ModifierRuntime {
    fn attach(&mut self, owner: &ModifierOwner, modifiers: &[Modifier]) -> BundleHandle;

    fn detach(&mut self, bundle: BundleHandle);

    fn activate(&mut self, bundle: BundleHandle);

    fn deactivate(&mut self, bundle: BundleHandle);

    fn tick(&mut self, bundle: BundleHandle, ctx: &mut ModifierTick<'_>);
}

/// Runtime that accepts every bundle and does nothing with it.
#[derive(Debug, Default)]
pub struct NullModifiers {
    next: u64,
}

impl ModifierRuntime for NullModifiers {
    fn attach(&mut self, _owner: &ModifierOwner, _modifiers: &[Modifier]) -> BundleHandle {
        self.next += 1;
        BundleHandle(self.next)
    }

    fn detach(&mut self, _bundle: BundleHandle) {}

    fn activate(&mut self, _bundle: BundleHandle) {}

    fn deactivate(&mut self, _bundle: BundleHandle) {}

    fn tick(&mut self, _bundle: BundleHandle, _ctx: &mut ModifierTick<'_>) {}
}
