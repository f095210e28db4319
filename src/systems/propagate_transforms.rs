//! Transform propagation through parent chains.
//!
//! Computes the world transform of an object by composing its own animated
//! local transform with the sampled transforms of every link in its
//! [`ParentChain`], immediate parent first, and finally with the camera when
//! the chain is camera-relative.
//!
//! # Per-axis rules
//!
//! - An axis that stops inheriting at some link receives no contribution from
//!   that link or any link above it.
//! - Each object link samples its parent at `clock - delay`. Additive delays
//!   accumulate up the chain; absolute ones replace the running delay.
//! - A desynced link samples at the child's start time instead of the clock.
//! - Parallax scales the parent's contribution on that axis.
//!
//! Local transforms are never rewritten when a chain changes, so a rebuilt
//! chain never makes an object jump in its own space.

use glam::Vec2;

use crate::components::parentlink::{AxisLink, LinkSource, ParentChain};
use crate::components::sequence::SequenceCollection;
use crate::components::transform::WorldTransform;
use crate::resources::datastore::{BackgroundKey, DataStore, ObjectKey};
use crate::systems::converter::ObjectConverter;

const POSITION: usize = 0;
const SCALE: usize = 1;
const ROTATION: usize = 2;

/// Sample a sequence collection at `local_time` seconds after spawn.
pub fn local_transform(sequences: &SequenceCollection, local_time: f32) -> WorldTransform {
    WorldTransform {
        position: sequences.position.interpolate(local_time),
        rotation_degrees: sequences.rotation.interpolate(local_time),
        scale: sequences.scale.interpolate(local_time),
    }
}

/// Keep only the axes that are still open, weighted by parallax.
fn contribution(
    parents: [WorldTransform; 3],
    axes: [AxisLink; 3],
    open: [bool; 3],
) -> WorldTransform {
    let mut contrib = WorldTransform::default();
    if open[POSITION] {
        contrib.position = parents[POSITION].position * axes[POSITION].parallax;
    }
    if open[SCALE] {
        contrib.scale = Vec2::ONE + (parents[SCALE].scale - Vec2::ONE) * axes[SCALE].parallax;
    }
    if open[ROTATION] {
        contrib.rotation_degrees = parents[ROTATION].rotation_degrees * axes[ROTATION].parallax;
    }
    contrib
}

/// Compose `local` up through `chain` at clock `time`.
///
/// `sample` returns the local transform of an ancestor at a given clock time,
/// or `None` when the ancestor is gone, in which case its link contributes
/// nothing.
pub fn compose_chain<F>(
    local: WorldTransform,
    chain: &ParentChain,
    time: f32,
    camera: &WorldTransform,
    sample: F,
) -> WorldTransform
where
    F: Fn(ObjectKey, f32) -> Option<WorldTransform>,
{
    let mut world = local;
    let mut open = [true; 3];
    let mut delay = [0.0f32; 3];

    for link in chain.links.iter() {
        let axes = [link.position, link.scale, link.rotation];
        for (axis, state) in axes.iter().zip(open.iter_mut()) {
            if !axis.inherit {
                *state = false;
            }
        }
        if !open.iter().any(|o| *o) {
            return world;
        }

        let parents = match link.source {
            LinkSource::Static(transform) => [transform; 3],
            LinkSource::Object(key) => {
                for (axis, d) in axes.iter().zip(delay.iter_mut()) {
                    *d = if axis.additive { *d + axis.delay } else { axis.delay };
                }
                let base = link.desync_time.unwrap_or(time);
                let mut parents = [WorldTransform::default(); 3];
                let mut found = false;
                for i in 0..3 {
                    if open[i] {
                        if let Some(t) = sample(key, base - delay[i]) {
                            parents[i] = t;
                            found = true;
                        }
                    }
                }
                if !found {
                    continue;
                }
                parents
            }
        };
        world = contribution(parents, axes, open).compose(&world);
    }

    if let Some(cam) = chain.camera {
        let axes = [cam.position, cam.scale, cam.rotation];
        for (axis, state) in axes.iter().zip(open.iter_mut()) {
            if !axis.inherit {
                *state = false;
            }
        }
        if open.iter().any(|o| *o) {
            world = contribution([*camera; 3], axes, open).compose(&world);
        }
    }

    world
}

/// Local transform of one object at clock `time`.
pub fn sample_object(
    converter: &ObjectConverter,
    store: &DataStore,
    key: ObjectKey,
    time: f32,
) -> Option<WorldTransform> {
    let object = store.object(key)?;
    let sequences = converter.sequences(key)?;
    Some(local_transform(sequences, time - object.start_time))
}

/// World transform and color of an object at clock `time`.
pub fn object_world_transform(
    converter: &ObjectConverter,
    store: &DataStore,
    key: ObjectKey,
    time: f32,
    camera: &WorldTransform,
) -> Option<(WorldTransform, f32)> {
    let object = store.object(key)?;
    let sequences = converter.sequences(key)?;
    let local_time = time - object.start_time;
    let local = local_transform(sequences, local_time);
    let color = sequences.color.interpolate(local_time);
    let world = match converter.chain(key) {
        Some(chain) if !chain.is_empty() => compose_chain(local, chain, time, camera, |k, t| {
            sample_object(converter, store, k, t)
        }),
        _ => local,
    };
    Some((world, color))
}

/// World transform and color of a background object at clock `time`.
pub fn background_world_transform(
    converter: &ObjectConverter,
    store: &DataStore,
    key: BackgroundKey,
    time: f32,
) -> Option<(WorldTransform, f32)> {
    let background = store.background(key)?;
    let sequences = converter.background_sequences(key)?;
    let local_time = time - background.start_time;
    let local = local_transform(sequences, local_time);
    let color = sequences.color.interpolate(local_time);
    Some((background.base_transform().compose(&local), color))
}
