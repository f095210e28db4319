//! Parent links and parent chains.
//!
//! A [`ParentChain`] is the resolved ancestry of one object: an ordered list of
//! [`ParentLink`]s from the immediate parent up to the ultimate ancestor, plus
//! an optional [`CameraLink`] when that ancestor follows the camera.
//!
//! Chains are derived data. The object converter rebuilds them whenever a
//! parent relationship changes; the transform propagation system walks them
//! every tick.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::components::transform::WorldTransform;
use crate::resources::datastore::ObjectKey;

/// How one transform axis (position, scale or rotation) follows a parent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLink {
    /// Whether the axis inherits the parent's motion at all.
    pub inherit: bool,
    /// Seconds subtracted from the clock when sampling the parent.
    pub delay: f32,
    /// Multiplier applied to the parent's contribution.
    pub parallax: f32,
    /// Accumulate `delay` with the delays further down the chain.
    pub additive: bool,
}

impl AxisLink {
    pub fn inherit() -> Self {
        AxisLink {
            inherit: true,
            ..Default::default()
        }
    }

    pub fn detached() -> Self {
        AxisLink {
            inherit: false,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_parallax(mut self, parallax: f32) -> Self {
        self.parallax = parallax;
        self
    }

    pub fn with_additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }
}

impl Default for AxisLink {
    fn default() -> Self {
        AxisLink {
            inherit: true,
            delay: 0.0,
            parallax: 1.0,
            additive: false,
        }
    }
}

/// Authored parent settings of an object, describing the edge to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentSettings {
    pub position: AxisLink,
    pub scale: AxisLink,
    pub rotation: AxisLink,
    /// Sample ancestors at this object's spawn time instead of the clock.
    pub desync: bool,
}

impl Default for ParentSettings {
    fn default() -> Self {
        ParentSettings {
            position: AxisLink::inherit(),
            scale: AxisLink::detached(),
            rotation: AxisLink::inherit(),
            desync: false,
        }
    }
}

impl ParentSettings {
    /// Inherit every axis with no delay.
    pub fn all() -> Self {
        ParentSettings {
            position: AxisLink::inherit(),
            scale: AxisLink::inherit(),
            rotation: AxisLink::inherit(),
            desync: false,
        }
    }
}

/// What a link samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkSource {
    /// Another object's animation.
    Object(ObjectKey),
    /// A fixed transform, e.g. the offset of a prefab instance.
    Static(WorldTransform),
}

/// One edge of a parent chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParentLink {
    pub source: LinkSource,
    pub position: AxisLink,
    pub scale: AxisLink,
    pub rotation: AxisLink,
    /// Fixed time at which the parent is sampled, when desynced.
    pub desync_time: Option<f32>,
}

impl ParentLink {
    pub fn from_settings(source: LinkSource, settings: &ParentSettings, child_start: f32) -> Self {
        ParentLink {
            source,
            position: settings.position,
            scale: settings.scale,
            rotation: settings.rotation,
            desync_time: settings.desync.then_some(child_start),
        }
    }

    pub fn object(&self) -> Option<ObjectKey> {
        match self.source {
            LinkSource::Object(key) => Some(key),
            LinkSource::Static(_) => None,
        }
    }
}

/// Axis settings copied from the top-most ancestor that follows the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraLink {
    pub position: AxisLink,
    pub scale: AxisLink,
    pub rotation: AxisLink,
}

impl From<&ParentSettings> for CameraLink {
    fn from(settings: &ParentSettings) -> Self {
        CameraLink {
            position: settings.position,
            scale: settings.scale,
            rotation: settings.rotation,
        }
    }
}

/// Resolved ancestry of one object, immediate parent first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParentChain {
    pub links: SmallVec<[ParentLink; 4]>,
    pub camera: Option<CameraLink>,
}

impl ParentChain {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.camera.is_none()
    }

    pub fn camera_relative(&self) -> bool {
        self.camera.is_some()
    }

    /// Whether `key` appears anywhere in the chain.
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.links.iter().any(|l| l.object() == Some(key))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }
}
