//! Time-indexed curves built from keyframe tracks.
//!
//! A [`Sequence`] answers "what is the value at time `t`" for one property.
//! The scheduler never looks inside; it only samples sequences when composing
//! world transforms and when an autokill rule depends on the animation length.

use glam::Vec2;

use crate::components::keyframe::{Keyframe, Keyframes};

/// Values that can be blended between two keys.
pub trait Interpolate: Copy {
    fn lerp(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

impl Interpolate for Vec2 {
    fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

/// A sorted keyframe track with a fallback value for empty tracks.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence<T> {
    keys: Vec<Keyframe<T>>,
    fallback: T,
}

impl<T: Interpolate> Sequence<T> {
    /// Build a sequence; keys are stable-sorted by time so equal times keep
    /// their authored order.
    pub fn new(keys: &[Keyframe<T>], fallback: T) -> Self {
        let mut keys = keys.to_vec();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Sequence { keys, fallback }
    }

    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    /// Time of the last key, 0 for an empty track.
    pub fn length(&self) -> f32 {
        self.keys.last().map(|k| k.time).unwrap_or(0.0)
    }

    /// Sample the track at `time`.
    pub fn interpolate(&self, time: f32) -> T {
        let Some(first) = self.keys.first() else {
            return self.fallback;
        };
        if time <= first.time {
            return first.value;
        }
        // index of the first key strictly after `time`
        let next = self.keys.partition_point(|k| k.time <= time);
        if next >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }
        let a = &self.keys[next - 1];
        let b = &self.keys[next];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let t = b.easing.ease((time - a.time) / span);
        T::lerp(a.value, b.value, t)
    }
}

/// Every cached curve of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceCollection {
    pub position: Sequence<Vec2>,
    pub scale: Sequence<Vec2>,
    pub rotation: Sequence<f32>,
    pub color: Sequence<f32>,
}

impl SequenceCollection {
    pub fn from_keyframes(keyframes: &Keyframes) -> Self {
        SequenceCollection {
            position: Sequence::new(&keyframes.position, Vec2::ZERO),
            scale: Sequence::new(&keyframes.scale, Vec2::ONE),
            rotation: Sequence::new(&keyframes.rotation, 0.0),
            color: Sequence::new(&keyframes.color, 0.0),
        }
    }

    /// Latest key time across every track.
    pub fn length(&self) -> f32 {
        self.position
            .length()
            .max(self.scale.length())
            .max(self.rotation.length())
            .max(self.color.length())
    }
}

impl Default for SequenceCollection {
    fn default() -> Self {
        Self::from_keyframes(&Keyframes::default())
    }
}
