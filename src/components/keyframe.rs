//! Keyframe data authored on level objects.
//!
//! A [`Keyframes`] block holds one track per animated property. Track times
//! are relative to the owning object's start time. The runtime turns these
//! tracks into [`Sequence`](super::sequence::Sequence)s through the object
//! converter.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Easing functions for smooth interpolation.
///
/// These functions transform a linear `t` value (0.0 to 1.0) to create
/// different acceleration/deceleration curves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed (no easing).
    #[default]
    Linear,
    /// Jump to the next value when its key is reached.
    Instant,
    /// Starts slow, accelerates (quadratic).
    QuadIn,
    /// Starts fast, decelerates (quadratic).
    QuadOut,
    /// Slow start and end (quadratic).
    QuadInOut,
    /// Starts slow, accelerates (cubic).
    CubicIn,
    /// Starts fast, decelerates (cubic).
    CubicOut,
    /// Slow start and end (cubic).
    CubicInOut,
}

impl Easing {
    /// Apply the easing curve to a normalized time value.
    ///
    /// The input `t` is clamped to [0.0, 1.0].
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Instant => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let p = t - 1.0;
                p * p * p + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let p = 2.0 * t - 2.0;
                    0.5 * p * p * p + 1.0
                }
            }
        }
    }
}

/// One key on a track. `easing` shapes the segment that ends at this key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
    #[serde(default)]
    pub easing: Easing,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Keyframe {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// All animation tracks of one object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyframes {
    pub position: Vec<Keyframe<Vec2>>,
    pub scale: Vec<Keyframe<Vec2>>,
    /// Degrees.
    pub rotation: Vec<Keyframe<f32>>,
    /// Opaque color channel, passed through to the visual factory.
    pub color: Vec<Keyframe<f32>>,
}

impl Keyframes {
    /// Divide every key time by `speed`.
    ///
    /// Used when a prefab instance plays faster or slower than its template so
    /// that animation rate and schedule rate stay consistent.
    pub fn scale_time(&mut self, speed: f32) {
        if speed == 1.0 || speed <= 0.0 {
            return;
        }
        for k in self.position.iter_mut() {
            k.time /= speed;
        }
        for k in self.scale.iter_mut() {
            k.time /= speed;
        }
        for k in self.rotation.iter_mut() {
            k.time /= speed;
        }
        for k in self.color.iter_mut() {
            k.time /= speed;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
            && self.scale.is_empty()
            && self.rotation.is_empty()
            && self.color.is_empty()
    }
}
