//! Composed world-space transform.
//!
//! Objects animate in the local space of their parent chain. The transform
//! propagation system composes the chain and stores the result here before
//! handing it to the visual factory.

use glam::Vec2;

/// World-space transform of one object at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform {
    pub position: Vec2,
    /// Degrees.
    pub rotation_degrees: f32,
    pub scale: Vec2,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vec2 { x: 0.0, y: 0.0 },
            rotation_degrees: 0.0,
            scale: Vec2 { x: 1.0, y: 1.0 },
        }
    }
}

/// Rotate a 2D vector by `angle_degrees`.
pub fn rotate(v: Vec2, angle_degrees: f32) -> Vec2 {
    let rad = angle_degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    Vec2 {
        x: v.x * cos - v.y * sin,
        y: v.x * sin + v.y * cos,
    }
}

impl WorldTransform {
    pub fn new(position: Vec2, rotation_degrees: f32, scale: Vec2) -> Self {
        WorldTransform {
            position,
            rotation_degrees,
            scale,
        }
    }

    /// Compose `child` (local to `self`) into world space.
    ///
    /// The child's offset is scaled by the parent's scale, then rotated by the
    /// parent's rotation; rotations add and scales multiply.
    pub fn compose(&self, child: &WorldTransform) -> WorldTransform {
        let scaled_offset = Vec2 {
            x: child.position.x * self.scale.x,
            y: child.position.y * self.scale.y,
        };
        let rotated_offset = rotate(scaled_offset, self.rotation_degrees);
        WorldTransform {
            position: self.position + rotated_offset,
            rotation_degrees: self.rotation_degrees + child.rotation_degrees,
            scale: Vec2 {
                x: self.scale.x * child.scale.x,
                y: self.scale.y * child.scale.y,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn default_is_identity() {
        let gt = WorldTransform::default();
        assert!(approx_eq(gt.position.x, 0.0));
        assert!(approx_eq(gt.rotation_degrees, 0.0));
        assert!(approx_eq(gt.scale.y, 1.0));
    }

    #[test]
    fn compose_translates_child() {
        let parent = WorldTransform::new(Vec2::new(100.0, 100.0), 0.0, Vec2::ONE);
        let child = WorldTransform::new(Vec2::new(40.0, 0.0), 0.0, Vec2::ONE);
        let gt = parent.compose(&child);
        assert!(approx_eq(gt.position.x, 140.0));
        assert!(approx_eq(gt.position.y, 100.0));
    }

    #[test]
    fn compose_rotates_child_offset() {
        let parent = WorldTransform::new(Vec2::new(100.0, 100.0), 90.0, Vec2::ONE);
        let child = WorldTransform::new(Vec2::new(40.0, 0.0), 10.0, Vec2::ONE);
        let gt = parent.compose(&child);
        assert!(approx_eq(gt.position.x, 100.0));
        assert!(approx_eq(gt.position.y, 140.0));
        assert!(approx_eq(gt.rotation_degrees, 100.0));
    }

    #[test]
    fn compose_scales_offset_and_scale() {
        let parent = WorldTransform::new(Vec2::ZERO, 0.0, Vec2::new(2.0, 3.0));
        let child = WorldTransform::new(Vec2::new(10.0, 10.0), 0.0, Vec2::new(0.5, 2.0));
        let gt = parent.compose(&child);
        assert!(approx_eq(gt.position.x, 20.0));
        assert!(approx_eq(gt.position.y, 30.0));
        assert!(approx_eq(gt.scale.x, 1.0));
        assert!(approx_eq(gt.scale.y, 6.0));
    }
}
