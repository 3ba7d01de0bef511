//! Transform component and utilities for spatial positioning.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Viewpoint built from a heading and a look-up angle (yaw about Y, then pitch about local X).
    pub fn from_yaw_pitch(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self::from_position_rotation(
            position,
            Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch),
        )
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Forward projected onto the XZ plane. Zero when looking straight up or down.
    pub fn flat_forward(&self) -> Vec3 {
        flatten(self.forward())
    }

    /// Right projected onto the XZ plane.
    pub fn flat_right(&self) -> Vec3 {
        flatten(self.right())
    }

    /// Heading of this transform in radians, in [0, 2π).
    pub fn yaw(&self) -> f32 {
        yaw_of(self.rotation)
    }
}

fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Heading of a rotation about world Y, measured the same way as `Quat::from_rotation_y`.
pub fn yaw_of(rotation: Quat) -> f32 {
    let f = rotation * -Vec3::Z;
    if f.x.abs() < 1e-6 && f.z.abs() < 1e-6 {
        // Looking straight up/down: fall back to the right vector.
        let r = rotation * Vec3::X;
        return wrap_angle(f32::atan2(-r.z, r.x));
    }
    wrap_angle(f32::atan2(-f.x, -f.z))
}

/// Normalize an angle into [0, 2π).
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= std::f32::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

/// Raw transform data handed to the renderer (instance data).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Transform> for TransformRaw {
    fn from(transform: &Transform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

impl From<Transform> for TransformRaw {
    fn from(transform: Transform) -> Self {
        Self::from(&transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn yaw_of_matches_rotation_y() {
        for angle in [0.0, 0.5, FRAC_PI_2, PI, 4.0, TAU - 0.01] {
            let yaw = yaw_of(Quat::from_rotation_y(angle));
            assert!((yaw - angle).abs() < 1e-4, "{} vs {}", yaw, angle);
        }
    }

    #[test]
    fn yaw_ignores_pitch() {
        let t = Transform::from_yaw_pitch(Vec3::ZERO, 1.2, 0.7);
        assert!((t.yaw() - 1.2).abs() < 1e-4);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        assert!((wrap_angle(-0.5) - (TAU - 0.5)).abs() < 1e-5);
        assert!((wrap_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
        assert!(wrap_angle(-1e-9) < TAU);
    }

    #[test]
    fn flat_forward_drops_vertical_component() {
        let t = Transform::from_yaw_pitch(Vec3::ZERO, 0.0, 0.8);
        let f = t.flat_forward();
        assert_eq!(f.y, 0.0);
        assert!((f - -Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn raw_carries_translation() {
        let raw = TransformRaw::from(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
