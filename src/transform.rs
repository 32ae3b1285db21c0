// src/transform.rs
//
// Rigid poses in the simulator world frame. Angles follow the simulator
// convention: degrees, rotation composed yaw * pitch * roll.

use anyhow::{anyhow, Result};
use nalgebra::{Matrix4, Point3, Vector4};

/// Position in world coordinates (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Rotation {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }
}

/// Pose of a local frame (actor, sensor) relative to the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    pub fn from_location(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::default(),
        }
    }

    /// 4x4 homogeneous matrix mapping local-frame points into the world frame.
    pub fn matrix(&self) -> Matrix4<f64> {
        let c_y = self.rotation.yaw.to_radians().cos();
        let s_y = self.rotation.yaw.to_radians().sin();
        let c_p = self.rotation.pitch.to_radians().cos();
        let s_p = self.rotation.pitch.to_radians().sin();
        let c_r = self.rotation.roll.to_radians().cos();
        let s_r = self.rotation.roll.to_radians().sin();

        Matrix4::new(
            c_p * c_y,
            c_y * s_p * s_r - s_y * c_r,
            -c_y * s_p * c_r - s_y * s_r,
            self.location.x,
            s_y * c_p,
            s_y * s_p * s_r + c_y * c_r,
            -s_y * s_p * c_r + c_y * s_r,
            self.location.y,
            s_p,
            -c_p * s_r,
            c_p * c_r,
            self.location.z,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Apply the forward pose transform to a set of local-frame points.
    pub fn local_to_world(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let m = self.matrix();
        points
            .iter()
            .map(|p| {
                let v = m * Vector4::new(p.x, p.y, p.z, 1.0);
                Point3::new(v.x, v.y, v.z)
            })
            .collect()
    }

    /// Map world-frame points into this pose's local frame.
    ///
    /// Fails only when the pose matrix is not invertible, which a valid
    /// rigid pose cannot produce — callers treat this as an invariant
    /// violation, not a recoverable condition.
    pub fn world_to_local(&self, points: &[Point3<f64>]) -> Result<Vec<Point3<f64>>> {
        let inverse = self
            .matrix()
            .try_inverse()
            .ok_or_else(|| anyhow!("degenerate pose matrix for {:?}", self))?;

        Ok(points
            .iter()
            .map(|p| {
                let v = inverse * Vector4::new(p.x, p.y, p.z, 1.0);
                Point3::new(v.x, v.y, v.z)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_pose_matrix_is_identity() {
        let m = Transform::default().matrix();
        assert_relative_eq!(m, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let t = Transform::from_location(Location::new(1.0, -2.0, 3.5));
        let m = t.matrix();
        assert_relative_eq!(m[(0, 3)], 1.0);
        assert_relative_eq!(m[(1, 3)], -2.0);
        assert_relative_eq!(m[(2, 3)], 3.5);
    }

    #[test]
    fn test_world_to_local_round_trips() {
        let pose = Transform::new(
            Location::new(12.0, -7.5, 2.0),
            Rotation::new(31.0, -14.0, 87.0),
        );
        let world = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
            Point3::new(-3.0, 18.0, -0.25),
        ];

        let local = pose.world_to_local(&world).unwrap();
        let back = pose.local_to_world(&local);

        for (orig, round) in world.iter().zip(back.iter()) {
            assert_relative_eq!(orig, round, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_pure_yaw_rotates_forward_axis() {
        let pose = Transform::new(Location::default(), Rotation::new(90.0, 0.0, 0.0));
        let world = pose.local_to_world(&[Point3::new(1.0, 0.0, 0.0)]);
        assert_relative_eq!(world[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(world[0].y, 1.0, epsilon = 1e-12);
    }
}
