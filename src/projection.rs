// src/projection.rs
//
// Pinhole projection of world-space geometry into screen-space pixels.
// The full pipeline for an actor bounding box is
//
//   corner offsets → box-center offset → actor world pose
//                  → camera local frame → image plane
//
// Projection preserves point ordering and cardinality, and is a pure
// function of (points, camera pose, calibration).

use anyhow::{anyhow, Result};
use nalgebra::{Matrix3, Point3, Vector3};

use crate::transform::Transform;
use crate::world::Actor;

/// Intrinsic camera matrix derived from image dimensions and field of view.
#[derive(Debug, Clone)]
pub struct Calibration {
    k: Matrix3<f64>,
    pub width: i32,
    pub height: i32,
}

impl Calibration {
    /// Build the intrinsic matrix for a pinhole camera: focal length from
    /// the horizontal field of view, principal point at the image center.
    pub fn from_dimensions(width: i32, height: i32, fov_degrees: f64) -> Self {
        let focal = width as f64 / (2.0 * (fov_degrees.to_radians() / 2.0).tan());
        let k = Matrix3::new(
            focal,
            0.0,
            width as f64 / 2.0,
            0.0,
            focal,
            height as f64 / 2.0,
            0.0,
            0.0,
            1.0,
        );
        Self { k, width, height }
    }
}

/// A projected point in integer pixel coordinates, with the camera-frame
/// depth retained for visibility filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: i32,
    pub y: i32,
    pub depth: f64,
}

impl ProjectedPoint {
    /// Points at or behind the image plane must be excluded before drawing;
    /// their pixel coordinates are undefined for display purposes.
    pub fn is_behind_camera(&self) -> bool {
        self.depth <= 0.0
    }
}

/// Project camera-frame points onto the image plane.
///
/// The camera frame follows the simulator convention (x forward, y right,
/// z up); axes are re-ordered to the image convention (right, down,
/// forward) before the calibration matrix and perspective divide.
pub fn project_to_pixels(points_camera: &[Point3<f64>], calibration: &Calibration) -> Vec<ProjectedPoint> {
    points_camera
        .iter()
        .map(|p| {
            let image = Vector3::new(p.y, -p.z, p.x);
            let uvw = calibration.k * image;
            ProjectedPoint {
                x: (uvw.x / uvw.z) as i32,
                y: (uvw.y / uvw.z) as i32,
                depth: uvw.z,
            }
        })
        .collect()
}

/// Project world-frame points through the camera pose into pixels.
pub fn project_world_points(
    points_world: &[Point3<f64>],
    camera: &Transform,
    calibration: &Calibration,
) -> Result<Vec<ProjectedPoint>> {
    let local = camera.world_to_local(points_world)?;
    Ok(project_to_pixels(&local, calibration))
}

/// Local-frame corner offsets of a box with the given half-extents.
///
/// Corner order is fixed: four base corners first, then the four top
/// corners, so [`BOX_FACE_INDICES`] can describe the faces.
pub fn bounding_box_corners(extent: Vector3<f64>) -> [Point3<f64>; 8] {
    [
        Point3::new(extent.x, extent.y, -extent.z),
        Point3::new(-extent.x, extent.y, -extent.z),
        Point3::new(-extent.x, -extent.y, -extent.z),
        Point3::new(extent.x, -extent.y, -extent.z),
        Point3::new(extent.x, extent.y, extent.z),
        Point3::new(-extent.x, extent.y, extent.z),
        Point3::new(-extent.x, -extent.y, extent.z),
        Point3::new(extent.x, -extent.y, extent.z),
    ]
}

/// The six faces of a projected box: base, top, then the four side quads
/// pairing adjacent base/top corners.
pub const BOX_FACE_INDICES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 6, 7, 3],
    [0, 4, 7, 3],
];

/// Project an actor's 3D bounding box into pixel space.
pub fn project_actor_box(
    actor: &Actor,
    camera: &Transform,
    calibration: &Calibration,
) -> Result<[ProjectedPoint; 8]> {
    let corners = bounding_box_corners(actor.bounding_box.extent);

    // Box center is an offset within the actor's local frame.
    let box_pose = Transform::from_location(actor.bounding_box.center);
    let in_actor = box_pose.local_to_world(&corners);
    let world = actor.transform.local_to_world(&in_actor);

    let projected = project_world_points(&world, camera, calibration)?;
    <[ProjectedPoint; 8]>::try_from(projected)
        .map_err(|_| anyhow!("bounding box projection changed cardinality"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Location, Rotation};
    use crate::world::{Actor, BoundingBox};
    use approx::assert_relative_eq;

    fn calibration_640() -> Calibration {
        Calibration::from_dimensions(640, 480, 90.0)
    }

    #[test]
    fn test_forward_point_hits_principal_point() {
        let calib = calibration_640();
        let projected = project_to_pixels(&[Point3::new(10.0, 0.0, 0.0)], &calib);
        assert_eq!(projected[0].x, 320);
        assert_eq!(projected[0].y, 240);
        assert_relative_eq!(projected[0].depth, 10.0);
    }

    #[test]
    fn test_projection_preserves_order_and_cardinality() {
        let calib = calibration_640();
        let points: Vec<Point3<f64>> = (1..=20)
            .map(|i| Point3::new(i as f64, (i % 5) as f64 - 2.0, 0.5))
            .collect();

        let projected = project_to_pixels(&points, &calib);

        assert_eq!(projected.len(), points.len());
        // Depth equals the forward coordinate, so order is verifiable.
        for (p, q) in points.iter().zip(projected.iter()) {
            assert_relative_eq!(q.depth, p.x);
        }
    }

    #[test]
    fn test_points_behind_camera_are_identifiable() {
        let calib = calibration_640();
        let projected = project_to_pixels(
            &[
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(-5.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &calib,
        );

        assert!(!projected[0].is_behind_camera());
        assert!(projected[1].is_behind_camera());
        assert!(projected[2].is_behind_camera());
    }

    #[test]
    fn test_unit_cube_matches_base_top_convention() {
        let calib = calibration_640();
        let actor = Actor {
            id: 1,
            type_id: "vehicle.test.cube".to_string(),
            transform: Transform::from_location(Location::new(10.0, 0.0, 0.0)),
            bounding_box: BoundingBox {
                center: Location::default(),
                extent: Vector3::new(0.5, 0.5, 0.5),
            },
        };
        // Camera at the world origin looking down +x.
        let camera = Transform::default();

        let box_px = project_actor_box(&actor, &camera, &calib).unwrap();

        // All corners in front of the camera, around depth 10.
        for corner in &box_px {
            assert!(!corner.is_behind_camera());
            assert!((corner.depth - 10.0).abs() <= 0.5 + 1e-9);
        }
        // Base corners (0..4) sit below top corners (4..8) in image space
        // (image y grows downward).
        for i in 0..4 {
            assert!(box_px[i].y > box_px[i + 4].y);
        }
        // Corners 0,1 lie right of corners 2,3 (positive y maps right).
        assert!(box_px[0].x > box_px[3].x);
        assert!(box_px[1].x > box_px[2].x);
    }

    #[test]
    fn test_pitched_camera_sees_ground_point() {
        // Top-down camera 10m above a ground point.
        let camera = Transform::new(
            Location::new(0.0, 0.0, 10.0),
            Rotation::new(0.0, -90.0, 0.0),
        );
        let calib = calibration_640();

        let projected =
            project_world_points(&[Point3::new(0.0, 0.0, 0.0)], &camera, &calib).unwrap();
        assert_eq!(projected[0].x, 320);
        assert_eq!(projected[0].y, 240);
        assert_relative_eq!(projected[0].depth, 10.0, epsilon = 1e-9);
    }
}
