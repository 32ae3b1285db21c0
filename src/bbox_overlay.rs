// src/bbox_overlay.rs
//
// Camera-projected 3D bounding boxes for dangerous actors, buffered per
// RSS frame and composited once the camera image with the matching frame
// number is displayed.

use anyhow::Result;
use opencv::core::Mat;
use tracing::{debug, warn};

use crate::pairing::{PendingSurface, PendingSurfaces};
use crate::projection::{project_actor_box, Calibration, BOX_FACE_INDICES};
use crate::rss::IndividualRssState;
use crate::surface::OverlaySurface;
use crate::transform::Transform;
use crate::world::{ActorRegistry, Color};

const BOX_COLOR: Color = Color::new(255, 0, 0);
const BOX_ALPHA: f64 = 80.0 / 255.0;

pub struct BoundingBoxOverlay {
    width: i32,
    height: i32,
    calibration: Calibration,
    pending: PendingSurfaces,
}

impl BoundingBoxOverlay {
    pub fn new(width: i32, height: i32, fov_degrees: f64, pending_capacity: usize) -> Self {
        Self {
            width,
            height,
            calibration: Calibration::from_dimensions(width, height, fov_degrees),
            pending: PendingSurfaces::new(pending_capacity),
        }
    }

    /// Build the box surface for this RSS frame. Re-ticking a frame that
    /// is already buffered is a no-op.
    pub fn tick(
        &mut self,
        frame: u64,
        states: &[IndividualRssState],
        registry: &ActorRegistry,
        camera: &Transform,
    ) -> Result<()> {
        if self.pending.contains(frame) {
            return Ok(());
        }

        let mut surface = OverlaySurface::new(self.width, self.height, BOX_ALPHA)?;
        let mut box_count = 0usize;

        for state in states {
            if !state.calculation_mode.is_relevant() || !state.is_dangerous {
                continue;
            }

            let Some(actor) = registry.get(state.object_id) else {
                debug!(
                    "actor {} not found, skipping bounding box",
                    state.object_id
                );
                continue;
            };

            let corners = match project_actor_box(actor, camera, &self.calibration) {
                Ok(corners) => corners,
                Err(e) => {
                    warn!("bounding box projection failed for {}: {}", actor.id, e);
                    continue;
                }
            };

            // Boxes partially behind the camera are not drawable.
            if corners.iter().any(|corner| corner.is_behind_camera()) {
                continue;
            }

            for face in &BOX_FACE_INDICES {
                let polygon = [
                    corners[face[0]],
                    corners[face[1]],
                    corners[face[2]],
                    corners[face[3]],
                ];
                surface.fill_polygon(&polygon, BOX_COLOR)?;
            }
            box_count += 1;
        }

        self.pending.push(PendingSurface {
            frame,
            surface,
            item_count: box_count,
        });
        Ok(())
    }

    /// Composite the surface matching the camera frame on display.
    pub fn render(&mut self, display: &mut Mat, current_camera_frame: u64) -> Result<()> {
        let (matched, dropped) = self.pending.take_matching(current_camera_frame);
        if dropped > 0 {
            warn!("{} bounding boxes were not drawn", dropped);
        }
        if let Some(pending) = matched {
            pending.surface.composite_onto(display, 0, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::{
        LateralState, LongitudinalState, RssCalculationMode, SituationType,
        UnstructuredSceneState,
    };
    use crate::transform::{Location, Rotation};
    use crate::world::{Actor, BoundingBox};
    use nalgebra::Vector3;

    fn dangerous_state(object_id: u64) -> IndividualRssState {
        IndividualRssState {
            object_id,
            calculation_mode: RssCalculationMode::Structured,
            is_dangerous: true,
            distance: 8.0,
            situation_type: SituationType::SameDirection,
            longitudinal: LongitudinalState::default(),
            lateral_left: LateralState::default(),
            lateral_right: LateralState::default(),
            unstructured: UnstructuredSceneState::default(),
        }
    }

    fn vehicle(id: u64, x: f64) -> Actor {
        Actor {
            id,
            type_id: "vehicle.test.box".to_string(),
            transform: Transform::new(Location::new(x, 0.0, 0.0), Rotation::default()),
            bounding_box: BoundingBox {
                center: Location::new(0.0, 0.0, 0.7),
                extent: Vector3::new(2.2, 0.9, 0.7),
            },
        }
    }

    #[test]
    fn test_missing_actor_is_skipped() {
        let mut overlay = BoundingBoxOverlay::new(640, 480, 90.0, 4);
        let registry = ActorRegistry::new();
        let camera = Transform::default();

        overlay.tick(1, &[dangerous_state(99)], &registry, &camera).unwrap();
        assert!(overlay.pending.contains(1));
    }

    #[test]
    fn test_tick_same_frame_twice_buffers_once() {
        let mut overlay = BoundingBoxOverlay::new(640, 480, 90.0, 4);
        let mut registry = ActorRegistry::new();
        registry.insert(vehicle(7, 15.0));
        let camera = Transform::default();
        let states = [dangerous_state(7)];

        overlay.tick(3, &states, &registry, &camera).unwrap();
        overlay.tick(3, &states, &registry, &camera).unwrap();
        assert_eq!(overlay.pending.len(), 1);
    }
}
