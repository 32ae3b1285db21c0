// src/scene_overlay.rs
//
// Unstructured-scene visualizer: a dedicated top-down camera view with
// projected brake / continue-forward trajectory sets and allowed
// heading-range slices. Camera images and RSS overlays arrive
// asynchronously; a composite is only produced once both carry the same
// frame-sequence number.

use anyhow::Result;
use nalgebra::{Point2, Point3};
use opencv::core::Mat;
use tracing::{info, warn};

use crate::heading::{heading_range_polyline, HeadingRange, HEADING_RADIUS_M};
use crate::projection::{project_world_points, Calibration, ProjectedPoint};
use crate::rss::{EgoDynamics, RssStateSnapshot, TrajectorySet};
use crate::surface::OverlaySurface;
use crate::transform::Transform;
use crate::world::{CameraFrame, Color, SensorHandle, SensorHub};

const TRAJECTORY_ALPHA: f64 = 180.0 / 255.0;
const BRAKE_RED: Color = Color::new(255, 0, 0);
const CONTINUE_GREEN: Color = Color::new(0, 255, 0);
const HEADING_BLUE: Color = Color::new(0, 0, 255);

/// Overlay window mode, cycled by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneOverlayMode {
    Disabled,
    Window,
    Fullscreen,
}

impl SceneOverlayMode {
    /// Fixed cyclic transition: Window → Fullscreen → Disabled → Window.
    pub fn next(self) -> Self {
        match self {
            Self::Window => Self::Fullscreen,
            Self::Fullscreen => Self::Disabled,
            Self::Disabled => Self::Window,
        }
    }
}

pub struct SceneOverlay {
    mode: SceneOverlayMode,
    display_width: i32,
    display_height: i32,
    fov_degrees: f64,
    dim: (i32, i32),
    calibration: Option<Calibration>,
    sensor: Option<SensorHandle>,
    camera_slot: Option<(u64, OverlaySurface)>,
    rss_slot: Option<(u64, OverlaySurface)>,
    composite: Option<OverlaySurface>,
}

impl SceneOverlay {
    pub fn new(
        display_width: i32,
        display_height: i32,
        fov_degrees: f64,
        hub: &mut SensorHub,
    ) -> Self {
        let mut overlay = Self {
            mode: SceneOverlayMode::Disabled,
            display_width,
            display_height,
            fov_degrees,
            dim: (0, 0),
            calibration: None,
            sensor: None,
            camera_slot: None,
            rss_slot: None,
            composite: None,
        };
        overlay.restart(SceneOverlayMode::Window, hub);
        overlay
    }

    pub fn mode(&self) -> SceneOverlayMode {
        self.mode
    }

    /// Size the attached camera must capture at in the current mode.
    pub fn dimensions(&self) -> (i32, i32) {
        self.dim
    }

    /// The handle the simulator should deliver camera frames to, if a
    /// camera is active in the current mode.
    pub fn sensor_handle(&self) -> Option<SensorHandle> {
        self.sensor
    }

    /// Cycle the mode, re-registering the camera as needed.
    pub fn toggle(&mut self, hub: &mut SensorHub) {
        let next = self.mode.next();
        info!("scene overlay mode -> {:?}", next);
        self.restart(next, hub);
    }

    fn restart(&mut self, mode: SceneOverlayMode, hub: &mut SensorHub) {
        if let Some(handle) = self.sensor.take() {
            hub.unregister(handle);
        }
        self.camera_slot = None;
        self.rss_slot = None;
        self.composite = None;
        self.mode = mode;

        self.dim = match mode {
            SceneOverlayMode::Window => (self.display_width / 3, self.display_height / 2),
            SceneOverlayMode::Fullscreen => (self.display_width, self.display_height),
            SceneOverlayMode::Disabled => {
                self.calibration = None;
                return;
            }
        };

        self.calibration = Some(Calibration::from_dimensions(
            self.dim.0,
            self.dim.1,
            self.fov_degrees,
        ));
        self.sensor = Some(hub.register());
    }

    /// Drain delivered camera frames, keeping the newest as the camera
    /// half of the pairing.
    pub fn poll_camera(&mut self, hub: &mut SensorHub) -> Result<()> {
        let Some(handle) = self.sensor else {
            return Ok(());
        };

        while let Some(frame) = hub.poll(handle) {
            if frame.width != self.dim.0 || frame.height != self.dim.1 {
                warn!(
                    "camera frame {} has size {}x{}, expected {}x{}",
                    frame.frame, frame.width, frame.height, self.dim.0, self.dim.1
                );
                continue;
            }
            self.store_camera_frame(&frame)?;
        }
        Ok(())
    }

    fn store_camera_frame(&mut self, frame: &CameraFrame) -> Result<()> {
        let surface = OverlaySurface::from_bgra(frame)?;
        self.camera_slot = Some((frame.frame, surface));
        self.try_composite(Some(frame.frame), None)
    }

    /// Build the RSS half of the pairing for this frame.
    pub fn tick(
        &mut self,
        frame: u64,
        snapshot: &RssStateSnapshot,
        ego_dynamics: &EgoDynamics,
        camera: &Transform,
    ) -> Result<()> {
        if self.mode == SceneOverlayMode::Disabled {
            return Ok(());
        }
        let Some(calibration) = self.calibration.clone() else {
            return Ok(());
        };

        let mut surface = OverlaySurface::new(self.dim.0, self.dim.1, TRAJECTORY_ALPHA)?;

        // Trajectory sets: ego first, then per-object responses.
        let mut trajectory_lines: Vec<(&TrajectorySet, Color)> = vec![
            (&snapshot.ego_information.brake_trajectory_set, BRAKE_RED),
            (
                &snapshot.ego_information.continue_forward_trajectory_set,
                CONTINUE_GREEN,
            ),
        ];
        for state in &snapshot.individual_responses {
            if !state.unstructured.brake_trajectory_set.is_empty() {
                trajectory_lines.push((&state.unstructured.brake_trajectory_set, BRAKE_RED));
            }
            if !state.unstructured.continue_forward_trajectory_set.is_empty() {
                trajectory_lines.push((
                    &state.unstructured.continue_forward_trajectory_set,
                    CONTINUE_GREEN,
                ));
            }
        }

        for (set, color) in trajectory_lines {
            match project_ground_points(set, camera, &calibration) {
                Ok(points) => surface.draw_closed_polyline(&points, color, 2)?,
                Err(e) => warn!("skipping trajectory set: {}", e),
            }
        }

        for range in &ego_dynamics.allowed_heading_ranges {
            match project_heading_slice(range, ego_dynamics, camera, &calibration) {
                Ok(points) => surface.fill_polygon(&points, HEADING_BLUE)?,
                Err(e) => warn!("skipping heading range: {}", e),
            }
        }

        self.rss_slot = Some((frame, surface));
        self.try_composite(None, Some(frame))
    }

    /// Produce the composite once the camera and RSS halves agree on the
    /// frame number. Either half may arrive first.
    fn try_composite(&mut self, cam_frame: Option<u64>, rss_frame: Option<u64>) -> Result<()> {
        if self.mode == SceneOverlayMode::Disabled {
            return Ok(());
        }

        let mut render = false;
        if let (Some(cam), Some((rss, _))) = (cam_frame, self.rss_slot.as_ref()) {
            render |= cam == *rss;
        }
        if let (Some(rss), Some((cam, _))) = (rss_frame, self.camera_slot.as_ref()) {
            render |= rss == *cam;
        }
        if !render {
            return Ok(());
        }

        let (Some((_, camera_surface)), Some((_, rss_surface))) =
            (self.camera_slot.as_ref(), self.rss_slot.as_ref())
        else {
            return Ok(());
        };

        let mut composite = camera_surface.try_clone()?;
        composite.blit(rss_surface, 0, 0)?;
        composite.draw_frame_border()?;
        self.composite = Some(composite);
        Ok(())
    }

    /// Copy the latest composite to the top-right display corner.
    pub fn render(&self, display: &mut Mat) -> Result<()> {
        if let Some(composite) = &self.composite {
            composite.copy_onto(display, self.display_width - self.dim.0, 0)?;
        }
        Ok(())
    }
}

/// Lift RSS map points onto the simulator ground plane (y negated) and
/// project them, dropping anything behind the camera.
fn project_ground_points(
    points: &[Point2<f64>],
    camera: &Transform,
    calibration: &Calibration,
) -> Result<Vec<ProjectedPoint>> {
    let world: Vec<Point3<f64>> = points
        .iter()
        .map(|p| Point3::new(p.x, -p.y, 0.0))
        .collect();

    let projected = project_world_points(&world, camera, calibration)?;
    Ok(projected
        .into_iter()
        .filter(|p| !p.is_behind_camera())
        .collect())
}

fn project_heading_slice(
    range: &HeadingRange,
    ego_dynamics: &EgoDynamics,
    camera: &Transform,
    calibration: &Calibration,
) -> Result<Vec<ProjectedPoint>> {
    let slice = heading_range_polyline(range, ego_dynamics.ego_center, HEADING_RADIUS_M);
    project_ground_points(&slice, camera, calibration)
}
