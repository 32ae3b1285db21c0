// src/main.rs

mod bbox_overlay;
mod config;
mod debug_markers;
mod heading;
mod pairing;
mod projection;
mod rss;
mod scene_overlay;
mod state_panel;
mod surface;
mod transform;
mod world;

use anyhow::Result;
use bbox_overlay::BoundingBoxOverlay;
use config::Config;
use debug_markers::DebugMarkerVisualizer;
use heading::HeadingRange;
use nalgebra::{Point2, Vector3};
use opencv::{
    core::{self, Mat, Vector},
    imgcodecs,
};
use rss::{
    EgoDynamics, IndividualRssState, LaneSegment, LateralState, LongitudinalEvaluator,
    LongitudinalState, RoadSegment, Route, RssCalculationMode, RssStateSnapshot, SituationType,
    UnstructuredEgoInfo, UnstructuredResponse, UnstructuredSceneState,
};
use scene_overlay::SceneOverlay;
use state_panel::StatePanel;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use transform::{Location, Rotation, Transform};
use world::{Actor, ActorRegistry, BoundingBox, CameraFrame, Color, DebugDraw, SensorHub};

const EGO_ID: u64 = 1;
const LEAD_ID: u64 = 2;
const ONCOMING_ID: u64 = 3;
const DEMO_FRAMES: u64 = 120;

fn main() -> Result<()> {
    let (config, config_error) = match Config::load("config.yaml") {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("rss_visualization={}", config.logging.level))
        .init();

    info!("RSS visualization demo starting");
    match config_error {
        None => info!("✓ Configuration loaded"),
        Some(e) => info!("config.yaml not loaded ({}), using defaults", e),
    }

    let width = config.display.width;
    let height = config.display.height;

    let mut registry = ActorRegistry::new();
    registry.insert(vehicle(EGO_ID, "vehicle.lincoln.mkz", 0.0, 0.0, 0.0));
    registry.insert(vehicle(LEAD_ID, "vehicle.audi.tt", 40.0, 0.0, 0.0));
    registry.insert(vehicle(ONCOMING_ID, "vehicle.bmw.grandtourer", 120.0, -3.5, 180.0));

    let mut hub = SensorHub::new();
    let mut panel = StatePanel::new(height);
    let mut boxes = BoundingBoxOverlay::new(
        width,
        height,
        config.camera.fov_degrees,
        config.overlay.pending_capacity,
    );
    let mut scene = SceneOverlay::new(width, height, config.camera.fov_degrees, &mut hub);
    let mut markers = DebugMarkerVisualizer::new(EGO_ID);
    markers.toggle_mode(); // RouteOnly
    let mut debug_draw = LoggingDebugDraw;

    let route = demo_route();

    if config.output.save_every > 0 {
        fs::create_dir_all(&config.output.dir)?;
    }

    for frame in 1..=DEMO_FRAMES {
        advance_actors(&mut registry);

        let ego = registry
            .get(EGO_ID)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("ego actor missing"))?;
        let chase_camera = chase_camera_pose(&ego.transform);
        let top_camera = top_down_camera_pose(&ego.transform);

        let (snapshot, ego_dynamics) = synthesize_rss(frame, &ego, &registry);
        let dangerous = snapshot.individual_responses.iter().any(|s| s.is_dangerous);

        // Camera images arrive through the sensor hub, as the simulator
        // callback would deliver them.
        if let Some(handle) = scene.sensor_handle() {
            let (cam_width, cam_height) = scene.dimensions();
            hub.deliver(handle, synthetic_camera_frame(frame, cam_width, cam_height));
        }
        scene.poll_camera(&mut hub)?;

        panel.tick(&snapshot.individual_responses, &registry)?;
        boxes.tick(frame, &snapshot.individual_responses, &registry, &chase_camera)?;
        scene.tick(frame, &snapshot, &ego_dynamics, &top_camera)?;
        markers.tick(
            Some(&route),
            dangerous,
            &snapshot.individual_responses,
            &ego_dynamics,
            &registry,
            &mut debug_draw,
        )?;

        let mut display = Mat::new_rows_cols_with_default(
            height,
            width,
            core::CV_8UC3,
            core::Scalar::all(40.0),
        )?;
        boxes.render(&mut display, frame)?;
        scene.render(&mut display)?;
        panel.render(&mut display, 0)?;

        if frame % 40 == 0 {
            scene.toggle(&mut hub);
        }
        if frame % 30 == 0 {
            markers.toggle_mode();
        }

        if config.output.save_every > 0 && frame % config.output.save_every == 0 {
            let path = Path::new(&config.output.dir).join(format!("frame_{:04}.png", frame));
            let path = path.to_string_lossy().into_owned();
            imgcodecs::imwrite(&path, &display, &Vector::<i32>::new())?;
            info!("saved {}", path);
        }
    }

    info!("✓ Demo finished after {} frames", DEMO_FRAMES);
    Ok(())
}

fn vehicle(id: u64, type_id: &str, x: f64, y: f64, yaw: f64) -> Actor {
    Actor {
        id,
        type_id: type_id.to_string(),
        transform: Transform::new(Location::new(x, y, 0.0), Rotation::new(yaw, 0.0, 0.0)),
        bounding_box: BoundingBox {
            center: Location::new(0.0, 0.0, 0.75),
            extent: Vector3::new(2.4, 1.0, 0.75),
        },
    }
}

/// Ego closes on the lead vehicle while the oncoming car approaches in
/// the opposite lane.
fn advance_actors(registry: &mut ActorRegistry) {
    if let Some(ego) = registry.get_mut(EGO_ID) {
        ego.transform.location.x += 1.2;
    }
    if let Some(lead) = registry.get_mut(LEAD_ID) {
        lead.transform.location.x += 0.8;
    }
    if let Some(oncoming) = registry.get_mut(ONCOMING_ID) {
        oncoming.transform.location.x -= 1.0;
    }
}

/// Chase camera behind and above the ego, for the main display view.
fn chase_camera_pose(ego: &Transform) -> Transform {
    let yaw = ego.rotation.yaw.to_radians();
    Transform::new(
        Location::new(
            ego.location.x - 7.0 * yaw.cos(),
            ego.location.y - 7.0 * yaw.sin(),
            ego.location.z + 3.0,
        ),
        Rotation::new(ego.rotation.yaw, -15.0, 0.0),
    )
}

/// Straight-down camera ahead of the ego, for the scene overlay.
fn top_down_camera_pose(ego: &Transform) -> Transform {
    let yaw = ego.rotation.yaw.to_radians();
    Transform::new(
        Location::new(
            ego.location.x + 7.5 * yaw.cos(),
            ego.location.y + 7.5 * yaw.sin(),
            ego.location.z + 10.0,
        ),
        Rotation::new(ego.rotation.yaw, -90.0, 0.0),
    )
}

/// Flat gray BGRA image standing in for a real camera capture.
fn synthetic_camera_frame(frame: u64, width: i32, height: i32) -> CameraFrame {
    let shade = 60 + ((frame * 3) % 60) as u8;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..(width * height) {
        data.extend_from_slice(&[shade, shade, shade, 255]);
    }
    CameraFrame {
        frame,
        width,
        height,
        data,
    }
}

/// Fabricate the per-frame evaluation results a real RSS library would
/// produce for this scene.
fn synthesize_rss(frame: u64, ego: &Actor, registry: &ActorRegistry) -> (RssStateSnapshot, EgoDynamics) {
    let mut responses = Vec::new();

    if let Some(lead) = registry.get(LEAD_ID) {
        let distance = lead.transform.location.x - ego.transform.location.x;
        let dangerous = distance < 12.0;
        responses.push(IndividualRssState {
            object_id: LEAD_ID,
            calculation_mode: RssCalculationMode::Structured,
            is_dangerous: dangerous,
            distance,
            situation_type: SituationType::SameDirection,
            longitudinal: LongitudinalState {
                is_safe: !dangerous,
                evaluator: LongitudinalEvaluator::SameDirectionOtherInFront,
            },
            lateral_left: LateralState {
                is_safe: true,
                evaluated: true,
            },
            lateral_right: LateralState {
                is_safe: true,
                evaluated: true,
            },
            unstructured: UnstructuredSceneState::default(),
        });
        if dangerous {
            debug!("frame {}: lead vehicle at {:.1}m is dangerous", frame, distance);
        }
    }

    if let Some(oncoming) = registry.get(ONCOMING_ID) {
        let distance = (oncoming.transform.location.x - ego.transform.location.x).abs();
        responses.push(IndividualRssState {
            object_id: ONCOMING_ID,
            calculation_mode: RssCalculationMode::Unstructured,
            is_dangerous: false,
            distance,
            situation_type: SituationType::Unstructured,
            longitudinal: LongitudinalState::default(),
            lateral_left: LateralState::default(),
            lateral_right: LateralState::default(),
            unstructured: UnstructuredSceneState {
                response: UnstructuredResponse::ContinueForward,
                brake_trajectory_set: trajectory_around(
                    oncoming.transform.location.x,
                    -oncoming.transform.location.y,
                    3.0,
                ),
                continue_forward_trajectory_set: trajectory_around(
                    oncoming.transform.location.x - 6.0,
                    -oncoming.transform.location.y,
                    4.0,
                ),
            },
        });
    }

    // RSS map coordinates negate y relative to the simulator world.
    let ego_center = Point2::new(ego.transform.location.x, -ego.transform.location.y);
    let ego_dynamics = EgoDynamics {
        ego_center,
        route_heading: -ego.transform.rotation.yaw.to_radians(),
        allowed_heading_ranges: vec![HeadingRange {
            begin: -0.6,
            end: 0.6,
        }],
    };

    let snapshot = RssStateSnapshot {
        ego_information: UnstructuredEgoInfo {
            brake_trajectory_set: trajectory_around(ego_center.x + 5.0, ego_center.y, 2.5),
            continue_forward_trajectory_set: trajectory_around(ego_center.x + 9.0, ego_center.y, 3.5),
        },
        individual_responses: responses,
    };

    (snapshot, ego_dynamics)
}

/// A small diamond of trajectory sample points in RSS map coordinates.
fn trajectory_around(x: f64, y: f64, reach: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x - reach, y),
        Point2::new(x, y - reach / 2.0),
        Point2::new(x + reach, y),
        Point2::new(x, y + reach / 2.0),
    ]
}

/// Two-lane route straight ahead of the demo scene.
fn demo_route() -> Route {
    let edge = |y: f64| -> Vec<Location> {
        (0..40)
            .map(|i| Location::new(i as f64 * 5.0, y, 0.0))
            .collect()
    };
    Route {
        road_segments: vec![RoadSegment {
            drivable_lane_segments: vec![
                LaneSegment {
                    lane_id: 101,
                    part_of_intersection: false,
                    left_edge: edge(-1.75),
                    right_edge: edge(-5.25),
                },
                LaneSegment {
                    lane_id: 102,
                    part_of_intersection: false,
                    left_edge: edge(5.25),
                    right_edge: edge(1.75),
                },
            ],
        }],
    }
}

/// Stand-in for the simulator's world-debug channel: markers are logged
/// instead of drawn into a 3D scene.
struct LoggingDebugDraw;

impl DebugDraw for LoggingDebugDraw {
    fn draw_point(&mut self, location: Location, size: f64, color: Color, _lifetime: f64) {
        debug!(
            "debug point ({:.1}, {:.1}, {:.1}) size {:.2} color ({}, {}, {})",
            location.x, location.y, location.z, size, color.r, color.g, color.b
        );
    }

    fn draw_line(
        &mut self,
        from: Location,
        to: Location,
        _thickness: f64,
        color: Color,
        _lifetime: f64,
    ) {
        debug!(
            "debug line ({:.1}, {:.1}) -> ({:.1}, {:.1}) color ({}, {}, {})",
            from.x, from.y, to.x, to.y, color.r, color.g, color.b
        );
    }

    fn draw_arrow(
        &mut self,
        from: Location,
        to: Location,
        _thickness: f64,
        _arrow_size: f64,
        color: Color,
        _lifetime: f64,
    ) {
        debug!(
            "debug arrow ({:.1}, {:.1}) -> ({:.1}, {:.1}) color ({}, {}, {})",
            from.x, from.y, to.x, to.y, color.r, color.g, color.b
        );
    }
}
