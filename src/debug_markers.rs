// src/debug_markers.rs
//
// Transient in-world debug markers: route lane edges, per-object safety
// indicators with connection lines, and the ego dynamics arrow. All
// drawing goes through the DebugDraw trait so tests can record calls.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info};

use crate::rss::{EgoDynamics, IndividualRssState, Route, SituationType};
use crate::transform::Location;
use crate::world::{ActorId, ActorRegistry, Color, DebugDraw};

const SAFE_GREEN: Color = Color::new(0, 255, 0);
const DANGER_RED: Color = Color::new(255, 0, 0);
const IRRELEVANT_GREY: Color = Color::new(150, 150, 150);
const DYNAMICS_BLUE: Color = Color::new(0, 0, 255);

/// What the in-world debug layer shows, cycled by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugVisualizationMode {
    Off,
    RouteOnly,
    VehicleStateOnly,
    VehicleStateAndRoute,
    All,
}

impl DebugVisualizationMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::RouteOnly,
            Self::RouteOnly => Self::VehicleStateOnly,
            Self::VehicleStateOnly => Self::VehicleStateAndRoute,
            Self::VehicleStateAndRoute => Self::All,
            Self::All => Self::Off,
        }
    }

    fn shows_route(self) -> bool {
        matches!(self, Self::RouteOnly | Self::VehicleStateAndRoute | Self::All)
    }

    fn shows_vehicle_state(self) -> bool {
        matches!(
            self,
            Self::VehicleStateOnly | Self::VehicleStateAndRoute | Self::All
        )
    }
}

pub struct DebugMarkerVisualizer {
    mode: DebugVisualizationMode,
    ego_id: ActorId,
}

impl DebugMarkerVisualizer {
    pub fn new(ego_id: ActorId) -> Self {
        Self {
            mode: DebugVisualizationMode::Off,
            ego_id,
        }
    }

    pub fn mode(&self) -> DebugVisualizationMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.next();
        info!("debug visualization mode -> {:?}", self.mode);
    }

    pub fn tick(
        &self,
        route: Option<&Route>,
        dangerous: bool,
        states: &[IndividualRssState],
        ego_dynamics: &EgoDynamics,
        registry: &ActorRegistry,
        debug_draw: &mut dyn DebugDraw,
    ) -> Result<()> {
        let Some(ego) = registry.get(self.ego_id) else {
            debug!("ego actor {} not found, skipping debug markers", self.ego_id);
            return Ok(());
        };
        let ego_location = ego.transform.location;
        let ego_yaw = ego.transform.rotation.yaw;

        if self.mode.shows_route() {
            if let Some(route) = route {
                visualize_route(route, dangerous, ego_location.z, debug_draw);
            }
        }

        if self.mode.shows_vehicle_state() {
            self.visualize_rss_results(states, ego_location, ego_yaw, registry, debug_draw);
        }

        if self.mode == DebugVisualizationMode::All {
            visualize_ego_dynamics(ego_dynamics, ego_location, debug_draw);
        }

        Ok(())
    }

    fn visualize_rss_results(
        &self,
        states: &[IndividualRssState],
        ego_location: Location,
        ego_yaw_degrees: f64,
        registry: &ActorRegistry,
        debug_draw: &mut dyn DebugDraw,
    ) {
        for state in states {
            let Some(other) = registry.get(state.object_id) else {
                debug!("actor {} not found, skipping state marker", state.object_id);
                continue;
            };

            let mut ego_point = ego_location;
            ego_point.z += 0.05;
            let mut point = other.transform.location;
            point.z += 0.05;

            let yaw = ego_yaw_degrees.to_radians();
            let line_offset = Location::new(-yaw.sin() * 0.1, yaw.cos() * 0.1, 0.0);

            let indicator_color = if state.is_dangerous {
                DANGER_RED
            } else if state.situation_type == SituationType::NotRelevant {
                IRRELEVANT_GREY
            } else {
                SAFE_GREEN
            };

            if self.mode == DebugVisualizationMode::All {
                // Connection lines for the three direction evaluations.
                let lon_color = direction_color(indicator_color, !state.longitudinal.is_safe, state.is_dangerous);
                let lat_l_color = direction_color(indicator_color, !state.lateral_left.is_safe, state.is_dangerous);
                let lat_r_color = direction_color(indicator_color, !state.lateral_right.is_safe, state.is_dangerous);

                debug_draw.draw_line(ego_point, point, 0.1, lon_color, 0.02);
                debug_draw.draw_line(
                    offset(ego_point, line_offset, -1.0),
                    offset(point, line_offset, -1.0),
                    0.1,
                    lat_l_color,
                    0.02,
                );
                debug_draw.draw_line(
                    offset(ego_point, line_offset, 1.0),
                    offset(point, line_offset, 1.0),
                    0.1,
                    lat_r_color,
                    0.02,
                );
            }

            point.z += 3.0;
            debug_draw.draw_point(point, 0.2, indicator_color, 0.02);
        }
    }
}

fn direction_color(indicator: Color, is_unsafe: bool, dangerous: bool) -> Color {
    if is_unsafe {
        Color::new(255, if dangerous { 0 } else { 255 }, indicator.b)
    } else {
        indicator
    }
}

fn offset(location: Location, delta: Location, sign: f64) -> Location {
    Location::new(
        location.x + sign * delta.x,
        location.y + sign * delta.y,
        location.z + sign * delta.z,
    )
}

/// Draw the right edge of the right-most lane and the left edge of the
/// left-most lane along the route, each lane only once.
fn visualize_route(route: &Route, dangerous: bool, ego_z: f64, debug_draw: &mut dyn DebugDraw) {
    let mut right_edges_drawn = HashSet::new();
    let mut left_edges_drawn = HashSet::new();
    let channel = if dangerous { 128 } else { 255 };

    for road_segment in &route.road_segments {
        let Some(right_most) = road_segment.drivable_lane_segments.first() else {
            continue;
        };
        if right_edges_drawn.insert(right_most.lane_id) {
            let blue = if right_most.part_of_intersection { channel } else { 0 };
            let color = Color::new(channel, 0, blue);
            visualize_edge(&right_most.right_edge, color, ego_z, debug_draw);
        }

        let Some(left_most) = road_segment.drivable_lane_segments.last() else {
            continue;
        };
        if left_edges_drawn.insert(left_most.lane_id) {
            let blue = if left_most.part_of_intersection { channel } else { 0 };
            let color = Color::new(0, channel, blue);
            visualize_edge(&left_most.left_edge, color, ego_z, debug_draw);
        }
    }
}

/// Edge points come in RSS map coordinates; negate y and lift by the ego
/// elevation to land them in the simulator world.
fn visualize_edge(edge: &[Location], color: Color, z_offset: f64, debug_draw: &mut dyn DebugDraw) {
    for point in edge {
        let location = Location::new(point.x, -point.y, point.z + z_offset);
        debug_draw.draw_point(location, 0.1, color, 0.1);
    }
}

/// Blue heading arrow through the ego plus a perpendicular center line.
fn visualize_ego_dynamics(
    ego_dynamics: &EgoDynamics,
    ego_location: Location,
    debug_draw: &mut dyn DebugDraw,
) {
    let sin_heading = ego_dynamics.route_heading.sin();
    let cos_heading = ego_dynamics.route_heading.cos();

    let heading_start = Location::new(
        ego_location.x - cos_heading * 10.0,
        ego_location.y + sin_heading * 10.0,
        ego_location.z + 0.5,
    );
    let heading_end = Location::new(
        ego_location.x + cos_heading * 10.0,
        ego_location.y - sin_heading * 10.0,
        ego_location.z + 0.5,
    );
    debug_draw.draw_arrow(heading_start, heading_end, 0.1, 0.1, DYNAMICS_BLUE, 0.02);

    let sin_center = (ego_dynamics.route_heading + std::f64::consts::FRAC_PI_2).sin();
    let cos_center = (ego_dynamics.route_heading + std::f64::consts::FRAC_PI_2).cos();
    let center_start = Location::new(
        ego_location.x - cos_center * 2.0,
        ego_location.y + sin_center * 2.0,
        ego_location.z + 0.5,
    );
    let center_end = Location::new(
        ego_location.x + cos_center * 2.0,
        ego_location.y - sin_center * 2.0,
        ego_location.z + 0.5,
    );
    debug_draw.draw_line(center_start, center_end, 0.1, DYNAMICS_BLUE, 0.02);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::{
        LaneSegment, LateralState, LongitudinalState, RoadSegment, RssCalculationMode,
        UnstructuredSceneState,
    };
    use crate::transform::{Rotation, Transform};
    use crate::world::{Actor, BoundingBox};
    use nalgebra::{Point2, Vector3};

    #[derive(Default)]
    struct RecordingDraw {
        points: Vec<(Location, Color)>,
        lines: Vec<(Location, Location, Color)>,
        arrows: usize,
    }

    impl DebugDraw for RecordingDraw {
        fn draw_point(&mut self, location: Location, _size: f64, color: Color, _lifetime: f64) {
            self.points.push((location, color));
        }

        fn draw_line(
            &mut self,
            from: Location,
            to: Location,
            _thickness: f64,
            color: Color,
            _lifetime: f64,
        ) {
            self.lines.push((from, to, color));
        }

        fn draw_arrow(
            &mut self,
            _from: Location,
            _to: Location,
            _thickness: f64,
            _arrow_size: f64,
            _color: Color,
            _lifetime: f64,
        ) {
            self.arrows += 1;
        }
    }

    fn actor(id: u64, x: f64) -> Actor {
        Actor {
            id,
            type_id: "vehicle.test.car".to_string(),
            transform: Transform::new(Location::new(x, 0.0, 0.0), Rotation::default()),
            bounding_box: BoundingBox {
                center: Location::default(),
                extent: Vector3::new(2.0, 1.0, 0.7),
            },
        }
    }

    fn state(object_id: u64) -> IndividualRssState {
        IndividualRssState {
            object_id,
            calculation_mode: RssCalculationMode::Structured,
            is_dangerous: false,
            distance: 10.0,
            situation_type: SituationType::SameDirection,
            longitudinal: LongitudinalState::default(),
            lateral_left: LateralState::default(),
            lateral_right: LateralState::default(),
            unstructured: UnstructuredSceneState::default(),
        }
    }

    fn dynamics() -> EgoDynamics {
        EgoDynamics {
            ego_center: Point2::origin(),
            route_heading: 0.0,
            allowed_heading_ranges: Vec::new(),
        }
    }

    fn two_lane_route() -> Route {
        let lane = |lane_id| LaneSegment {
            lane_id,
            part_of_intersection: false,
            left_edge: vec![Location::new(0.0, 2.0, 0.0)],
            right_edge: vec![Location::new(0.0, -2.0, 0.0)],
        };
        Route {
            road_segments: vec![
                RoadSegment {
                    drivable_lane_segments: vec![lane(1), lane(2)],
                },
                // Same lanes again: must not be drawn twice.
                RoadSegment {
                    drivable_lane_segments: vec![lane(1), lane(2)],
                },
            ],
        }
    }

    #[test]
    fn test_mode_cycle_returns_to_off() {
        let mut mode = DebugVisualizationMode::Off;
        for _ in 0..5 {
            mode = mode.next();
        }
        assert_eq!(mode, DebugVisualizationMode::Off);
    }

    #[test]
    fn test_off_mode_draws_nothing() {
        let mut registry = ActorRegistry::new();
        registry.insert(actor(1, 0.0));
        registry.insert(actor(2, 10.0));
        let visualizer = DebugMarkerVisualizer::new(1);
        let mut draw = RecordingDraw::default();

        visualizer
            .tick(
                Some(&two_lane_route()),
                false,
                &[state(2)],
                &dynamics(),
                &registry,
                &mut draw,
            )
            .unwrap();

        assert!(draw.points.is_empty());
        assert!(draw.lines.is_empty());
    }

    #[test]
    fn test_route_edges_drawn_once_per_lane() {
        let mut registry = ActorRegistry::new();
        registry.insert(actor(1, 0.0));
        let mut visualizer = DebugMarkerVisualizer::new(1);
        visualizer.toggle_mode(); // RouteOnly
        let mut draw = RecordingDraw::default();

        visualizer
            .tick(
                Some(&two_lane_route()),
                false,
                &[],
                &dynamics(),
                &registry,
                &mut draw,
            )
            .unwrap();

        // One right-edge point for lane 1 and one left-edge point for
        // lane 2, despite both lanes appearing in two road segments.
        assert_eq!(draw.points.len(), 2);
        assert_eq!(draw.points[0].1, Color::new(255, 0, 0));
        assert_eq!(draw.points[1].1, Color::new(0, 255, 0));
        // Edge y is negated into the simulator frame.
        assert_eq!(draw.points[0].0.y, 2.0);
    }

    #[test]
    fn test_all_mode_draws_connection_lines_and_dynamics() {
        let mut registry = ActorRegistry::new();
        registry.insert(actor(1, 0.0));
        registry.insert(actor(2, 10.0));
        let mut visualizer = DebugMarkerVisualizer::new(1);
        while visualizer.mode() != DebugVisualizationMode::All {
            visualizer.toggle_mode();
        }
        let mut draw = RecordingDraw::default();

        visualizer
            .tick(None, false, &[state(2)], &dynamics(), &registry, &mut draw)
            .unwrap();

        // Three connection lines plus the dynamics center line.
        assert_eq!(draw.lines.len(), 4);
        assert_eq!(draw.arrows, 1);
        // Safe state: green indicator above the actor.
        assert_eq!(draw.points.last().unwrap().1, Color::new(0, 255, 0));
    }

    #[test]
    fn test_missing_actor_is_skipped() {
        let mut registry = ActorRegistry::new();
        registry.insert(actor(1, 0.0));
        let mut visualizer = DebugMarkerVisualizer::new(1);
        visualizer.toggle_mode();
        visualizer.toggle_mode(); // VehicleStateOnly
        let mut draw = RecordingDraw::default();

        visualizer
            .tick(None, false, &[state(99)], &dynamics(), &registry, &mut draw)
            .unwrap();

        assert!(draw.points.is_empty());
    }
}
