// src/rss.rs
//
// Data consumed from the RSS evaluation library, one snapshot per frame.
// Plain data only — evaluation happens upstream; this crate just renders
// what it is handed.

use nalgebra::Point2;

use crate::heading::HeadingRange;
use crate::transform::Location;

/// Sentinel object ids the evaluator uses for road borders in
/// unstructured scenes.
pub const OBJECT_ID_BORDER_LEFT: u64 = u64::MAX - 1;
pub const OBJECT_ID_BORDER_RIGHT: u64 = u64::MAX;

/// How the evaluator handled an actor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RssCalculationMode {
    Structured,
    Unstructured,
    NotRelevant,
}

impl RssCalculationMode {
    /// Single-character tag shown in the state panel.
    pub fn panel_char(&self) -> &'static str {
        match self {
            Self::Structured => "S",
            Self::Unstructured => "U",
            Self::NotRelevant => "-",
        }
    }

    pub fn is_relevant(&self) -> bool {
        !matches!(self, Self::NotRelevant)
    }
}

/// Situation classification reported alongside each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SituationType {
    NotRelevant,
    SameDirection,
    OppositeDirection,
    IntersectionEgoHasPriority,
    IntersectionObjectHasPriority,
    IntersectionSamePriority,
    Unstructured,
}

/// Which longitudinal evaluator produced an unsafe verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongitudinalEvaluator {
    #[default]
    None,
    SameDirectionOtherInFront,
    SameDirectionEgoFront,
    OppositeDirectionEgoCorrectLane,
    OppositeDirection,
}

impl LongitudinalEvaluator {
    /// The other actor is ahead of the ego (panel shows an "ahead" glyph).
    pub fn other_in_front(&self) -> bool {
        matches!(
            self,
            Self::SameDirectionOtherInFront | Self::SameDirectionEgoFront
        )
    }

    /// Oncoming traffic situation (panel shows a "behind" glyph).
    pub fn opposite_direction(&self) -> bool {
        matches!(
            self,
            Self::OppositeDirectionEgoCorrectLane | Self::OppositeDirection
        )
    }
}

/// Longitudinal component of a structured RSS state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongitudinalState {
    pub is_safe: bool,
    pub evaluator: LongitudinalEvaluator,
}

/// Lateral component (left or right) of a structured RSS state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LateralState {
    pub is_safe: bool,
    /// False when no lateral evaluator ran for this side.
    pub evaluated: bool,
}

/// Proper response requested for an unstructured scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnstructuredResponse {
    #[default]
    None,
    DriveAway,
    ContinueForward,
    Brake,
}

impl UnstructuredResponse {
    pub fn panel_char(&self) -> Option<&'static str> {
        match self {
            Self::DriveAway => Some("D"),
            Self::ContinueForward => Some("C"),
            Self::Brake => Some("B"),
            Self::None => None,
        }
    }
}

/// Trajectory sample points in RSS map coordinates (ground plane).
pub type TrajectorySet = Vec<Point2<f64>>;

/// Unstructured-scene component of a state: requested response plus the
/// trajectory sets backing it.
#[derive(Debug, Clone, Default)]
pub struct UnstructuredSceneState {
    pub response: UnstructuredResponse,
    pub brake_trajectory_set: TrajectorySet,
    pub continue_forward_trajectory_set: TrajectorySet,
}

/// RSS evaluation result for one (ego, object) pair.
#[derive(Debug, Clone)]
pub struct IndividualRssState {
    pub object_id: u64,
    pub calculation_mode: RssCalculationMode,
    pub is_dangerous: bool,
    pub distance: f64,
    pub situation_type: SituationType,
    pub longitudinal: LongitudinalState,
    pub lateral_left: LateralState,
    pub lateral_right: LateralState,
    pub unstructured: UnstructuredSceneState,
}

/// Ego-side trajectory sets for unstructured scenes.
#[derive(Debug, Clone, Default)]
pub struct UnstructuredEgoInfo {
    pub brake_trajectory_set: TrajectorySet,
    pub continue_forward_trajectory_set: TrajectorySet,
}

/// One full evaluation snapshot, identified by the frame it belongs to.
#[derive(Debug, Clone, Default)]
pub struct RssStateSnapshot {
    pub ego_information: UnstructuredEgoInfo,
    pub individual_responses: Vec<IndividualRssState>,
}

/// Ego dynamics projected onto the current route.
#[derive(Debug, Clone)]
pub struct EgoDynamics {
    /// Ego center in RSS map coordinates.
    pub ego_center: Point2<f64>,
    /// Heading along the route, radians.
    pub route_heading: f64,
    pub allowed_heading_ranges: Vec<HeadingRange>,
}

/// Lane edge geometry of a drivable lane segment. Edge points are in RSS
/// map (ENU) coordinates; y is negated when drawn into the simulator
/// world.
#[derive(Debug, Clone)]
pub struct LaneSegment {
    pub lane_id: u64,
    pub part_of_intersection: bool,
    pub left_edge: Vec<Location>,
    pub right_edge: Vec<Location>,
}

/// Road segment along the route. Lane segments are ordered right-most
/// first, matching the map library.
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub drivable_lane_segments: Vec<LaneSegment>,
}

/// The planned route, as road segments with lane edge geometry.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub road_segments: Vec<RoadSegment>,
}
