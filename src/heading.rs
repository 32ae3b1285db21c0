// src/heading.rs
//
// Closed "pie slice" polylines for allowed heading ranges, rendered as
// filled polygons over the unstructured scene overlay.

use nalgebra::Point2;
use std::f64::consts::PI;

/// Fixed angular increment used when sampling the arc.
pub const HEADING_STEP_RAD: f64 = 0.2;

/// Radius of the rendered heading slice, in meters.
pub const HEADING_RADIUS_M: f64 = 3.0;

/// An angular interval [begin, end), wrapping past 2π when end < begin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingRange {
    pub begin: f64,
    pub end: f64,
}

impl HeadingRange {
    pub fn new(begin: f64, end: f64) -> Self {
        Self { begin, end }
    }
}

/// Generate the closed polyline for a heading range: center, arc points
/// stepped at [`HEADING_STEP_RAD`], the exact end-angle point when the
/// stepping does not land on it, then back to center.
pub fn heading_range_polyline(
    range: &HeadingRange,
    center: Point2<f64>,
    radius: f64,
) -> Vec<Point2<f64>> {
    let mut line = vec![center];

    let mut current_angle = range.begin;
    let mut max_angle = range.end;
    if range.end < range.begin {
        max_angle += 2.0 * PI;
    }

    while current_angle < max_angle {
        line.push(Point2::new(
            center.x + radius * current_angle.cos(),
            center.y + radius * current_angle.sin(),
        ));
        current_angle += HEADING_STEP_RAD;
    }

    if current_angle != max_angle {
        line.push(Point2::new(
            center.x + radius * max_angle.cos(),
            center.y + radius * max_angle.sin(),
        ));
    }

    line.push(center);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_half_circle_point_count_and_exact_end() {
        let range = HeadingRange::new(0.0, PI);
        let center = Point2::new(0.0, 0.0);

        let line = heading_range_polyline(&range, center, 3.0);

        // center + arc points + closing center
        let arc_points = line.len() - 2;
        assert_eq!(arc_points, (PI / HEADING_STEP_RAD).ceil() as usize + 1);

        assert_eq!(line[0], center);
        assert_eq!(*line.last().unwrap(), center);

        // Last arc point before closure is the exact end angle.
        let last_arc = line[line.len() - 2];
        assert_relative_eq!(last_arc.x, 3.0 * PI.cos(), epsilon = 1e-12);
        assert_relative_eq!(last_arc.y, 3.0 * PI.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_wrapping_range_spans_past_two_pi() {
        // From 3π/2 around through 0 to π/2: a half circle crossing 2π.
        let range = HeadingRange::new(1.5 * PI, 0.5 * PI);
        let line = heading_range_polyline(&range, Point2::new(1.0, 1.0), 2.0);

        let arc_points = line.len() - 2;
        assert_eq!(arc_points, (PI / HEADING_STEP_RAD).ceil() as usize + 1);

        // End point wraps back to the exact end angle.
        let last_arc = line[line.len() - 2];
        assert_relative_eq!(last_arc.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(last_arc.y, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exact_step_multiple_has_no_duplicate_end() {
        // 0.4 rad range: stepping lands exactly on the end angle, so no
        // extra end point is appended.
        let range = HeadingRange::new(0.0, 0.4);
        let line = heading_range_polyline(&range, Point2::new(0.0, 0.0), 1.0);
        // center, 0.0, 0.2, center
        assert_eq!(line.len(), 4);
    }
}
