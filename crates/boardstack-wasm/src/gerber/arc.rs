//! Circular interpolation (G02/G03) tessellation.
//!
//! Arcs are flattened into chords at parse time so every downstream stage
//! only ever sees polylines.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::GeometryError;
use crate::geometry::Point;

/// Maximum angle swept by one chord.
const MAX_CHORD_ANGLE: f64 = TAU / 36.0;
const RADIUS_MISMATCH_TOLERANCE: f64 = 1e-3;
const POINT_EQUALITY_EPSILON: f64 = 1e-9;
const QUADRANT_SLACK: f64 = 1e-6;

/// Arc sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// G02.
    Clockwise,
    /// G03.
    CounterClockwise,
}

/// Tessellate a multi-quadrant arc (G75). `center_offset` is signed and
/// relative to `from`. Coinciding endpoints produce a full circle.
///
/// The returned points include both `from` and `to`.
///
/// # Errors
///
/// Returns [`GeometryError::ArcError`] for a zero radius.
pub fn multi_quadrant_points(
    from: Point,
    to: Point,
    center_offset: Point,
    direction: ArcDirection,
    warnings: &mut Vec<String>,
) -> Result<Vec<Point>, GeometryError> {
    let center = from.offset(center_offset.x, center_offset.y);
    let radius = from.distance(center);
    if radius <= POINT_EQUALITY_EPSILON {
        return Err(GeometryError::ArcError(format!(
            "zero radius arc from ({}, {})",
            from.x, from.y
        )));
    }

    let start_angle = angle_of(center, from);
    let sweep = if points_approx_equal(from, to) {
        match direction {
            ArcDirection::Clockwise => -TAU,
            ArcDirection::CounterClockwise => TAU,
        }
    } else {
        check_radius(radius, to.distance(center), warnings);
        compute_sweep(start_angle, angle_of(center, to), direction)
    };

    Ok(tessellate(center, radius, start_angle, sweep, from, to))
}

/// Tessellate a single-quadrant arc (G74). Offsets are unsigned; the centre is
/// the candidate whose sweep stays within 90 degrees and whose radii agree best.
///
/// # Errors
///
/// Returns [`GeometryError::ArcError`] when no candidate centre gives a
/// quarter-circle or smaller arc.
pub fn single_quadrant_points(
    from: Point,
    to: Point,
    center_offset: Point,
    direction: ArcDirection,
    warnings: &mut Vec<String>,
) -> Result<Vec<Point>, GeometryError> {
    if points_approx_equal(from, to) {
        return Ok(vec![from, to]);
    }

    let (i, j) = (center_offset.x.abs(), center_offset.y.abs());
    let candidates = [
        from.offset(i, j),
        from.offset(-i, j),
        from.offset(i, -j),
        from.offset(-i, -j),
    ];

    let best = candidates
        .iter()
        .filter_map(|center| {
            let start_angle = angle_of(*center, from);
            let sweep = compute_sweep(start_angle, angle_of(*center, to), direction);
            if sweep.abs() > FRAC_PI_2 + QUADRANT_SLACK {
                return None;
            }
            let mismatch = (from.distance(*center) - to.distance(*center)).abs();
            Some((*center, start_angle, sweep, mismatch))
        })
        .min_by(|a, b| a.3.total_cmp(&b.3));

    let Some((center, start_angle, sweep, _)) = best else {
        return Err(GeometryError::ArcError(format!(
            "no single-quadrant centre fits arc ({}, {}) -> ({}, {})",
            from.x, from.y, to.x, to.y
        )));
    };

    let radius = from.distance(center);
    if radius <= POINT_EQUALITY_EPSILON {
        return Ok(vec![from, to]);
    }
    check_radius(radius, to.distance(center), warnings);

    Ok(tessellate(center, radius, start_angle, sweep, from, to))
}

fn check_radius(start_radius: f64, end_radius: f64, warnings: &mut Vec<String>) {
    if (start_radius - end_radius).abs() > RADIUS_MISMATCH_TOLERANCE {
        warnings.push(format!(
            "arc radii mismatch ({start_radius} vs {end_radius}); end point kept"
        ));
    }
}

fn angle_of(center: Point, point: Point) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

fn compute_sweep(start_angle: f64, end_angle: f64, direction: ArcDirection) -> f64 {
    let delta = end_angle - start_angle;
    match direction {
        ArcDirection::Clockwise => {
            if delta >= 0.0 {
                delta - TAU
            } else {
                delta
            }
        }
        ArcDirection::CounterClockwise => {
            if delta <= 0.0 {
                delta + TAU
            } else {
                delta
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn chord_count(sweep: f64) -> u32 {
    let raw = (sweep.abs() / MAX_CHORD_ANGLE).ceil();
    if raw.is_finite() && raw >= 1.0 {
        raw as u32
    } else {
        1
    }
}

/// Interior points follow the circle; the last point is snapped to `to` so
/// consecutive draws stay connected.
fn tessellate(
    center: Point,
    radius: f64,
    start_angle: f64,
    sweep: f64,
    from: Point,
    to: Point,
) -> Vec<Point> {
    let chords = chord_count(sweep);
    let mut points = Vec::with_capacity(chords as usize + 1);
    points.push(from);
    for step in 1..chords {
        let t = f64::from(step) / f64::from(chords);
        let angle = sweep.mul_add(t, start_angle);
        points.push(Point::new(
            radius.mul_add(angle.cos(), center.x),
            radius.mul_add(angle.sin(), center.y),
        ));
    }
    points.push(to);
    points
}

fn points_approx_equal(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() <= POINT_EQUALITY_EPSILON && (a.y - b.y).abs() <= POINT_EQUALITY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn ut_arc_001_quarter_circle_ccw_stays_on_radius() {
        let mut warnings = Vec::new();
        let result = multi_quadrant_points(
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
            ArcDirection::CounterClockwise,
            &mut warnings,
        );
        assert!(result.is_ok());
        if let Ok(points) = result {
            assert_eq!(points.len(), 10);
            for point in &points {
                assert!((point.distance(Point::new(0.0, 0.0)) - 1.0).abs() < 1e-9);
            }
            assert!(points.iter().all(|p| p.x >= -EPSILON && p.y >= -EPSILON));
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn ut_arc_002_clockwise_goes_the_long_way() {
        let mut warnings = Vec::new();
        let result = multi_quadrant_points(
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
            ArcDirection::Clockwise,
            &mut warnings,
        );
        assert!(result.is_ok());
        if let Ok(points) = result {
            assert_eq!(points.len(), 28);
            assert!(points.iter().any(|p| p.y < -0.9));
        }
    }

    #[test]
    fn ut_arc_003_coinciding_endpoints_make_full_circle() {
        let mut warnings = Vec::new();
        let result = multi_quadrant_points(
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            ArcDirection::CounterClockwise,
            &mut warnings,
        );
        assert!(result.is_ok());
        if let Ok(points) = result {
            assert_eq!(points.len(), 37);
        }
    }

    #[test]
    fn ut_arc_004_single_quadrant_picks_matching_centre() {
        let mut warnings = Vec::new();
        let result = single_quadrant_points(
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
            ArcDirection::CounterClockwise,
            &mut warnings,
        );
        assert!(result.is_ok());
        if let Ok(points) = result {
            for point in &points {
                assert!((point.distance(Point::new(0.0, 0.0)) - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn bc_arc_001_zero_radius_is_error() {
        let mut warnings = Vec::new();
        let result = multi_quadrant_points(
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 0.0),
            ArcDirection::Clockwise,
            &mut warnings,
        );
        assert!(matches!(result, Err(GeometryError::ArcError(_))));
    }

    #[test]
    fn bc_arc_002_radius_mismatch_warns() {
        let mut warnings = Vec::new();
        let result = multi_quadrant_points(
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.5),
            Point::new(-1.0, 0.0),
            ArcDirection::CounterClockwise,
            &mut warnings,
        );
        assert!(result.is_ok());
        assert!(warnings.iter().any(|w| w.contains("radii mismatch")));
    }
}
