//! Aperture outlines.
//!
//! Converts a defined aperture into the closed polygon it exposes when
//! flashed. Circles and round ends use [`CIRCLE_SEGMENTS`] vertices.

use std::f64::consts::{PI, TAU};

use crate::gerber::{Aperture, ApertureShape, MacroOutline};

use super::polarity::{difference, PolarityAccumulator};
use super::types::{Point, PolygonSet, Ring};

/// Vertex count of a full-circle approximation.
pub const CIRCLE_SEGMENTS: u32 = 48;

/// Closed circle approximation, counter-clockwise.
pub fn circle_contour(center: Point, radius: f64, segments: u32) -> Vec<Point> {
    let count = segments.max(3);
    (0..count)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(count);
            Point::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
        .collect()
}

/// Axis-aligned rectangle centred on `center`, counter-clockwise.
pub fn rectangle_contour(center: Point, width: f64, height: f64) -> Vec<Point> {
    let half_width = width / 2.0;
    let half_height = height / 2.0;
    vec![
        center.offset(-half_width, -half_height),
        center.offset(half_width, -half_height),
        center.offset(half_width, half_height),
        center.offset(-half_width, half_height),
    ]
}

/// Stadium centred on `center`; the round ends sit on the shorter axis.
pub fn obround_contour(center: Point, width: f64, height: f64) -> Vec<Point> {
    if (width - height).abs() <= f64::EPSILON {
        return circle_contour(center, width / 2.0, CIRCLE_SEGMENTS);
    }

    let half_segments = CIRCLE_SEGMENTS / 2;
    let (radius, first_cap, second_cap, first_start) = if width > height {
        let half_body = (width - height) / 2.0;
        (
            height / 2.0,
            center.offset(half_body, 0.0),
            center.offset(-half_body, 0.0),
            -PI / 2.0,
        )
    } else {
        let half_body = (height - width) / 2.0;
        (
            width / 2.0,
            center.offset(0.0, half_body),
            center.offset(0.0, -half_body),
            0.0,
        )
    };

    let mut points = semicircle(first_cap, radius, first_start, half_segments);
    points.extend(semicircle(second_cap, radius, first_start + PI, half_segments));
    points
}

fn semicircle(center: Point, radius: f64, start_angle: f64, segments: u32) -> Vec<Point> {
    let count = segments.max(1);
    (0..=count)
        .map(|i| {
            let angle = PI.mul_add(f64::from(i) / f64::from(count), start_angle);
            Point::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
        .collect()
}

/// Regular polygon with its first vertex at `rotation` degrees.
pub fn regular_polygon_contour(
    center: Point,
    diameter: f64,
    vertices: u32,
    rotation: f64,
) -> Vec<Point> {
    let sides = vertices.max(3);
    let radius = diameter / 2.0;
    let rotation = rotation.to_radians();
    (0..sides)
        .map(|i| {
            let angle = TAU.mul_add(f64::from(i) / f64::from(sides), rotation);
            Point::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
        .collect()
}

/// Rotate a point about the origin by `angle_deg` degrees counter-clockwise.
pub fn rotate_point(point: Point, angle_deg: f64) -> Point {
    if angle_deg.abs() < f64::EPSILON {
        return point;
    }
    let (s, c) = angle_deg.to_radians().sin_cos();
    Point::new(
        point.x.mul_add(c, -(point.y * s)),
        point.x.mul_add(s, point.y * c),
    )
}

/// Convert a contour to an overlay ring.
pub fn to_ring(contour: &[Point]) -> Ring {
    contour.iter().map(|point| point.to_array()).collect()
}

/// Shape exposed by flashing `aperture` at `at`.
///
/// Zero-size apertures expose nothing. Negative sizes are taken as absolute
/// values with a warning.
pub fn flash_shape(aperture: &Aperture, at: Point, warnings: &mut Vec<String>) -> PolygonSet {
    let code = aperture.code;
    let (outer, hole) = match &aperture.shape {
        ApertureShape::Circle { diameter, hole } => {
            let Some(diameter) = normalize_dimension(*diameter, code, warnings) else {
                return PolygonSet::new();
            };
            (circle_contour(at, diameter / 2.0, CIRCLE_SEGMENTS), *hole)
        }
        ApertureShape::Rectangle {
            width,
            height,
            hole,
        } => {
            let (Some(width), Some(height)) = (
                normalize_dimension(*width, code, warnings),
                normalize_dimension(*height, code, warnings),
            ) else {
                return PolygonSet::new();
            };
            (rectangle_contour(at, width, height), *hole)
        }
        ApertureShape::Obround {
            width,
            height,
            hole,
        } => {
            let (Some(width), Some(height)) = (
                normalize_dimension(*width, code, warnings),
                normalize_dimension(*height, code, warnings),
            ) else {
                return PolygonSet::new();
            };
            (obround_contour(at, width, height), *hole)
        }
        ApertureShape::Polygon {
            diameter,
            vertices,
            rotation,
            hole,
        } => {
            let Some(diameter) = normalize_dimension(*diameter, code, warnings) else {
                return PolygonSet::new();
            };
            (
                regular_polygon_contour(at, diameter, *vertices, *rotation),
                *hole,
            )
        }
        ApertureShape::Macro { outlines, .. } => return macro_shape(outlines, at),
    };

    let shape = vec![vec![to_ring(&outer)]];
    match hole.filter(|d| *d > f64::EPSILON) {
        Some(hole_diameter) => {
            let cutter = vec![vec![to_ring(&circle_contour(
                at,
                hole_diameter / 2.0,
                CIRCLE_SEGMENTS,
            ))]];
            difference(&shape, &cutter)
        }
        None => shape,
    }
}

/// Combine evaluated macro outlines in order, then translate to `at`.
fn macro_shape(outlines: &[MacroOutline], at: Point) -> PolygonSet {
    let mut accumulator = PolarityAccumulator::new();
    for outline in outlines {
        let ring: Ring = outline
            .contour
            .iter()
            .map(|point| [point.x + at.x, point.y + at.y])
            .collect();
        accumulator.push(outline.polarity, vec![vec![ring]]);
    }
    accumulator.finish()
}

fn normalize_dimension(value: f64, code: u32, warnings: &mut Vec<String>) -> Option<f64> {
    if !value.is_finite() {
        warnings.push(format!("aperture D{code} has a non-finite size; flash skipped"));
        return None;
    }
    let magnitude = value.abs();
    if value < 0.0 {
        warnings.push(format!(
            "aperture D{code} has negative size {value}; using {magnitude}"
        ));
    }
    if magnitude <= f64::EPSILON {
        return None;
    }
    Some(magnitude)
}

/// Points of the aperture outline relative to its centre, used to sweep
/// non-round apertures along a stroke.
pub fn outline_points(aperture: &Aperture, warnings: &mut Vec<String>) -> Vec<Point> {
    flash_shape(aperture, Point::default(), warnings)
        .into_iter()
        .filter_map(|polygon| polygon.into_iter().next())
        .flatten()
        .map(|[x, y]| Point::new(x, y))
        .collect()
}
