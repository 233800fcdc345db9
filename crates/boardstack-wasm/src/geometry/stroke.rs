//! Stroke widening for D01 draws.
//!
//! A draw is the Minkowski sweep of its aperture along the centerline.
//! Round apertures produce one capsule per chord. Every other aperture
//! produces, per chord, the convex hull of its outline at both chord ends.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::gerber::{Aperture, ApertureShape, Stroke};

use super::aperture::{flash_shape, outline_points, to_ring, CIRCLE_SEGMENTS};
use super::types::{Point, PolygonSet};

const POINT_EPSILON: f64 = 1e-9;

/// Sweep `aperture` along `stroke`.
///
/// A stroke whose points all coincide exposes the same area as a flash.
pub fn stroke_shape(stroke: &Stroke, aperture: &Aperture, warnings: &mut Vec<String>) -> PolygonSet {
    let chords: Vec<(Point, Point)> = stroke
        .points
        .windows(2)
        .filter_map(|pair| match pair {
            [from, to] if from.distance(*to) > POINT_EPSILON => Some((*from, *to)),
            _ => None,
        })
        .collect();

    if chords.is_empty() {
        return stroke
            .points
            .first()
            .map_or_else(PolygonSet::new, |at| flash_shape(aperture, *at, warnings));
    }

    match aperture.shape {
        ApertureShape::Circle { diameter, .. } => {
            let radius = diameter.abs() / 2.0;
            if !radius.is_finite() || radius <= f64::EPSILON {
                warnings.push(format!(
                    "draw with zero-size aperture D{}; skipped",
                    aperture.code
                ));
                return PolygonSet::new();
            }
            chords
                .into_iter()
                .map(|(from, to)| vec![to_ring(&capsule_contour(from, to, radius))])
                .collect()
        }
        _ => {
            if matches!(aperture.shape, ApertureShape::Macro { .. }) {
                warnings.push(format!(
                    "draw with macro aperture D{} approximated by its convex hull",
                    aperture.code
                ));
            }
            let outline = outline_points(aperture, warnings);
            if outline.len() < 3 {
                return PolygonSet::new();
            }
            chords
                .into_iter()
                .map(|(from, to)| {
                    let swept: Vec<Point> = outline
                        .iter()
                        .flat_map(|p| [p.offset(from.x, from.y), p.offset(to.x, to.y)])
                        .collect();
                    vec![to_ring(&convex_hull(swept))]
                })
                .collect()
        }
    }
}

/// Counter-clockwise stadium around the segment `from`-`to`.
pub fn capsule_contour(from: Point, to: Point, radius: f64) -> Vec<Point> {
    let heading = (to.y - from.y).atan2(to.x - from.x);
    let half = CIRCLE_SEGMENTS / 2;
    let arc = |center: Point, start: f64| {
        (0..=half).map(move |step| {
            let angle = f64::from(step).mul_add(PI / f64::from(half), start);
            Point::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
    };
    arc(to, heading - FRAC_PI_2)
        .chain(arc(from, heading + FRAC_PI_2))
        .collect()
}

/// Convex hull by monotone chain, counter-clockwise, without collinear points.
pub fn convex_hull(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup_by(|a, b| a.distance(*b) <= POINT_EPSILON);
    if points.len() < 3 {
        return points;
    }

    let cross = |o: Point, a: Point, b: Point| {
        (a.x - o.x).mul_add(b.y - o.y, -((a.y - o.y) * (b.x - o.x)))
    };
    let half_hull = |iter: &mut dyn Iterator<Item = Point>| {
        let mut hull: Vec<Point> = Vec::new();
        for point in iter {
            while let [.., a, b] = hull.as_slice() {
                if cross(*a, *b, point) > 0.0 {
                    break;
                }
                hull.pop();
            }
            hull.push(point);
        }
        hull.pop();
        hull
    };

    let mut lower = half_hull(&mut points.iter().copied());
    let upper = half_hull(&mut points.iter().rev().copied());
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::polarity::union_all;
    use crate::geometry::types::{polygon_set_area, signed_area, BoundingBox};
    use crate::gerber::Polarity;

    fn round(diameter: f64) -> Aperture {
        Aperture {
            code: 10,
            shape: ApertureShape::Circle {
                diameter,
                hole: None,
            },
        }
    }

    fn stroke(points: Vec<Point>) -> Stroke {
        Stroke {
            aperture: 10,
            polarity: Polarity::Dark,
            points,
        }
    }

    #[test]
    fn ut_str_001_round_stroke_is_capsule() {
        let mut warnings = Vec::new();
        let shape = stroke_shape(
            &stroke(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]),
            &round(1.0),
            &mut warnings,
        );
        assert_eq!(shape.len(), 1);
        let area = polygon_set_area(&shape);
        let expected = 10.0 + PI * 0.25;
        assert!(area <= expected);
        assert!(area > expected - 0.01);
        let bounds = BoundingBox::of_polygons(&shape);
        assert_relative_eq!(bounds.width(), 11.0, epsilon = 1e-9);
    }

    #[test]
    fn ut_str_002_rectangle_stroke_is_hull() {
        let mut warnings = Vec::new();
        let aperture = Aperture {
            code: 11,
            shape: ApertureShape::Rectangle {
                width: 1.0,
                height: 1.0,
                hole: None,
            },
        };
        let shape = stroke_shape(
            &stroke(vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)]),
            &aperture,
            &mut warnings,
        );
        assert_relative_eq!(polygon_set_area(&shape), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn ut_str_003_polyline_gets_one_capsule_per_chord() {
        let mut warnings = Vec::new();
        let shape = stroke_shape(
            &stroke(vec![
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(5.0, 5.0),
            ]),
            &round(0.5),
            &mut warnings,
        );
        assert_eq!(shape.len(), 2);
        assert_eq!(union_all(&shape).len(), 1);
    }

    #[test]
    fn ut_str_004_hull_is_counter_clockwise() {
        let hull = convex_hull(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.5),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(1.0, 0.0),
        ]);
        assert_eq!(hull.len(), 4);
        let ring: Vec<[f64; 2]> = hull.iter().map(|p| p.to_array()).collect();
        assert_relative_eq!(signed_area(&ring), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn bc_str_001_zero_length_stroke_equals_flash() {
        let mut warnings = Vec::new();
        let at = Point::new(3.0, 3.0);
        let shape = stroke_shape(&stroke(vec![at, at]), &round(2.0), &mut warnings);
        let flash = flash_shape(&round(2.0), at, &mut warnings);
        assert_relative_eq!(
            polygon_set_area(&shape),
            polygon_set_area(&flash),
            epsilon = 1e-12
        );
    }

    #[test]
    fn bc_str_002_zero_diameter_draw_is_skipped() {
        let mut warnings = Vec::new();
        let shape = stroke_shape(
            &stroke(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]),
            &round(0.0),
            &mut warnings,
        );
        assert!(shape.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
