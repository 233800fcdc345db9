//! Primitive lists to layer shapes.
//!
//! Plot layers resolve polarity in file order through a
//! [`PolarityAccumulator`]. The outline layer is filled from the closed
//! loops its strokes trace.

use tracing::debug;

use crate::gerber::{ParsedPlot, Polarity, Primitive};

use super::aperture::{flash_shape, to_ring};
use super::cleanup::{clean_polygons, CleanupReport};
use super::polarity::{fill_even_odd, union_all, PolarityAccumulator};
use super::stroke::stroke_shape;
use super::types::{LayerShape, Point, PolygonSet, Ring};

/// Endpoints closer than this are joined when chaining outline strokes.
pub const CHAIN_TOLERANCE: f64 = 1e-3;

/// A built layer shape plus what it took to build it.
#[derive(Debug, Clone, Default)]
pub struct LayerBuild {
    /// Resolved planar shape.
    pub shape: LayerShape,
    /// Non-fatal problems met while building.
    pub warnings: Vec<String>,
    /// Boolean operations performed.
    pub operations: u32,
    /// Degenerate geometry removed.
    pub cleanup: CleanupReport,
}

/// Build the shape of a copper or silkscreen plot.
pub fn build_plot_layer(plot: &ParsedPlot) -> LayerBuild {
    let mut warnings = Vec::new();
    let (polygons, operations) = resolve_primitives(plot, &mut warnings);
    finish(polygons, operations, warnings)
}

/// Build the board footprint from an outline plot.
///
/// Closed centerline loops are filled with the even-odd rule so inner loops
/// become cut-outs, and outline regions are added as drawn. With no closed
/// loop and no region, the outer boundary of the stroked outline is used.
pub fn build_outline_layer(plot: &ParsedPlot) -> LayerBuild {
    let mut warnings = Vec::new();

    let paths: Vec<Vec<Point>> = plot
        .primitives
        .iter()
        .filter_map(|primitive| match primitive {
            Primitive::Line(stroke) if stroke.polarity == Polarity::Dark => {
                Some(stroke.points.clone())
            }
            _ => None,
        })
        .collect();
    let (loops, dangling) = chain_loops(paths, CHAIN_TOLERANCE);
    if dangling > 0 {
        warnings.push(format!(
            "{dangling} outline path(s) do not close and were ignored"
        ));
    }

    let mut filled = if loops.is_empty() {
        PolygonSet::new()
    } else {
        fill_even_odd(loops)
    };
    for primitive in &plot.primitives {
        if let Primitive::Region {
            contours,
            polarity: Polarity::Dark,
        } = primitive
        {
            filled.extend(fill_even_odd(contours.iter().map(|c| to_ring(c)).collect()));
        }
    }

    if !filled.is_empty() {
        let polygons = union_all(&filled);
        return finish(polygons, 1, warnings);
    }

    warnings.push("outline has no closed loop; filling the stroked outline".to_string());
    let (stroked, operations) = resolve_primitives(plot, &mut warnings);
    let outers: PolygonSet = stroked
        .into_iter()
        .filter_map(|polygon| polygon.into_iter().next())
        .map(|outer| vec![outer])
        .collect();
    finish(union_all(&outers), operations.saturating_add(1), warnings)
}

fn resolve_primitives(plot: &ParsedPlot, warnings: &mut Vec<String>) -> (PolygonSet, u32) {
    let mut accumulator = PolarityAccumulator::new();
    for primitive in &plot.primitives {
        let shape = match primitive {
            Primitive::Line(stroke) => match plot.apertures.get(&stroke.aperture) {
                Some(aperture) => stroke_shape(stroke, aperture, warnings),
                None => {
                    warnings.push(format!("draw with undefined aperture D{}", stroke.aperture));
                    continue;
                }
            },
            Primitive::Flash {
                point, aperture, ..
            } => match plot.apertures.get(aperture) {
                Some(aperture) => flash_shape(aperture, *point, warnings),
                None => {
                    warnings.push(format!("flash with undefined aperture D{aperture}"));
                    continue;
                }
            },
            Primitive::Region { contours, .. } => {
                fill_even_odd(contours.iter().map(|c| to_ring(c)).collect())
            }
        };
        accumulator.push(primitive.polarity(), shape);
    }
    let operations = accumulator.operations();
    (accumulator.finish(), operations)
}

fn finish(polygons: PolygonSet, operations: u32, warnings: Vec<String>) -> LayerBuild {
    let (polygons, cleanup) = clean_polygons(polygons);
    let shape = LayerShape::from_polygons(polygons);
    debug!(
        polygons = shape.polygons.len(),
        holes = shape.hole_count(),
        operations,
        welded = cleanup.welded_points,
        dropped = cleanup.dropped_contours,
        "built layer shape"
    );
    LayerBuild {
        shape,
        warnings,
        operations,
        cleanup,
    }
}

/// Join open paths end to end into closed rings.
///
/// Returns the rings (closing point removed) and the number of paths that
/// could not be closed.
pub fn chain_loops(paths: Vec<Vec<Point>>, tolerance: f64) -> (Vec<Ring>, usize) {
    let mut pending: Vec<Vec<Point>> = paths.into_iter().filter(|p| p.len() >= 2).collect();
    let mut loops: Vec<Ring> = Vec::new();
    let mut dangling = 0;

    while let Some(mut path) = pending.pop() {
        loop {
            let (Some(&start), Some(&end)) = (path.first(), path.last()) else {
                break;
            };
            if path.len() > 2 && start.distance(end) <= tolerance {
                path.pop();
                loops.push(path.iter().map(|p| p.to_array()).collect());
                break;
            }

            let next = pending.iter().position(|candidate| {
                candidate.first().is_some_and(|p| p.distance(end) <= tolerance)
                    || candidate.last().is_some_and(|p| p.distance(end) <= tolerance)
            });
            let Some(index) = next else {
                dangling += 1;
                break;
            };
            let mut piece = pending.swap_remove(index);
            if piece.first().is_some_and(|p| p.distance(end) > tolerance) {
                piece.reverse();
            }
            path.extend(piece.into_iter().skip(1));
        }
    }

    loops.retain(|ring| ring.len() >= 3);
    (loops, dangling)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;

    use super::*;
    use crate::gerber::{Aperture, ApertureShape, Stroke};

    fn line(points: &[(f64, f64)], polarity: Polarity) -> Primitive {
        Primitive::Line(Stroke {
            aperture: 10,
            polarity,
            points: points.iter().map(|(x, y)| Point::new(*x, *y)).collect(),
        })
    }

    fn plot(primitives: Vec<Primitive>) -> ParsedPlot {
        let mut apertures = HashMap::new();
        apertures.insert(
            10,
            Aperture {
                code: 10,
                shape: ApertureShape::Circle {
                    diameter: 0.1,
                    hole: None,
                },
            },
        );
        ParsedPlot {
            primitives,
            apertures,
            ..ParsedPlot::default()
        }
    }

    fn square_lines(x: f64, y: f64, size: f64) -> Vec<Primitive> {
        let corners = [
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ];
        corners
            .windows(2)
            .map(|pair| line(pair, Polarity::Dark))
            .collect()
    }

    #[test]
    fn ut_bld_001_outline_loop_is_filled() {
        let build = build_outline_layer(&plot(square_lines(0.0, 0.0, 10.0)));
        assert_relative_eq!(build.shape.area(), 100.0, epsilon = 1e-6);
        assert_relative_eq!(build.shape.bounds().width(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn ut_bld_002_inner_loop_becomes_cutout() {
        let mut primitives = square_lines(0.0, 0.0, 10.0);
        primitives.extend(square_lines(4.0, 4.0, 2.0));
        let build = build_outline_layer(&plot(primitives));
        assert_relative_eq!(build.shape.area(), 96.0, epsilon = 1e-6);
        assert_eq!(build.shape.hole_count(), 1);
    }

    #[test]
    fn ut_bld_003_clear_flash_cuts_dark_stroke() {
        let mut source = plot(vec![
            line(&[(0.0, 0.0), (10.0, 0.0)], Polarity::Dark),
            Primitive::Flash {
                point: Point::new(5.0, 0.0),
                aperture: 11,
                polarity: Polarity::Clear,
            },
        ]);
        source.apertures.insert(
            11,
            Aperture {
                code: 11,
                shape: ApertureShape::Rectangle {
                    width: 1.0,
                    height: 1.0,
                    hole: None,
                },
            },
        );
        let build = build_plot_layer(&source);
        assert_eq!(build.shape.polygons.len(), 2);
    }

    #[test]
    fn ut_bld_004_chain_reverses_pieces() {
        let paths = vec![
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            vec![Point::new(1.0, 1.0), Point::new(1.0, 0.0)],
            vec![Point::new(1.0, 1.0), Point::new(0.0, 0.0)],
        ];
        let (loops, dangling) = chain_loops(paths, CHAIN_TOLERANCE);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops.first().map(Vec::len), Some(3));
        assert_eq!(dangling, 0);
    }

    #[test]
    fn bc_bld_001_open_outline_falls_back_to_stroke_boundary() {
        let primitives = vec![
            line(&[(0.0, 0.0), (10.0, 0.0)], Polarity::Dark),
            line(&[(10.0, 0.0), (10.0, 10.0)], Polarity::Dark),
        ];
        let build = build_outline_layer(&plot(primitives));
        assert!(!build.shape.is_empty());
        assert_eq!(build.shape.hole_count(), 0);
        assert!(build
            .warnings
            .iter()
            .any(|warning| warning.contains("no closed loop")));
    }

    #[test]
    fn bc_bld_002_empty_plot_gives_empty_shape() {
        let build = build_plot_layer(&plot(Vec::new()));
        assert!(build.shape.is_empty());
    }
}
