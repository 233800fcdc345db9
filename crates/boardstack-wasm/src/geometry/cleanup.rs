//! Redundant-geometry removal: weld near-duplicate points and drop
//! degenerate contours.

use super::types::{signed_area, PolygonSet, Ring};

/// Points closer than this are welded.
pub const WELD_DISTANCE: f64 = 1e-6;
/// Contours with a smaller absolute area are dropped.
pub const MIN_CONTOUR_AREA: f64 = 1e-9;

/// Totals of what [`clean_polygons`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Points merged into a neighbour.
    pub welded_points: usize,
    /// Contours dropped as degenerate.
    pub dropped_contours: usize,
}

/// Weld near-duplicate points and drop contours with fewer than three
/// distinct points or near-zero area. A polygon whose outer contour is
/// dropped is dropped with its holes.
pub fn clean_polygons(polygons: PolygonSet) -> (PolygonSet, CleanupReport) {
    let mut report = CleanupReport::default();
    let cleaned = polygons
        .into_iter()
        .filter_map(|polygon| {
            let mut rings = polygon.into_iter();
            let outer = clean_ring(rings.next()?, &mut report)?;
            let mut kept = vec![outer];
            kept.extend(rings.filter_map(|ring| clean_ring(ring, &mut report)));
            Some(kept)
        })
        .collect();
    (cleaned, report)
}

fn clean_ring(ring: Ring, report: &mut CleanupReport) -> Option<Ring> {
    let original = ring.len();
    let mut welded: Ring = Vec::with_capacity(original);
    for point in ring {
        if !(point[0].is_finite() && point[1].is_finite()) {
            continue;
        }
        match welded.last() {
            Some(last) if near(*last, point) => {}
            _ => welded.push(point),
        }
    }
    while let (Some(first), Some(last)) = (welded.first(), welded.last()) {
        if welded.len() > 1 && near(*first, *last) {
            welded.pop();
        } else {
            break;
        }
    }
    report.welded_points += original - welded.len();

    if welded.len() < 3 || signed_area(&welded).abs() < MIN_CONTOUR_AREA {
        report.dropped_contours += 1;
        return None;
    }
    Some(welded)
}

fn near(a: [f64; 2], b: [f64; 2]) -> bool {
    (a[0] - b[0]).hypot(a[1] - b[1]) < WELD_DISTANCE
}
