//! Drill record footprints.

use crate::excellon::{DrillKind, DrillRecord};

use super::aperture::{circle_contour, to_ring};
use super::stroke::capsule_contour;
use super::types::{BoundingBox, Point, Ring};

/// Sides of a plunge footprint.
pub const DRILL_SEGMENTS: u32 = 32;

/// Planar outline of one drill record.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillFootprint {
    /// Tool number.
    pub tool: u32,
    /// Tool diameter in millimetres.
    pub diameter: f64,
    /// Plunge centre or route start.
    pub center: Point,
    /// Route end for routed records.
    pub route_end: Option<Point>,
    /// Counter-clockwise outline.
    pub polygon: Ring,
}

impl DrillFootprint {
    /// Footprint of a record: a 32-gon for a plunge, a capsule for a route.
    pub fn from_record(record: &DrillRecord) -> Self {
        let radius = record.diameter / 2.0;
        let (route_end, contour) = match record.kind {
            DrillKind::Plunge => (
                None,
                circle_contour(record.position, radius, DRILL_SEGMENTS),
            ),
            DrillKind::Route { end } => (
                Some(end),
                capsule_contour(record.position, end, radius),
            ),
        };
        Self {
            tool: record.tool,
            diameter: record.diameter,
            center: record.position,
            route_end,
            polygon: to_ring(&contour),
        }
    }

    /// Bounding box of the outline.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::new();
        for [x, y] in &self.polygon {
            bounds.update(*x, *y);
        }
        bounds
    }

    /// True when the outline has at least three finite points and a
    /// positive diameter.
    pub fn is_valid(&self) -> bool {
        self.diameter.is_finite()
            && self.diameter > 0.0
            && self.polygon.len() >= 3
            && self
                .polygon
                .iter()
                .all(|[x, y]| x.is_finite() && y.is_finite())
    }
}

/// Footprints for every record, in record order.
pub fn footprints(records: &[DrillRecord]) -> Vec<DrillFootprint> {
    records.iter().map(DrillFootprint::from_record).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::types::signed_area;

    fn record(kind: DrillKind) -> DrillRecord {
        DrillRecord {
            tool: 1,
            diameter: 0.8,
            position: Point::new(5.0, 5.0),
            kind,
        }
    }

    #[test]
    fn ut_drl_001_plunge_is_32_gon() {
        let footprint = DrillFootprint::from_record(&record(DrillKind::Plunge));
        assert_eq!(footprint.polygon.len(), 32);
        assert!(footprint.route_end.is_none());
        assert!(signed_area(&footprint.polygon) > 0.0);
        let bounds = footprint.bounds();
        assert_relative_eq!(bounds.width(), 0.8, epsilon = 1e-9);
    }

    #[test]
    fn ut_drl_002_route_is_capsule() {
        let footprint = DrillFootprint::from_record(&record(DrillKind::Route {
            end: Point::new(5.4, 5.0),
        }));
        assert_eq!(footprint.route_end, Some(Point::new(5.4, 5.0)));
        assert_relative_eq!(footprint.bounds().width(), 1.2, epsilon = 1e-9);
        assert!(footprint.is_valid());
    }

    #[test]
    fn bc_drl_001_zero_diameter_is_invalid() {
        let mut zero = record(DrillKind::Plunge);
        zero.diameter = 0.0;
        assert!(!DrillFootprint::from_record(&zero).is_valid());
    }
}
