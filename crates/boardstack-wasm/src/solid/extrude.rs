//! Layer extrusion and vertical placement.

use crate::config::{COPPER_THICKNESS, DRILL_MARGIN, SILK_CLEARANCE, SILK_THICKNESS};
use crate::error::GeometryError;
use crate::geometry::{DrillFootprint, LayerShape};
use crate::layer::LayerRole;

use super::mesh::Mesh;

/// Vertical extent `(z_min, z_max)` of a role on a board of thickness `t`.
pub fn placement(role: LayerRole, t: f64) -> (f64, f64) {
    match role {
        LayerRole::Outline => (0.0, t),
        LayerRole::BottomCopper => (-COPPER_THICKNESS, 0.0),
        LayerRole::TopCopper => (t, t + COPPER_THICKNESS),
        LayerRole::BottomSilk => (-SILK_THICKNESS - SILK_CLEARANCE, -SILK_CLEARANCE),
        LayerRole::TopSilk => (t + SILK_CLEARANCE, t + SILK_THICKNESS + SILK_CLEARANCE),
        LayerRole::Drill => (-DRILL_MARGIN, t + DRILL_MARGIN),
    }
}

/// A layer footprint extruded between two heights.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    /// Source layer.
    pub role: LayerRole,
    /// Planar cross-section, constant over the height.
    pub footprint: LayerShape,
    /// Bottom cap height.
    pub z_min: f64,
    /// Top cap height.
    pub z_max: f64,
}

impl Solid {
    /// Extrude `footprint` at the placement of `role`.
    pub fn extrude(role: LayerRole, footprint: LayerShape, thickness: f64) -> Self {
        let (z_min, z_max) = placement(role, thickness);
        Self {
            role,
            footprint,
            z_min,
            z_max,
        }
    }

    /// Height of the prism.
    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    /// Whether nothing is left of the cross-section.
    pub fn is_empty(&self) -> bool {
        self.footprint.is_empty()
    }

    /// Closed triangle mesh of the prism.
    ///
    /// # Errors
    ///
    /// Propagates [`GeometryError::MeshError`] from triangulation.
    pub fn to_mesh(&self) -> Result<Mesh, GeometryError> {
        let mut mesh = Mesh::new();
        for polygon in &self.footprint.polygons {
            mesh.push_prism(polygon, self.z_min, self.z_max)?;
        }
        Ok(mesh)
    }
}

/// A drill footprint extruded through the whole stack.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillSolid {
    /// Planar outline.
    pub footprint: DrillFootprint,
    /// Bottom height, below the lowest layer.
    pub z_min: f64,
    /// Top height, above the highest layer.
    pub z_max: f64,
}

impl DrillSolid {
    /// Extrude a footprint at the drill placement.
    pub fn extrude(footprint: DrillFootprint, thickness: f64) -> Self {
        let (z_min, z_max) = placement(LayerRole::Drill, thickness);
        Self {
            footprint,
            z_min,
            z_max,
        }
    }
}
