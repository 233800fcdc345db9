//! Merge drilled solids into one board mesh.

use serde::Serialize;
use tracing::info;

use crate::error::{GeometryError, PipelineError};
use crate::layer::LayerRole;

use super::extrude::Solid;
use super::material::{Finish, FinishSet};
use super::mesh::{Bounds3, Mesh};

/// The index range of one source layer inside the merged mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRange {
    /// Source layer.
    pub role: LayerRole,
    /// First index in [`BoardMesh::mesh`]`.indices`.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
    /// Finish applied to the range.
    pub finish: Finish,
}

/// The merged board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardMesh {
    /// Object name.
    pub name: String,
    /// Geometry, origin at the XY minimum.
    pub mesh: Mesh,
    /// One range per source layer, in stack order.
    pub materials: Vec<MaterialRange>,
}

impl BoardMesh {
    /// Bounds of the merged geometry.
    pub fn bounds(&self) -> Option<Bounds3> {
        self.mesh.bounds()
    }
}

/// Concatenate `solids` in stack order and move the XY minimum to the origin.
///
/// # Errors
///
/// Returns [`PipelineError::NothingToMerge`] when no solid has geometry, and
/// propagates mesh index overflow.
pub fn merge(solids: &[Solid], finishes: &FinishSet, name: &str) -> Result<BoardMesh, PipelineError> {
    let mut ordered: Vec<&Solid> = solids.iter().filter(|solid| !solid.is_empty()).collect();
    ordered.sort_by_key(|solid| {
        LayerRole::STACK
            .iter()
            .position(|role| *role == solid.role)
            .unwrap_or(usize::MAX)
    });

    let mut mesh = Mesh::new();
    let mut materials = Vec::with_capacity(ordered.len());
    for solid in ordered {
        let Some(finish) = finishes.for_role(solid.role) else {
            continue;
        };
        let part = solid.to_mesh()?;
        if part.is_empty() {
            continue;
        }
        let start = index_len(&mesh)?;
        mesh.append(&part)?;
        let count = index_len(&mesh)? - start;
        materials.push(MaterialRange {
            role: solid.role,
            start,
            count,
            finish,
        });
    }

    let Some(bounds) = mesh.bounds() else {
        return Err(PipelineError::NothingToMerge(
            "every layer is empty after drilling".to_string(),
        ));
    };
    let [min_x, min_y, _] = bounds.min;
    mesh.translate_xy(-min_x, -min_y);

    info!(
        name,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        layers = materials.len(),
        "merged board mesh"
    );

    Ok(BoardMesh {
        name: name.to_string(),
        mesh,
        materials,
    })
}

fn index_len(mesh: &Mesh) -> Result<u32, PipelineError> {
    u32::try_from(mesh.indices.len())
        .map_err(|_| GeometryError::MeshError("index count overflow".to_string()).into())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::LayerShape;
    use crate::solid::material::{default_finish, FinishKind};

    fn finishes() -> FinishSet {
        FinishSet {
            board: default_finish(FinishKind::Board),
            copper: default_finish(FinishKind::Copper),
            silk: default_finish(FinishKind::Silk),
        }
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> LayerShape {
        LayerShape::from_polygons(vec![vec![vec![
            [x, y],
            [x + w, y],
            [x + w, y + h],
            [x, y + h],
        ]]])
    }

    #[test]
    fn ut_mrg_001_origin_moves_to_xy_minimum() {
        let solids = vec![
            Solid::extrude(LayerRole::TopCopper, rect(12.0, 7.0, 1.0, 1.0), 1.6),
            Solid::extrude(LayerRole::Outline, rect(10.0, 5.0, 20.0, 8.0), 1.6),
        ];
        let board = merge(&solids, &finishes(), "PCB");
        assert!(board.is_ok());
        if let Ok(board) = board {
            assert_eq!(board.name, "PCB");
            let bounds = board.bounds();
            assert!(bounds.is_some());
            if let Some(bounds) = bounds {
                assert_relative_eq!(bounds.min[0], 0.0);
                assert_relative_eq!(bounds.min[1], 0.0);
                assert_relative_eq!(bounds.size()[0], 20.0, epsilon = 1e-5);
                assert_relative_eq!(bounds.min[2], 0.0);
                assert_relative_eq!(bounds.max[2], 1.635, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn ut_mrg_002_ranges_follow_stack_order_and_cover_indices() {
        let solids = vec![
            Solid::extrude(LayerRole::TopSilk, rect(1.0, 1.0, 1.0, 1.0), 1.6),
            Solid::extrude(LayerRole::Outline, rect(0.0, 0.0, 5.0, 5.0), 1.6),
        ];
        let board = merge(&solids, &finishes(), "Board");
        assert!(board.is_ok());
        if let Ok(board) = board {
            let roles: Vec<LayerRole> = board.materials.iter().map(|m| m.role).collect();
            assert_eq!(roles, vec![LayerRole::Outline, LayerRole::TopSilk]);
            let covered: u32 = board.materials.iter().map(|m| m.count).sum();
            assert_eq!(covered as usize, board.mesh.indices.len());
            assert_eq!(board.materials.first().map(|m| m.start), Some(0));
        }
    }

    #[test]
    fn bc_mrg_001_no_solids_is_nothing_to_merge() {
        let result = merge(&[], &finishes(), "PCB");
        assert!(matches!(result, Err(PipelineError::NothingToMerge(_))));
    }

    #[test]
    fn bc_mrg_002_empty_solids_are_skipped() {
        let solids = vec![Solid::extrude(LayerRole::Outline, LayerShape::default(), 1.6)];
        let result = merge(&solids, &finishes(), "PCB");
        assert!(matches!(result, Err(PipelineError::NothingToMerge(_))));
    }
}
