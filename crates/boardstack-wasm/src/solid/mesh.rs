//! Indexed triangle meshes.
//!
//! Positions are flat `[x0, y0, z0, x1, ...]` `f32` triples and indices are
//! `u32` triangles, the layout a WebGL host uploads directly.

use crate::error::GeometryError;
use crate::geometry::types::{signed_area, Ring};

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions, three floats per vertex.
    pub positions: Vec<f32>,
    /// Triangle indices, three per triangle.
    pub indices: Vec<u32>,
}

/// Axis-aligned 3-D bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Bounds3 {
    /// Extent along each axis.
    pub fn size(&self) -> [f32; 3] {
        let [ax, ay, az] = self.min;
        let [bx, by, bz] = self.max;
        [bx - ax, by - ay, bz - az]
    }
}

impl Mesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MeshError`] if the vertex count no longer
    /// fits a `u32` index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, x: f64, y: f64, z: f64) -> Result<u32, GeometryError> {
        let index = u32::try_from(self.vertex_count())
            .map_err(|_| GeometryError::MeshError("vertex index overflow".to_string()))?;
        self.positions.extend([x as f32, y as f32, z as f32]);
        Ok(index)
    }

    /// Append a triangle.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend([a, b, c]);
    }

    /// Append another mesh, rebasing its indices.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MeshError`] on index overflow.
    pub fn append(&mut self, other: &Self) -> Result<(), GeometryError> {
        let base = u32::try_from(self.vertex_count())
            .map_err(|_| GeometryError::MeshError("vertex index overflow".to_string()))?;
        self.positions.extend_from_slice(&other.positions);
        for index in &other.indices {
            let rebased = base
                .checked_add(*index)
                .ok_or_else(|| GeometryError::MeshError("vertex index overflow".to_string()))?;
            self.indices.push(rebased);
        }
        Ok(())
    }

    /// Bounds of every vertex; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Bounds3> {
        let mut vertices = self.positions.chunks_exact(3);
        let first = vertices.next()?;
        let mut bounds = Bounds3 {
            min: [0.0; 3],
            max: [0.0; 3],
        };
        for (axis, value) in first.iter().enumerate().take(3) {
            if let (Some(min), Some(max)) = (bounds.min.get_mut(axis), bounds.max.get_mut(axis)) {
                *min = *value;
                *max = *value;
            }
        }
        for vertex in vertices {
            for (axis, value) in vertex.iter().enumerate() {
                if let (Some(min), Some(max)) =
                    (bounds.min.get_mut(axis), bounds.max.get_mut(axis))
                {
                    *min = min.min(*value);
                    *max = max.max(*value);
                }
            }
        }
        Some(bounds)
    }

    /// Shift every vertex in the XY plane.
    pub fn translate_xy(&mut self, dx: f32, dy: f32) {
        for vertex in self.positions.chunks_exact_mut(3) {
            if let [x, y, _] = vertex {
                *x += dx;
                *y += dy;
            }
        }
    }

    /// Extrude one polygon (outer ring then holes) between `z_min` and
    /// `z_max`. Caps are ear-clipped; walls reuse the cap vertices so the
    /// result is closed.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::MeshError`] on index overflow or when the
    /// triangulation references a vertex outside the polygon.
    pub fn push_prism(&mut self, polygon: &[Ring], z_min: f64, z_max: f64) -> Result<(), GeometryError> {
        let flat: Vec<f64> = polygon.iter().flatten().flat_map(|[x, y]| [*x, *y]).collect();
        let vertex_total = flat.len() / 2;
        if vertex_total < 3 {
            return Ok(());
        }
        let mut hole_starts = Vec::with_capacity(polygon.len().saturating_sub(1));
        let mut offset = 0;
        for (index, ring) in polygon.iter().enumerate() {
            if index > 0 {
                hole_starts.push(offset);
            }
            offset += ring.len();
        }
        let triangles = earclip::earcut::earcut(&flat, &hole_starts, 2);

        let mut bottom = Vec::with_capacity(vertex_total);
        let mut top = Vec::with_capacity(vertex_total);
        for pair in flat.chunks_exact(2) {
            if let [x, y] = *pair {
                bottom.push(self.push_vertex(x, y, z_min)?);
                top.push(self.push_vertex(x, y, z_max)?);
            }
        }

        let lookup = |table: &[u32], i: usize| {
            table
                .get(i)
                .copied()
                .ok_or_else(|| GeometryError::MeshError(format!("triangle index {i} out of range")))
        };
        let point = |i: usize| -> [f64; 2] {
            let x = flat.get(2 * i).copied().unwrap_or_default();
            let y = flat.get(2 * i + 1).copied().unwrap_or_default();
            [x, y]
        };

        for triangle in triangles.chunks_exact(3) {
            let [a, b, c] = *triangle else { continue };
            let counter_clockwise = signed_area(&[point(a), point(b), point(c)]) > 0.0;
            let (a, b) = if counter_clockwise { (a, b) } else { (b, a) };
            self.push_triangle(lookup(&top, a)?, lookup(&top, b)?, lookup(&top, c)?);
            self.push_triangle(lookup(&bottom, b)?, lookup(&bottom, a)?, lookup(&bottom, c)?);
        }

        let mut start = 0;
        for ring in polygon {
            let len = ring.len();
            for i in 0..len {
                let current = start + i;
                let next = start + (i + 1) % len;
                let (b0, b1) = (lookup(&bottom, current)?, lookup(&bottom, next)?);
                let (t0, t1) = (lookup(&top, current)?, lookup(&top, next)?);
                self.push_triangle(b0, b1, t1);
                self.push_triangle(b0, t1, t0);
            }
            start += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;

    use super::*;

    fn square(x: f64, y: f64, size: f64, ccw: bool) -> Ring {
        let mut ring = vec![[x, y], [x + size, y], [x + size, y + size], [x, y + size]];
        if !ccw {
            ring.reverse();
        }
        ring
    }

    fn is_closed(mesh: &Mesh) -> bool {
        let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
        for triangle in mesh.indices.chunks_exact(3) {
            if let [a, b, c] = *triangle {
                for (from, to) in [(a, b), (b, c), (c, a)] {
                    *edges.entry((from, to)).or_default() += 1;
                    *edges.entry((to, from)).or_default() -= 1;
                }
            }
        }
        edges.values().all(|count| *count == 0)
    }

    #[test]
    fn ut_msh_001_box_prism_counts() {
        let mut mesh = Mesh::new();
        let result = mesh.push_prism(&[square(0.0, 0.0, 1.0, true)], 0.0, 1.6);
        assert!(result.is_ok());
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(is_closed(&mesh));
    }

    #[test]
    fn ut_msh_002_prism_with_hole_is_closed() {
        let mut mesh = Mesh::new();
        let polygon = vec![square(0.0, 0.0, 4.0, true), square(1.0, 1.0, 2.0, false)];
        let result = mesh.push_prism(&polygon, -0.5, 0.5);
        assert!(result.is_ok());
        assert_eq!(mesh.vertex_count(), 16);
        // 8 cap triangles per side plus 16 wall triangles.
        assert_eq!(mesh.triangle_count(), 32);
        assert!(is_closed(&mesh));
    }

    #[test]
    fn ut_msh_003_bounds_and_translate() {
        let mut mesh = Mesh::new();
        let result = mesh.push_prism(&[square(2.0, 3.0, 1.0, true)], 0.0, 1.0);
        assert!(result.is_ok());
        mesh.translate_xy(-2.0, -3.0);
        let bounds = mesh.bounds();
        assert!(bounds.is_some());
        if let Some(bounds) = bounds {
            assert_relative_eq!(bounds.min[0], 0.0);
            assert_relative_eq!(bounds.min[1], 0.0);
            assert_relative_eq!(bounds.max[2], 1.0);
        }
    }

    #[test]
    fn ut_msh_004_append_rebases_indices() {
        let mut first = Mesh::new();
        let mut second = Mesh::new();
        assert!(first.push_prism(&[square(0.0, 0.0, 1.0, true)], 0.0, 1.0).is_ok());
        assert!(second.push_prism(&[square(5.0, 0.0, 1.0, true)], 0.0, 1.0).is_ok());
        assert!(first.append(&second).is_ok());
        assert_eq!(first.vertex_count(), 16);
        assert!(first.indices.iter().all(|i| (*i as usize) < first.vertex_count()));
        assert!(is_closed(&first));
    }

    #[test]
    fn bc_msh_001_two_point_polygon_emits_nothing() {
        let mut mesh = Mesh::new();
        let result = mesh.push_prism(&[vec![[0.0, 0.0], [1.0, 0.0]]], 0.0, 1.0);
        assert!(result.is_ok());
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
    }
}
