//! Mesh topology snapshot
//!
//! A [`MeshTopology`] freezes everything about a mesh that must not change
//! while a distribution built on it is alive: the triangle list, per-triangle
//! materials, and per-corner UVs. Vertex positions are the one thing allowed
//! to move between frames; they are passed separately on every evaluation.

use glam::{Vec2, Vec3};

use crate::error::{Result, SamplerError};

/// Immutable triangle topology captured at sampler setup time
#[derive(Debug, Clone)]
pub struct MeshTopology {
    /// Vertex positions at capture time, used for area weighting
    pub positions: Vec<Vec3>,
    /// Triangle corner indices into `positions`
    pub triangles: Vec<[u32; 3]>,
    /// Material index per triangle
    pub material_indices: Vec<u32>,
    /// Per-corner UVs per triangle; `None` yields zeroed particle UVs
    pub uvs: Option<Vec<[Vec2; 3]>>,
}

impl MeshTopology {
    /// Builds a topology snapshot, checking that every triangle corner
    /// refers to a real vertex and that per-triangle tables line up.
    pub fn new(
        positions: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
        material_indices: Vec<u32>,
        uvs: Option<Vec<[Vec2; 3]>>,
    ) -> Result<Self> {
        for tri in &triangles {
            for &corner in tri {
                if corner as usize >= positions.len() {
                    return Err(SamplerError::TopologyMismatch {
                        vertex: corner,
                        vertex_count: positions.len(),
                    });
                }
            }
        }
        if material_indices.len() != triangles.len() {
            return Err(SamplerError::InconsistentInput(format!(
                "{} material indices for {} triangles",
                material_indices.len(),
                triangles.len()
            )));
        }
        if let Some(uvs) = &uvs {
            if uvs.len() != triangles.len() {
                return Err(SamplerError::InconsistentInput(format!(
                    "{} UV triples for {} triangles",
                    uvs.len(),
                    triangles.len()
                )));
            }
        }

        Ok(Self {
            positions,
            triangles,
            material_indices,
            uvs,
        })
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Area of one triangle, from the capture-time positions
    pub fn triangle_area(&self, tri: usize) -> f32 {
        let [a, b, c] = self.triangles[tri];
        let (a, b, c) = (
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        );
        (b - a).cross(c - a).length() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_corner() {
        let err = MeshTopology::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 3]],
            vec![0],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SamplerError::TopologyMismatch { vertex: 3, vertex_count: 3 }
        ));
    }

    #[test]
    fn unit_right_triangle_area() {
        let topo = MeshTopology::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
            vec![0],
            None,
        )
        .unwrap();
        assert!((topo.triangle_area(0) - 0.5).abs() < 1e-6);
    }
}
