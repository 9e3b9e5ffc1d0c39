//! Barycentric surface sampling
//!
//! A [`SurfaceDistribution`] is precomputed once per emitter: it scatters a
//! density-derived number of particles across the mesh surface, each pinned
//! to a triangle by fixed barycentric weights. Evaluating a frame is then a
//! pure recombination of the current vertex positions with those weights,
//! with no per-frame allocation-heavy setup. Particles ride the surface as
//! it deforms.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SamplerError};
use crate::mesh::MeshTopology;

/// Expected particle counts at or below this are a hard setup error
/// rather than a forced single particle.
const SPARSE_EPSILON: f32 = 0.001;

/// A frozen scatter of particles over a mesh surface.
///
/// Everything here is immutable after [`SurfaceDistribution::precompute`]
/// except the baked attribute tables, which are written exactly once by the
/// attribute baker. Particle ids are assigned at precompute time and never
/// change, so delta encoding downstream can track particles across frames.
#[derive(Debug, Clone)]
pub struct SurfaceDistribution {
    /// Chosen triangle per particle
    pub(crate) tri_indices: Vec<u32>,
    /// Triangle corner vertex indices per particle, copied from the
    /// topology so evaluation needs only a vertex buffer
    pub(crate) corners: Vec<[u32; 3]>,
    /// Barycentric weights per particle, summing to 1
    pub(crate) weights: Vec<[f32; 3]>,
    /// UV interpolated from the triangle corners at precompute time
    pub(crate) static_uvs: Vec<Vec2>,
    /// Material index copied from the chosen triangle
    pub(crate) material_indices: Vec<u32>,
    /// Baked RGBA color per particle; white until the baker runs
    pub(crate) static_colors: Vec<[u8; 4]>,
    /// Baked texture id per particle; 0 until the baker runs
    pub(crate) static_tex_ids: Vec<u8>,
    /// Stable particle ids, `0..n`
    pub(crate) particle_ids: Vec<i32>,
}

impl SurfaceDistribution {
    /// Scatters particles across the topology's surface.
    ///
    /// The particle count is `floor(total_area * density * 10)`. Surfaces
    /// whose expected count rounds to zero but exceeds a small epsilon get
    /// one particle; anything sparser fails with
    /// [`SamplerError::TooSparse`]. The same `(topology, density, seed)`
    /// triple always produces a bit-identical distribution.
    pub fn precompute(topology: &MeshTopology, density: f32, seed: u64) -> Result<Self> {
        let areas: Vec<f32> = (0..topology.triangle_count())
            .map(|t| topology.triangle_area(t))
            .collect();
        let total_area: f32 = areas.iter().sum();
        if total_area <= 0.0 {
            return Err(SamplerError::ZeroArea);
        }

        let raw = total_area * density * 10.0;
        let count = match raw.floor() as usize {
            0 if raw > SPARSE_EPSILON => 1,
            0 => return Err(SamplerError::TooSparse { raw }),
            n => n,
        };

        // Cumulative area table for area-weighted triangle selection.
        let mut cdf = Vec::with_capacity(areas.len());
        let mut acc = 0.0f32;
        for &area in &areas {
            acc += area;
            cdf.push(acc);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut tri_indices = Vec::with_capacity(count);
        let mut corners = Vec::with_capacity(count);
        let mut weights = Vec::with_capacity(count);
        let mut static_uvs = Vec::with_capacity(count);
        let mut material_indices = Vec::with_capacity(count);

        for _ in 0..count {
            let pick = rng.random::<f32>() * total_area;
            let tri = cdf.partition_point(|&c| c <= pick).min(areas.len() - 1);

            // Square-root transform for a uniform density over the
            // triangle's area.
            let r1: f32 = rng.random();
            let r2: f32 = rng.random();
            let s = r1.sqrt();
            let w = [1.0 - s, s * (1.0 - r2), s * r2];

            let uv = topology.uvs.as_ref().map_or(Vec2::ZERO, |uvs| {
                let c = uvs[tri];
                c[0] * w[0] + c[1] * w[1] + c[2] * w[2]
            });

            tri_indices.push(tri as u32);
            corners.push(topology.triangles[tri]);
            weights.push(w);
            static_uvs.push(uv);
            material_indices.push(topology.material_indices[tri]);
        }

        log::debug!(
            "scattered {count} particles over {} triangles (area {total_area:.4})",
            topology.triangle_count()
        );

        Ok(Self {
            tri_indices,
            corners,
            weights,
            static_uvs,
            material_indices,
            static_colors: vec![[255, 255, 255, 255]; count],
            static_tex_ids: vec![0; count],
            particle_ids: (0..count as i32).collect(),
        })
    }

    /// Number of particles in the distribution
    pub fn len(&self) -> usize {
        self.particle_ids.len()
    }

    /// Returns true if the distribution holds no particles
    pub fn is_empty(&self) -> bool {
        self.particle_ids.is_empty()
    }

    /// Stable particle ids
    pub fn particle_ids(&self) -> &[i32] {
        &self.particle_ids
    }

    /// Material index per particle
    pub fn material_indices(&self) -> &[u32] {
        &self.material_indices
    }

    /// Interpolated UV per particle
    pub fn static_uvs(&self) -> &[Vec2] {
        &self.static_uvs
    }

    /// Baked color per particle
    pub fn static_colors(&self) -> &[[u8; 4]] {
        &self.static_colors
    }

    /// Baked texture id per particle
    pub fn static_tex_ids(&self) -> &[u8] {
        &self.static_tex_ids
    }

    /// Recombines the stored barycentric weights with the current vertex
    /// buffer.
    ///
    /// Pure and O(particles). Fails with
    /// [`SamplerError::TopologyMismatch`] when the buffer is shorter than
    /// the topology the distribution was built against.
    pub fn compute_positions(&self, positions: &[Vec3]) -> Result<Vec<Vec3>> {
        let mut out = Vec::with_capacity(self.len());
        for (corner, w) in self.corners.iter().zip(&self.weights) {
            let mut p = Vec3::ZERO;
            for k in 0..3 {
                let idx = corner[k] as usize;
                let vertex = positions.get(idx).ok_or(SamplerError::TopologyMismatch {
                    vertex: corner[k],
                    vertex_count: positions.len(),
                })?;
                p += *vertex * w[k];
            }
            out.push(p);
        }
        Ok(out)
    }
}
