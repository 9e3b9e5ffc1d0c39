//! Particle sources
//!
//! A [`ParticleSource`] turns per-frame scene state into the flat
//! [`FrameData`] arrays the container codec consumes. Mesh scattering
//! evaluates a precomputed surface distribution against the current vertex
//! buffer; native particle systems and point clouds pass caller-supplied
//! arrays through with defaults filled in.

use glam::Vec3;
use nebula_nbl::FrameData;

use crate::error::{Result, SamplerError};
use crate::sampler::SurfaceDistribution;

/// Per-frame input to a source
pub enum FrameInput<'a> {
    /// Current mesh vertex positions, for [`ParticleSource::MeshScatter`]
    Vertices(&'a [Vec3]),
    /// Caller-supplied particle arrays, for pass-through sources
    Particles(ParticleInput<'a>),
}

/// Caller-supplied per-frame particle arrays. Optional arrays must match
/// `positions` in length; absent ones fall back to source defaults.
#[derive(Default)]
pub struct ParticleInput<'a> {
    /// Particle positions
    pub positions: &'a [Vec3],
    /// Per-particle colors
    pub colors: Option<&'a [[u8; 4]]>,
    /// Per-particle sizes
    pub sizes: Option<&'a [u16]>,
    /// Per-particle texture ids
    pub tex_ids: Option<&'a [u8]>,
    /// Per-particle sprite sequence indices
    pub seq_indices: Option<&'a [u8]>,
    /// Stable particle ids; sequential when absent
    pub particle_ids: Option<&'a [i32]>,
}

/// A surface distribution plus its frozen attributes and emission defaults
#[derive(Debug, Clone)]
pub struct MeshScatterSource {
    /// The precomputed, attribute-baked distribution
    pub distribution: SurfaceDistribution,
    /// Size written for every scattered particle
    pub default_size: u16,
}

/// Defaults used by pass-through sources when the caller omits an array
#[derive(Debug, Clone)]
pub struct PassthroughSource {
    /// Size used when no size array is supplied
    pub default_size: u16,
    /// Color used when no color array is supplied
    pub default_color: [u8; 4],
    /// Texture id used when no texture id array is supplied
    pub default_tex_id: u8,
}

impl Default for PassthroughSource {
    fn default() -> Self {
        Self {
            default_size: 100,
            default_color: [255, 255, 255, 255],
            default_tex_id: 0,
        }
    }
}

/// A particle source of one of the supported kinds.
///
/// Sources are independent: a setup failure in one never has to abort a
/// session using others, so callers prepare each source separately and
/// drop the ones that fail.
pub enum ParticleSource {
    /// Particles scattered across a deforming mesh surface
    MeshScatter(MeshScatterSource),
    /// A native particle system streamed through as-is
    Native(PassthroughSource),
    /// A point cloud streamed through as-is
    PointCloud(PassthroughSource),
}

impl ParticleSource {
    /// Human-readable source kind
    pub fn kind(&self) -> &'static str {
        match self {
            ParticleSource::MeshScatter(_) => "mesh-scatter",
            ParticleSource::Native(_) => "native",
            ParticleSource::PointCloud(_) => "point-cloud",
        }
    }

    /// One-time setup check before the first frame
    pub fn prepare(&mut self) -> Result<()> {
        match self {
            ParticleSource::MeshScatter(source) => {
                if source.distribution.is_empty() {
                    return Err(SamplerError::TooSparse { raw: 0.0 });
                }
                log::debug!(
                    "prepared mesh-scatter source with {} particles",
                    source.distribution.len()
                );
            }
            ParticleSource::Native(_) | ParticleSource::PointCloud(_) => {}
        }
        Ok(())
    }

    /// Produces one frame's particle records from the per-frame input
    pub fn frame_data(&self, input: &FrameInput<'_>) -> Result<FrameData> {
        match (self, input) {
            (ParticleSource::MeshScatter(source), FrameInput::Vertices(vertices)) => {
                source.frame_data(vertices)
            }
            (
                ParticleSource::Native(source) | ParticleSource::PointCloud(source),
                FrameInput::Particles(particles),
            ) => source.frame_data(particles),
            _ => Err(SamplerError::InconsistentInput(format!(
                "{} source given the wrong input kind",
                self.kind()
            ))),
        }
    }
}

impl MeshScatterSource {
    fn frame_data(&self, vertices: &[Vec3]) -> Result<FrameData> {
        let positions = self.distribution.compute_positions(vertices)?;
        let n = positions.len();

        let mut frame = FrameData::with_capacity(n);
        for i in 0..n {
            frame.push(
                positions[i].to_array(),
                self.distribution.static_colors()[i],
                self.default_size,
                self.distribution.static_tex_ids()[i],
                0,
                self.distribution.particle_ids()[i],
            );
        }
        Ok(frame)
    }
}

impl PassthroughSource {
    fn frame_data(&self, input: &ParticleInput<'_>) -> Result<FrameData> {
        let n = input.positions.len();
        check_len("colors", input.colors.map(<[_]>::len), n)?;
        check_len("sizes", input.sizes.map(<[_]>::len), n)?;
        check_len("tex_ids", input.tex_ids.map(<[_]>::len), n)?;
        check_len("seq_indices", input.seq_indices.map(<[_]>::len), n)?;
        check_len("particle_ids", input.particle_ids.map(<[_]>::len), n)?;

        let mut frame = FrameData::with_capacity(n);
        for i in 0..n {
            frame.push(
                input.positions[i].to_array(),
                input.colors.map_or(self.default_color, |c| c[i]),
                input.sizes.map_or(self.default_size, |s| s[i]),
                input.tex_ids.map_or(self.default_tex_id, |t| t[i]),
                input.seq_indices.map_or(0, |s| s[i]),
                input.particle_ids.map_or(i as i32, |ids| ids[i]),
            );
        }
        Ok(frame)
    }
}

fn check_len(name: &str, len: Option<usize>, expected: usize) -> Result<()> {
    match len {
        Some(len) if len != expected => Err(SamplerError::InconsistentInput(format!(
            "{name} has {len} entries for {expected} positions"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshTopology;
    use pretty_assertions::assert_eq;

    fn scatter_source() -> ParticleSource {
        let topo = MeshTopology::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
            vec![0],
            None,
        )
        .unwrap();
        let distribution = SurfaceDistribution::precompute(&topo, 20.0, 11).unwrap();
        ParticleSource::MeshScatter(MeshScatterSource {
            distribution,
            default_size: 120,
        })
    }

    #[test]
    fn mesh_scatter_produces_stable_ids_across_frames() {
        let mut source = scatter_source();
        source.prepare().unwrap();

        let rest = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let moved = [Vec3::Z, Vec3::X + Vec3::Z, Vec3::Y + Vec3::Z];

        let a = source.frame_data(&FrameInput::Vertices(&rest)).unwrap();
        let b = source.frame_data(&FrameInput::Vertices(&moved)).unwrap();

        a.check_consistency().unwrap();
        assert_eq!(a.particle_ids, b.particle_ids);
        assert_eq!(a.len(), 100);
        assert!(a.sizes.iter().all(|&s| s == 120));
        // Same particle, one frame later, exactly one unit up.
        for (pa, pb) in a.positions.iter().zip(&b.positions) {
            assert!((pb[2] - pa[2] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn wrong_input_kind_is_rejected() {
        let source = scatter_source();
        let err = source
            .frame_data(&FrameInput::Particles(ParticleInput::default()))
            .unwrap_err();
        assert!(matches!(err, SamplerError::InconsistentInput(_)));
    }

    #[test]
    fn passthrough_fills_defaults() {
        let source = ParticleSource::Native(PassthroughSource::default());
        let positions = [Vec3::ZERO, Vec3::ONE];
        let frame = source
            .frame_data(&FrameInput::Particles(ParticleInput {
                positions: &positions,
                ..ParticleInput::default()
            }))
            .unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.particle_ids, vec![0, 1]);
        assert_eq!(frame.colors, vec![[255; 4]; 2]);
        assert_eq!(frame.sizes, vec![100, 100]);
    }

    #[test]
    fn passthrough_rejects_mismatched_arrays() {
        let source = ParticleSource::PointCloud(PassthroughSource::default());
        let positions = [Vec3::ZERO, Vec3::ONE];
        let sizes = [5u16];
        let err = source
            .frame_data(&FrameInput::Particles(ParticleInput {
                positions: &positions,
                sizes: Some(&sizes),
                ..ParticleInput::default()
            }))
            .unwrap_err();
        assert!(matches!(err, SamplerError::InconsistentInput(_)));
    }
}
