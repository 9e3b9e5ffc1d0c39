//! # Nebula Surface Sampler
//!
//! Deterministic particle scattering over mesh surfaces, plus the attribute
//! baking and source plumbing that feeds baked frames into the
//! [`nebula-nbl`](nebula_nbl) container codec.
//!
//! The core idea: scatter once, evaluate cheaply. A
//! [`SurfaceDistribution`] pins each particle to a triangle with fixed
//! barycentric weights at setup time; every animation frame afterwards is a
//! pure recombination of those weights with the current vertex positions,
//! so particles ride a deforming surface with no per-frame resampling and
//! no particle id churn.
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec3;
//! use nebula_sampler::{MeshTopology, SurfaceDistribution};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let topology = MeshTopology::new(
//!     vec![Vec3::ZERO, Vec3::X, Vec3::Y],
//!     vec![[0, 1, 2]],
//!     vec![0],
//!     None,
//! )?;
//!
//! // Same topology, density, and seed always scatter identically.
//! let distribution = SurfaceDistribution::precompute(&topology, 20.0, 42)?;
//! let positions = distribution.compute_positions(&topology.positions)?;
//! assert_eq!(positions.len(), distribution.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mesh`]: Immutable mesh topology snapshots
//! - [`sampler`]: Barycentric surface distributions
//! - [`baker`]: One-time color and texture id baking
//! - [`source`]: Particle sources feeding the container codec
//! - [`error`]: Error types and handling

pub mod baker;
pub mod error;
pub mod mesh;
pub mod sampler;
pub mod source;

pub use baker::{ImageData, TextureSource, bake_colors, bake_tex_ids};
pub use error::{Result, SamplerError};
pub use mesh::MeshTopology;
pub use sampler::SurfaceDistribution;
pub use source::{
    FrameInput, MeshScatterSource, ParticleInput, ParticleSource, PassthroughSource,
};
