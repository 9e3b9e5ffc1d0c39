//! Error handling for the sampling core

use thiserror::Error;

/// Errors that can occur while preparing or evaluating particle sources
#[derive(Debug, Error)]
pub enum SamplerError {
    /// The mesh has no usable surface to scatter particles on
    #[error("Mesh surface area is zero, nothing to sample")]
    ZeroArea,

    /// The surface is too small for the requested density to place even
    /// one particle
    #[error("Surface too sparse for density: expected particle count {raw} rounds to zero")]
    TooSparse {
        /// Expected particle count before flooring
        raw: f32,
    },

    /// The per-frame vertex buffer no longer matches the topology the
    /// distribution was built against
    #[error("Vertex index {vertex} out of range: buffer has {vertex_count} vertices")]
    TopologyMismatch {
        /// Offending vertex index
        vertex: u32,
        /// Length of the supplied vertex buffer
        vertex_count: usize,
    },

    /// Caller-supplied per-frame arrays disagree in length
    #[error("Inconsistent source input: {0}")]
    InconsistentInput(String),
}

/// Type alias for Results from sampling operations
pub type Result<T> = std::result::Result<T, SamplerError>;
