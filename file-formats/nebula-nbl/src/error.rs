//! Error handling for NBL containers

use std::io;
use thiserror::Error;

/// Errors that can occur when working with NBL files
#[derive(Debug, Error)]
pub enum NblError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic value in the file header
    #[error("Invalid magic value: expected '{expected}', found '{found}'")]
    InvalidMagic {
        /// The expected magic value
        expected: String,
        /// The actual magic value found
        found: String,
    },

    /// Unsupported container format version
    #[error("Unsupported NBL format version: {0}")]
    UnsupportedVersion(u16),

    /// Unknown frame type byte in a decompressed chunk
    #[error("Unknown frame type {frame_type} in frame {frame}")]
    UnknownFrameType {
        /// Frame index within the container
        frame: u32,
        /// The frame type byte found
        frame_type: u8,
    },

    /// Decompressed chunk length does not match the declared particle count
    #[error(
        "Frame {frame} payload length mismatch: expected {expected} bytes for {count} particles, found {actual}"
    )]
    PayloadLength {
        /// Frame index within the container
        frame: u32,
        /// Declared particle count
        count: u32,
        /// Expected payload size in bytes
        expected: usize,
        /// Actual payload size in bytes
        actual: usize,
    },

    /// Particle count exceeds the sanity bound (treated as corruption)
    #[error("Frame {frame} declares {count} particles, above the sanity bound {max}")]
    ParticleCountOutOfRange {
        /// Frame index within the container
        frame: u32,
        /// Declared particle count
        count: u32,
        /// Maximum accepted particle count
        max: u32,
    },

    /// A frame index entry points outside the file
    #[error("Frame {frame} chunk out of bounds: offset {offset} + size {size} > file size {file_size}")]
    ChunkOutOfBounds {
        /// Frame index within the container
        frame: u32,
        /// Stored chunk offset
        offset: u64,
        /// Stored chunk size
        size: u32,
        /// Size of the file
        file_size: u64,
    },

    /// Frame data handed to the codec is internally inconsistent
    #[error("Inconsistent frame data: {0}")]
    InconsistentFrame(String),

    /// More frames written than the session was created for
    #[error("Write session was created for {planned} frames")]
    TooManyFrames {
        /// Frame count declared at session start
        planned: u32,
    },

    /// A frame index is outside the container
    #[error("Frame index {frame} out of range: container has {total} frames")]
    FrameOutOfRange {
        /// Requested frame index
        frame: u32,
        /// Total frames in the container
        total: u32,
    },

    /// Error when parsing NBL data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Input file is already in the current format version
    #[error("File is already format version {0}, nothing to migrate")]
    AlreadyCurrent(u16),
}

/// Type alias for Results from NBL operations
pub type Result<T> = std::result::Result<T, NblError>;
