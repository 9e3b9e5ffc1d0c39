//! # NBL Particle Animation Container
//!
//! This library reads and writes NBL files: a compact binary container for
//! baked particle swarm animations. An NBL file stores per-frame particle
//! state (position, color, size, texture, sprite sequence) as zstd
//! compressed chunks behind a seekable frame index, so players can scrub
//! to any frame without decoding the whole animation.
//!
//! ## Format at a glance
//!
//! - Fixed 48-byte little-endian header (`NEBULAFX` magic, fps, frame
//!   count, bounding box)
//! - Texture table mapping texture ids to resource paths and sprite
//!   sheet layouts
//! - Frame index table: absolute offset and compressed size per frame
//! - Keyframe index table (format version 1) listing random-access points
//! - One independently compressed chunk per frame, encoded either as a
//!   keyframe (absolute state) or a delta frame against its predecessor
//!
//! ## Quick Start
//!
//! ```no_run
//! use nebula_nbl::{NblReader, NblWriter, FrameData, TextureEntry, WriterOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Write a short animation
//! let textures = [TextureEntry::new("nebula:flame.png")];
//! let mut writer = NblWriter::create("burst.nbl", 20, 100, &textures, WriterOptions::default())?;
//! for _ in 0..100 {
//!     let mut frame = FrameData::empty();
//!     frame.push([0.0, 1.0, 0.0], [255, 128, 0, 255], 120, 0, 0, 1);
//!     writer.write_frame(&frame)?;
//! }
//! writer.finish()?;
//!
//! // Scrub to an arbitrary frame
//! let mut reader = NblReader::open("burst.nbl")?;
//! let mut cursor = reader.cursor();
//! let frame = cursor.seek(42)?;
//! println!("frame 42 has {} particles", frame.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Header, texture table, and frame data structures
//! - [`codec`]: Keyframe/delta frame payload encoding and decoding
//! - [`compression`]: Per-chunk zstd compression
//! - [`writer`]: Placeholder-then-patch write sessions
//! - [`reader`]: Container parsing and keyframe-anchored playback
//! - [`validation`]: Full-file structural validation
//! - [`migration`]: Version 0 to version 1 container upgrades
//! - [`error`]: Error types and handling

pub mod codec;
pub mod compression;
pub mod error;
pub mod migration;
pub mod reader;
pub mod types;
pub mod validation;
pub mod writer;

pub use codec::{EncodedFrame, FrameCodec, FrameType};
pub use error::{NblError, Result};
pub use migration::{MigrationSummary, migrate_file, migrate_v0_to_v1};
pub use reader::{FrameCursor, NblReader};
pub use types::{AttributeFlags, FormatVersion, FrameData, NblHeader, TextureEntry};
pub use validation::{Severity, ValidationIssue, ValidationReport, validate, validate_file};
pub use writer::{NblWriter, WriterOptions};
