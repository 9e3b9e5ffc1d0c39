//! Core types for the NBL container format

use std::io::{Read, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{NblError, Result};

/// Magic bytes at the start of every NBL file
pub const MAGIC: [u8; 8] = *b"NEBULAFX";

/// Size of the fixed file header in bytes
pub const HEADER_SIZE: u64 = 48;

/// Byte offset of the bounding box fields within the header
pub const BBOX_OFFSET: u64 = 0x14;

/// Byte offset of the total frame count within the header
pub const TOTAL_FRAMES_OFFSET: u64 = 0x0C;

/// Size of one frame index table entry: uint64 offset + uint32 size
pub const FRAME_INDEX_ENTRY_SIZE: u64 = 12;

/// Size of the header prepended to every decompressed frame chunk:
/// uint8 frame type + int32 particle count
pub const CHUNK_HEADER_SIZE: usize = 5;

/// Bytes per particle in a decompressed I-frame payload
pub const IFRAME_BYTES_PER_PARTICLE: usize = 24;

/// Bytes per particle in a decompressed P-frame payload
pub const PFRAME_BYTES_PER_PARTICLE: usize = 18;

/// Sanity bound on the particle count declared by a single frame.
/// Counts above this are treated as a corruption signal, not a format limit.
pub const MAX_PARTICLE_COUNT: u32 = 0x0100_0000;

/// Scale applied to position deltas before quantization to i16
pub const POSITION_SCALE: f32 = 1000.0;

/// Default keyframe interval for write sessions
pub const DEFAULT_KEYFRAME_INTERVAL: u32 = 60;

/// Default zstd compression level for frame chunks
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Container format versions.
///
/// V0 and V1 are distinct schemas: V0 has no keyframe index table, V1
/// inserts one between the frame index table and the frame data, shifting
/// every stored chunk offset. See [`crate::migration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FormatVersion {
    /// Legacy layout without a keyframe index table
    V0,
    /// Current layout with a keyframe index table
    #[default]
    V1,
}

impl FormatVersion {
    /// Returns the on-disk version number
    pub fn version_number(self) -> u16 {
        match self {
            FormatVersion::V0 => 0,
            FormatVersion::V1 => 1,
        }
    }

    /// Detects the format version from the header's version field
    pub fn from_version_number(version: u16) -> Result<Self> {
        match version {
            0 => Ok(FormatVersion::V0),
            1 => Ok(FormatVersion::V1),
            other => Err(NblError::UnsupportedVersion(other)),
        }
    }

    /// Returns true if this layout carries a keyframe index table
    pub fn has_keyframe_table(self) -> bool {
        matches!(self, FormatVersion::V1)
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.version_number())
    }
}

bitflags! {
    /// Header bitmask describing which optional per-particle attributes
    /// carry meaningful data
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttributeFlags: u16 {
        /// Particle colors include a meaningful alpha channel
        const ALPHA = 0x0001;
        /// Per-particle sizes are meaningful
        const SIZE = 0x0002;
    }
}

impl Default for AttributeFlags {
    fn default() -> Self {
        AttributeFlags::ALPHA | AttributeFlags::SIZE
    }
}

/// Fixed 48-byte file header
#[derive(Debug, Clone, PartialEq)]
pub struct NblHeader {
    /// Container format version
    pub version: FormatVersion,
    /// Playback rate the animation was exported at
    pub target_fps: u16,
    /// Number of frames described by the frame index table
    pub total_frames: u32,
    /// Number of entries in the texture table
    pub texture_count: u16,
    /// Optional attribute bitmask
    pub attributes: AttributeFlags,
    /// Minimum corner of the animation's bounding box
    pub bbox_min: [f32; 3],
    /// Maximum corner of the animation's bounding box
    pub bbox_max: [f32; 3],
}

impl NblHeader {
    /// Reads and validates the fixed header
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(NblError::InvalidMagic {
                expected: String::from_utf8_lossy(&MAGIC).to_string(),
                found: String::from_utf8_lossy(&magic).to_string(),
            });
        }

        let version = FormatVersion::from_version_number(reader.read_u16::<LittleEndian>()?)?;
        let target_fps = reader.read_u16::<LittleEndian>()?;
        let total_frames = reader.read_u32::<LittleEndian>()?;
        let texture_count = reader.read_u16::<LittleEndian>()?;
        let attributes = AttributeFlags::from_bits_retain(reader.read_u16::<LittleEndian>()?);

        let mut bbox_min = [0.0f32; 3];
        reader.read_f32_into::<LittleEndian>(&mut bbox_min)?;
        let mut bbox_max = [0.0f32; 3];
        reader.read_f32_into::<LittleEndian>(&mut bbox_max)?;

        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved)?;

        Ok(Self {
            version,
            target_fps,
            total_frames,
            texture_count,
            attributes,
            bbox_min,
            bbox_max,
        })
    }

    /// Writes the fixed header
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version.version_number())?;
        writer.write_u16::<LittleEndian>(self.target_fps)?;
        writer.write_u32::<LittleEndian>(self.total_frames)?;
        writer.write_u16::<LittleEndian>(self.texture_count)?;
        writer.write_u16::<LittleEndian>(self.attributes.bits())?;
        for v in self.bbox_min {
            writer.write_f32::<LittleEndian>(v)?;
        }
        for v in self.bbox_max {
            writer.write_f32::<LittleEndian>(v)?;
        }
        writer.write_all(&[0u8; 4])?; // Reserved
        Ok(())
    }
}

/// One entry in the texture table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    /// Resource path of the texture
    pub path: String,
    /// Sprite sheet rows
    pub rows: u8,
    /// Sprite sheet columns
    pub cols: u8,
}

impl TextureEntry {
    /// Creates a texture entry with a 1x1 sprite layout
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rows: 1,
            cols: 1,
        }
    }

    /// Reads a texture table entry
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let path_len = reader.read_u16::<LittleEndian>()?;
        let mut path_bytes = vec![0u8; path_len as usize];
        reader.read_exact(&mut path_bytes)?;
        let path = String::from_utf8(path_bytes)
            .map_err(|_| NblError::ParseError("texture path is not valid UTF-8".to_string()))?;
        let rows = reader.read_u8()?;
        let cols = reader.read_u8()?;
        Ok(Self { path, rows, cols })
    }

    /// Writes a texture table entry
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let path_bytes = self.path.as_bytes();
        writer.write_u16::<LittleEndian>(path_bytes.len() as u16)?;
        writer.write_all(path_bytes)?;
        writer.write_u8(self.rows)?;
        writer.write_u8(self.cols)?;
        Ok(())
    }

    /// Size of this entry on disk
    pub fn wire_size(&self) -> u64 {
        2 + self.path.len() as u64 + 2
    }
}

/// One frame's particle records in struct-of-arrays layout.
///
/// All arrays have equal length; particle identity is `particle_ids[i]`.
/// Ids are not required to be sorted but must be unique within a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameData {
    /// World position per particle
    pub positions: Vec<[f32; 3]>,
    /// RGBA color per particle
    pub colors: Vec<[u8; 4]>,
    /// Quantized size per particle
    pub sizes: Vec<u16>,
    /// Texture table index per particle
    pub tex_ids: Vec<u8>,
    /// Sprite sheet sequence index per particle
    pub seq_indices: Vec<u8>,
    /// Stable particle id per particle
    pub particle_ids: Vec<i32>,
}

impl FrameData {
    /// Creates an empty frame
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a frame with capacity for `n` particles
    pub fn with_capacity(n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(n),
            colors: Vec::with_capacity(n),
            sizes: Vec::with_capacity(n),
            tex_ids: Vec::with_capacity(n),
            seq_indices: Vec::with_capacity(n),
            particle_ids: Vec::with_capacity(n),
        }
    }

    /// Number of particles in the frame
    pub fn len(&self) -> usize {
        self.particle_ids.len()
    }

    /// Returns true if the frame contains no particles
    pub fn is_empty(&self) -> bool {
        self.particle_ids.is_empty()
    }

    /// Appends one particle record
    pub fn push(
        &mut self,
        position: [f32; 3],
        color: [u8; 4],
        size: u16,
        tex_id: u8,
        seq_index: u8,
        particle_id: i32,
    ) {
        self.positions.push(position);
        self.colors.push(color);
        self.sizes.push(size);
        self.tex_ids.push(tex_id);
        self.seq_indices.push(seq_index);
        self.particle_ids.push(particle_id);
    }

    /// Checks that all arrays have equal length and ids are unique
    pub fn check_consistency(&self) -> Result<()> {
        let n = self.particle_ids.len();
        if self.positions.len() != n
            || self.colors.len() != n
            || self.sizes.len() != n
            || self.tex_ids.len() != n
            || self.seq_indices.len() != n
        {
            return Err(NblError::InconsistentFrame(format!(
                "array length mismatch: ids={}, pos={}, col={}, size={}, tex={}, seq={}",
                n,
                self.positions.len(),
                self.colors.len(),
                self.sizes.len(),
                self.tex_ids.len(),
                self.seq_indices.len(),
            )));
        }

        let mut seen = std::collections::HashSet::with_capacity(n);
        for &id in &self.particle_ids {
            if !seen.insert(id) {
                return Err(NblError::InconsistentFrame(format!(
                    "duplicate particle id {id}"
                )));
            }
        }
        Ok(())
    }
}
