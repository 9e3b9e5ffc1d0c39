//! Legacy container migration
//!
//! Version 0 files carry no keyframe index table, so players can only
//! scrub by replaying from frame 0. Migration scans every chunk, records
//! which frames are keyframes, and rewrites the file with the table
//! inserted between the frame index table and the frame data. Inserting
//! the table shifts the data region, so every stored chunk offset is
//! rewritten by the table's size; the chunk bytes themselves are copied
//! untouched.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::codec::{FrameType, parse_packet};
use crate::compression::decompress_chunk;
use crate::error::{NblError, Result};
use crate::types::{FormatVersion, NblHeader, TextureEntry};

/// What a migration run did
#[derive(Debug, Clone, Copy)]
pub struct MigrationSummary {
    /// Frames in the container
    pub total_frames: u32,
    /// Keyframes found while scanning
    pub keyframes_found: u32,
    /// Bytes the data region moved by
    pub offset_shift: u64,
}

/// Migrates a version 0 file on disk, writing the upgraded container to
/// `dst`
pub fn migrate_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<MigrationSummary> {
    let input = BufReader::new(File::open(src)?);
    let mut output = BufWriter::new(File::create(dst)?);
    let summary = migrate_v0_to_v1(input, &mut output)?;
    output.flush()?;
    Ok(summary)
}

/// Migrates a version 0 container to version 1.
///
/// Fails with [`NblError::AlreadyCurrent`] when the input is already
/// version 1.
pub fn migrate_v0_to_v1<R, W>(mut input: R, output: &mut W) -> Result<MigrationSummary>
where
    R: Read + Seek,
    W: Write,
{
    let mut header = NblHeader::read(&mut input)?;
    if header.version.has_keyframe_table() {
        return Err(NblError::AlreadyCurrent(header.version.version_number()));
    }

    let mut textures = Vec::with_capacity(header.texture_count as usize);
    for _ in 0..header.texture_count {
        textures.push(TextureEntry::read(&mut input)?);
    }

    let mut frame_index = Vec::with_capacity(header.total_frames as usize);
    for _ in 0..header.total_frames {
        let offset = input.read_u64::<LittleEndian>()?;
        let size = input.read_u32::<LittleEndian>()?;
        frame_index.push((offset, size));
    }
    let data_start = input.stream_position()?;

    // First pass: decompress each chunk far enough to learn its frame
    // type. Frame payloads are validated along the way so a corrupt v0
    // file is rejected instead of silently migrated.
    let mut keyframes = Vec::new();
    for (frame, &(offset, size)) in frame_index.iter().enumerate() {
        let frame = frame as u32;
        input.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; size as usize];
        input.read_exact(&mut compressed)?;
        let packet = decompress_chunk(&compressed)?;
        let (frame_type, _, _) = parse_packet(frame, &packet)?;
        if frame_type == FrameType::Key {
            keyframes.push(frame);
        }
    }

    let shift = 4 + 4 * keyframes.len() as u64;

    header.version = FormatVersion::V1;
    header.write(output)?;
    for entry in &textures {
        entry.write(output)?;
    }
    for &(offset, size) in &frame_index {
        output.write_u64::<LittleEndian>(offset + shift)?;
        output.write_u32::<LittleEndian>(size)?;
    }
    output.write_u32::<LittleEndian>(keyframes.len() as u32)?;
    for &kf in &keyframes {
        output.write_u32::<LittleEndian>(kf)?;
    }

    // Second pass: the data region is copied verbatim. Chunk offsets were
    // all shifted by the same amount, so gaps and ordering are preserved.
    input.seek(SeekFrom::Start(data_start))?;
    io::copy(&mut input, output)?;

    Ok(MigrationSummary {
        total_frames: header.total_frames,
        keyframes_found: keyframes.len() as u32,
        offset_shift: shift,
    })
}
