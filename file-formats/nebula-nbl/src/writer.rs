//! Container write session
//!
//! The writer follows a two-pass "placeholder then patch" discipline: the
//! header, frame index table, and keyframe table are written as zero-filled
//! placeholders up front (sized for the planned frame count), frame chunks
//! are appended as they are produced, and the tables are patched in place
//! when the session finishes.
//!
//! The header's total frame count starts at zero and is only patched to the
//! number of frames actually flushed, so an interrupted session never leaves
//! a file whose header claims more frames than its index table describes.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::codec::{FrameCodec, FrameType};
use crate::compression::ParallelCompressor;
use crate::error::{NblError, Result};
use crate::types::{
    AttributeFlags, BBOX_OFFSET, DEFAULT_COMPRESSION_LEVEL, DEFAULT_KEYFRAME_INTERVAL,
    FRAME_INDEX_ENTRY_SIZE, FormatVersion, FrameData, NblHeader, TOTAL_FRAMES_OFFSET,
    TextureEntry,
};

/// Tuning knobs for a write session
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Force an I-frame every this many frames
    pub keyframe_interval: u32,
    /// zstd level for frame chunks
    pub compression_level: i32,
    /// Bounded in-flight window for parallel chunk compression;
    /// 0 or 1 compresses synchronously
    pub compression_window: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            compression_window: 8,
        }
    }
}

/// A write session for one NBL container.
///
/// Frames are submitted in emission order via [`NblWriter::write_frame`];
/// the session must end with either [`NblWriter::finish`] (patches the
/// tables, possibly with a truncated frame count) or [`NblWriter::abort`]
/// (discards the file).
pub struct NblWriter<W: Write + Seek> {
    inner: W,
    path: Option<PathBuf>,
    planned_frames: u32,
    frames_encoded: u32,
    codec: FrameCodec,
    compressor: ParallelCompressor,
    index: Vec<(u64, u32)>,
    keyframes: Vec<u32>,
    bbox_min: [f32; 3],
    bbox_max: [f32; 3],
    any_particles: bool,
    index_table_pos: u64,
    keyframe_table_pos: u64,
    write_offset: u64,
}

impl NblWriter<BufWriter<File>> {
    /// Creates the file and writes the placeholder preamble
    pub fn create(
        path: impl AsRef<Path>,
        target_fps: u16,
        planned_frames: u32,
        textures: &[TextureEntry],
        options: WriterOptions,
    ) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        let mut writer = Self::new(
            BufWriter::new(file),
            target_fps,
            planned_frames,
            textures,
            options,
        )?;
        writer.path = Some(path.as_ref().to_path_buf());
        Ok(writer)
    }
}

impl<W: Write + Seek> NblWriter<W> {
    /// Starts a session on an arbitrary seekable sink
    pub fn new(
        mut inner: W,
        target_fps: u16,
        planned_frames: u32,
        textures: &[TextureEntry],
        options: WriterOptions,
    ) -> Result<Self> {
        let header = NblHeader {
            version: FormatVersion::V1,
            target_fps,
            // Patched to the flushed count on finish.
            total_frames: 0,
            texture_count: textures.len() as u16,
            attributes: AttributeFlags::default(),
            bbox_min: [0.0; 3],
            bbox_max: [0.0; 3],
        };
        header.write(&mut inner)?;

        for entry in textures {
            entry.write(&mut inner)?;
        }

        let index_table_pos = inner.stream_position()?;
        let index_table_size = u64::from(planned_frames) * FRAME_INDEX_ENTRY_SIZE;
        // Keyframe region is sized for the worst case where every frame
        // is a keyframe.
        let keyframe_table_pos = index_table_pos + index_table_size;
        let keyframe_table_size = 4 + u64::from(planned_frames) * 4;

        write_zeros(&mut inner, index_table_size + keyframe_table_size)?;
        let write_offset = inner.stream_position()?;

        Ok(Self {
            inner,
            path: None,
            planned_frames,
            frames_encoded: 0,
            codec: FrameCodec::new(options.keyframe_interval),
            compressor: ParallelCompressor::new(
                options.compression_level,
                options.compression_window,
            ),
            index: Vec::with_capacity(planned_frames as usize),
            keyframes: Vec::new(),
            bbox_min: [f32::INFINITY; 3],
            bbox_max: [f32::NEG_INFINITY; 3],
            any_particles: false,
            index_table_pos,
            keyframe_table_pos,
            write_offset,
        })
    }

    /// Number of frames submitted so far
    pub fn frames_written(&self) -> u32 {
        self.frames_encoded
    }

    /// Encodes, compresses, and appends one frame
    pub fn write_frame(&mut self, frame: &FrameData) -> Result<()> {
        if self.frames_encoded == self.planned_frames {
            return Err(NblError::TooManyFrames {
                planned: self.planned_frames,
            });
        }

        let frame_index = self.frames_encoded;
        let encoded = self.codec.encode(frame, frame_index)?;
        if encoded.frame_type == FrameType::Key {
            self.keyframes.push(frame_index);
        }

        // The running bbox folds the frame's absolute positions, never
        // quantized deltas.
        for pos in &frame.positions {
            for axis in 0..3 {
                self.bbox_min[axis] = self.bbox_min[axis].min(pos[axis]);
                self.bbox_max[axis] = self.bbox_max[axis].max(pos[axis]);
            }
        }
        self.any_particles |= !frame.is_empty();
        self.frames_encoded += 1;

        let ready = self.compressor.push(encoded.packet)?;
        self.append_chunks(ready)
    }

    fn append_chunks(&mut self, chunks: Vec<Vec<u8>>) -> Result<()> {
        for chunk in chunks {
            self.inner.write_all(&chunk)?;
            // Recorded only after the chunk is fully handed to the sink:
            // a failed write leaves no index entry.
            self.index.push((self.write_offset, chunk.len() as u32));
            self.write_offset += chunk.len() as u64;
        }
        Ok(())
    }

    /// Flushes pending chunks and patches the index tables, the keyframe
    /// table, the bounding box, and the final frame count.
    ///
    /// If fewer frames were written than planned (an aborted export), the
    /// header is patched to the written count and the keyframe table is
    /// placed directly after the shrunk index table; chunk offsets are
    /// absolute and stay valid.
    pub fn finish(mut self) -> Result<()> {
        let pending = self.compressor.finish()?;
        self.append_chunks(pending)?;
        self.inner.flush()?;

        let written = self.index.len() as u32;

        self.inner.seek(SeekFrom::Start(self.index_table_pos))?;
        for &(offset, size) in &self.index {
            self.inner.write_u64::<LittleEndian>(offset)?;
            self.inner.write_u32::<LittleEndian>(size)?;
        }

        let keyframe_pos = if written == self.planned_frames {
            self.keyframe_table_pos
        } else {
            self.index_table_pos + u64::from(written) * FRAME_INDEX_ENTRY_SIZE
        };
        self.inner.seek(SeekFrom::Start(keyframe_pos))?;
        self.inner
            .write_u32::<LittleEndian>(self.keyframes.len() as u32)?;
        for &kf in &self.keyframes {
            self.inner.write_u32::<LittleEndian>(kf)?;
        }

        self.inner.seek(SeekFrom::Start(TOTAL_FRAMES_OFFSET))?;
        self.inner.write_u32::<LittleEndian>(written)?;

        // Zeroed when the animation never contained a particle, to avoid
        // writing infinities.
        self.inner.seek(SeekFrom::Start(BBOX_OFFSET))?;
        let (bbox_min, bbox_max) = if self.any_particles {
            (self.bbox_min, self.bbox_max)
        } else {
            ([0.0; 3], [0.0; 3])
        };
        for v in bbox_min {
            self.inner.write_f32::<LittleEndian>(v)?;
        }
        for v in bbox_max {
            self.inner.write_f32::<LittleEndian>(v)?;
        }

        self.inner.flush()?;
        log::info!(
            "finished NBL session: {} frames, {} keyframes",
            written,
            self.keyframes.len()
        );
        Ok(())
    }

    /// Discards the session. For file-backed sessions the partial file is
    /// removed.
    pub fn abort(self) -> Result<()> {
        let path = self.path.clone();
        drop(self.inner);
        if let Some(path) = path {
            std::fs::remove_file(&path)?;
            log::info!("aborted NBL session, removed {}", path.display());
        }
        Ok(())
    }
}

fn write_zeros<W: Write>(writer: &mut W, mut remaining: u64) -> Result<()> {
    let zeros = [0u8; 8192];
    while remaining > 0 {
        let chunk = remaining.min(zeros.len() as u64) as usize;
        writer.write_all(&zeros[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}
