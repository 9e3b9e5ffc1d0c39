//! Container parsing and frame access
//!
//! [`NblReader`] parses the header and tables eagerly and leaves frame
//! chunks on disk; chunks are fetched and decompressed on demand.
//! [`FrameCursor`] layers stateful playback on top: random access to any
//! frame anchors at the nearest preceding keyframe and replays the delta
//! chain forward from there.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::codec::{decode_frame, parse_packet};
use crate::compression::decompress_chunk;
use crate::error::{NblError, Result};
use crate::types::{FrameData, NblHeader, TextureEntry};

/// A parsed NBL container over a seekable source
pub struct NblReader<R: Read + Seek> {
    inner: R,
    header: NblHeader,
    textures: Vec<TextureEntry>,
    frame_index: Vec<(u64, u32)>,
    keyframes: Vec<u32>,
    file_size: u64,
}

impl NblReader<BufReader<File>> {
    /// Opens and parses an NBL file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> NblReader<R> {
    /// Parses the header, texture table, frame index table, and keyframe
    /// table from an arbitrary seekable source
    pub fn new(mut inner: R) -> Result<Self> {
        let file_size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let header = NblHeader::read(&mut inner)?;

        let mut textures = Vec::with_capacity(header.texture_count as usize);
        for _ in 0..header.texture_count {
            textures.push(TextureEntry::read(&mut inner)?);
        }

        let mut frame_index = Vec::with_capacity(header.total_frames as usize);
        for _ in 0..header.total_frames {
            let offset = inner.read_u64::<LittleEndian>()?;
            let size = inner.read_u32::<LittleEndian>()?;
            frame_index.push((offset, size));
        }

        let keyframes = if header.version.has_keyframe_table() {
            let count = inner.read_u32::<LittleEndian>()?;
            let mut keyframes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                keyframes.push(inner.read_u32::<LittleEndian>()?);
            }
            keyframes
        } else if header.total_frames > 0 {
            // Legacy layout carries no keyframe table; frame 0 is always
            // an I-frame, so it serves as the sole anchor.
            vec![0]
        } else {
            Vec::new()
        };

        Ok(Self {
            inner,
            header,
            textures,
            frame_index,
            keyframes,
            file_size,
        })
    }

    /// The parsed file header
    pub fn header(&self) -> &NblHeader {
        &self.header
    }

    /// The texture table
    pub fn textures(&self) -> &[TextureEntry] {
        &self.textures
    }

    /// Per-frame chunk offsets and compressed sizes
    pub fn frame_index(&self) -> &[(u64, u32)] {
        &self.frame_index
    }

    /// Frame indices that are keyframes, ascending
    pub fn keyframes(&self) -> &[u32] {
        &self.keyframes
    }

    /// Number of frames in the container
    pub fn total_frames(&self) -> u32 {
        self.header.total_frames
    }

    /// The keyframe at or before `frame`, used as the replay anchor.
    /// Falls back to frame 0 when the table has no candidate.
    pub fn anchor_keyframe(&self, frame: u32) -> u32 {
        let idx = self.keyframes.partition_point(|&k| k <= frame);
        if idx == 0 { 0 } else { self.keyframes[idx - 1] }
    }

    /// Reads and decompresses one frame's chunk into its raw packet
    pub fn read_packet(&mut self, frame: u32) -> Result<Vec<u8>> {
        let &(offset, size) = self.frame_index.get(frame as usize).ok_or(
            NblError::FrameOutOfRange {
                frame,
                total: self.header.total_frames,
            },
        )?;

        let end = offset.checked_add(u64::from(size));
        if end.is_none_or(|end| end > self.file_size) {
            return Err(NblError::ChunkOutOfBounds {
                frame,
                offset,
                size,
                file_size: self.file_size,
            });
        }

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; size as usize];
        self.inner.read_exact(&mut compressed)?;
        Ok(decompress_chunk(&compressed)?)
    }

    /// Decodes one frame given the previous frame's decoded state.
    ///
    /// `prev` must be the decoded state of frame `frame - 1` when the
    /// chunk turns out to be a delta frame; pass anything (or `None`)
    /// when the frame is known to be a keyframe.
    pub fn decode(&mut self, frame: u32, prev: Option<&FrameData>) -> Result<FrameData> {
        let packet = self.read_packet(frame)?;
        let (frame_type, count, payload) = parse_packet(frame, &packet)?;
        decode_frame(frame_type, payload, count, prev)
    }

    /// Starts a playback cursor over this container
    pub fn cursor(&mut self) -> FrameCursor<'_, R> {
        FrameCursor {
            reader: self,
            position: None,
            current: FrameData::empty(),
        }
    }
}

/// Stateful playback over a container.
///
/// Stepping forward decodes one chunk per frame. Seeking anywhere else
/// anchors at the nearest preceding keyframe and replays forward, so the
/// delta chain invariant always holds.
pub struct FrameCursor<'a, R: Read + Seek> {
    reader: &'a mut NblReader<R>,
    position: Option<u32>,
    current: FrameData,
}

impl<R: Read + Seek> FrameCursor<'_, R> {
    /// The frame the cursor currently sits on, if any
    pub fn position(&self) -> Option<u32> {
        self.position
    }

    /// Decoded state of the current frame
    pub fn current(&self) -> &FrameData {
        &self.current
    }

    /// Moves to `frame` and returns its decoded state
    pub fn seek(&mut self, frame: u32) -> Result<&FrameData> {
        let total = self.reader.total_frames();
        if frame >= total {
            return Err(NblError::FrameOutOfRange { frame, total });
        }

        let anchor = self.reader.anchor_keyframe(frame);
        // Continue from the current position when it is already inside
        // the replay window, otherwise restart at the anchor.
        let start = match self.position {
            Some(pos) if pos <= frame && pos >= anchor => pos + 1,
            _ => {
                self.current = self.reader.decode(anchor, None)?;
                self.position = Some(anchor);
                anchor + 1
            }
        };

        for i in start..=frame {
            self.current = self.reader.decode(i, Some(&self.current))?;
            self.position = Some(i);
        }
        Ok(&self.current)
    }

    /// Advances to the next frame, or returns `None` at the end
    pub fn step(&mut self) -> Option<Result<&FrameData>> {
        let next = self.position.map_or(0, |p| p + 1);
        if next >= self.reader.total_frames() {
            return None;
        }
        Some(self.seek(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureEntry;
    use crate::writer::{NblWriter, WriterOptions};
    use std::io::Cursor;

    fn frame_at(t: u32) -> FrameData {
        let mut frame = FrameData::empty();
        for i in 0..16 {
            frame.push(
                [i as f32 + t as f32 * 0.005, t as f32 * 0.002, 1.0],
                [128, 128, 128, 255],
                100 + t as u16,
                0,
                (t % 16) as u8,
                i,
            );
        }
        frame
    }

    fn build_container(frames: u32, keyframe_interval: u32) -> Vec<u8> {
        let options = WriterOptions {
            keyframe_interval,
            ..WriterOptions::default()
        };
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = NblWriter::new(
                &mut buf,
                20,
                frames,
                &[TextureEntry::new("nebula:flame.png")],
                options,
            )
            .unwrap();
            for t in 0..frames {
                writer.write_frame(&frame_at(t)).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn parses_written_container() {
        let bytes = build_container(90, 30);
        let reader = NblReader::new(Cursor::new(bytes)).unwrap();

        assert_eq!(reader.total_frames(), 90);
        assert_eq!(reader.textures().len(), 1);
        assert_eq!(reader.textures()[0].path, "nebula:flame.png");
        assert_eq!(reader.keyframes(), &[0, 30, 60]);
        assert_eq!(reader.frame_index().len(), 90);
    }

    #[test]
    fn sequential_and_random_access_agree() {
        let bytes = build_container(75, 25);
        let mut reader = NblReader::new(Cursor::new(bytes)).unwrap();

        let sequential = {
            let mut cursor = reader.cursor();
            let mut frames = Vec::new();
            while let Some(frame) = cursor.step() {
                frames.push(frame.unwrap().clone());
            }
            frames
        };
        assert_eq!(sequential.len(), 75);

        // Jumping straight to a mid-chain frame must replay from the
        // keyframe at 50 and land on identical state.
        let mut cursor = reader.cursor();
        assert_eq!(cursor.seek(63).unwrap(), &sequential[63]);
        assert_eq!(cursor.seek(12).unwrap(), &sequential[12]);
        assert_eq!(cursor.seek(74).unwrap(), &sequential[74]);
    }

    #[test]
    fn anchor_selection() {
        let bytes = build_container(90, 30);
        let reader = NblReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.anchor_keyframe(0), 0);
        assert_eq!(reader.anchor_keyframe(29), 0);
        assert_eq!(reader.anchor_keyframe(30), 30);
        assert_eq!(reader.anchor_keyframe(89), 60);
    }

    #[test]
    fn seek_past_end_fails() {
        let bytes = build_container(10, 60);
        let mut reader = NblReader::new(Cursor::new(bytes)).unwrap();
        let mut cursor = reader.cursor();
        assert!(matches!(
            cursor.seek(10),
            Err(NblError::FrameOutOfRange { frame: 10, total: 10 })
        ));
    }

    #[test]
    fn truncated_session_reads_back() {
        // Plan 100 frames but only deliver 40; the patched header and
        // relocated keyframe table must parse cleanly.
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer =
                NblWriter::new(&mut buf, 20, 100, &[], WriterOptions::default()).unwrap();
            for t in 0..40 {
                writer.write_frame(&frame_at(t)).unwrap();
            }
            writer.finish().unwrap();
        }

        let mut reader = NblReader::new(Cursor::new(buf.into_inner())).unwrap();
        assert_eq!(reader.total_frames(), 40);
        assert_eq!(reader.keyframes(), &[0]);
        let mut cursor = reader.cursor();
        let last = cursor.seek(39).unwrap();
        assert_eq!(last.len(), 16);
    }

    #[test]
    fn empty_container_round_trip() {
        let mut buf = Cursor::new(Vec::new());
        {
            let writer = NblWriter::new(&mut buf, 20, 0, &[], WriterOptions::default()).unwrap();
            writer.finish().unwrap();
        }

        let mut reader = NblReader::new(Cursor::new(buf.into_inner())).unwrap();
        assert_eq!(reader.total_frames(), 0);
        assert!(reader.keyframes().is_empty());
        assert!(reader.cursor().step().is_none());
    }
}
