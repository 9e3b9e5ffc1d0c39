//! Per-frame payload codec
//!
//! Frames are encoded either as I-frames (full absolute particle state) or
//! P-frames (per-channel deltas against the previous frame, aligned by
//! particle id). Both use a struct-of-arrays little-endian layout preceded
//! by a 5-byte chunk header (frame type + particle count).
//!
//! P-frame deltas are quantized into small integer types; when any delta of
//! any particle overflows its range, the whole attempt is abandoned and the
//! frame is encoded as an I-frame instead. Overflow is never an error.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{NblError, Result};
use crate::types::{
    CHUNK_HEADER_SIZE, FrameData, IFRAME_BYTES_PER_PARTICLE, MAX_PARTICLE_COUNT,
    PFRAME_BYTES_PER_PARTICLE, POSITION_SCALE,
};

/// Frame encoding discriminant stored as the first byte of every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Full absolute particle state; a valid random-access point
    Key = 0,
    /// Delta against the immediately preceding decoded frame
    Delta = 1,
}

impl FrameType {
    /// Detects the frame type from its wire byte
    pub fn from_byte(frame: u32, byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(FrameType::Key),
            1 => Ok(FrameType::Delta),
            other => Err(NblError::UnknownFrameType {
                frame,
                frame_type: other,
            }),
        }
    }

    /// Payload bytes per particle for this frame type
    pub fn bytes_per_particle(self) -> usize {
        match self {
            FrameType::Key => IFRAME_BYTES_PER_PARTICLE,
            FrameType::Delta => PFRAME_BYTES_PER_PARTICLE,
        }
    }
}

/// A fully encoded frame chunk, ready for compression
#[derive(Debug)]
pub struct EncodedFrame {
    /// How the payload is encoded
    pub frame_type: FrameType,
    /// Chunk header plus payload, uncompressed
    pub packet: Vec<u8>,
}

/// Stateful frame encoder for one write session.
///
/// Tracks the previous frame's absolute state for P-frame chaining. Frames
/// must be fed strictly in emission order.
#[derive(Debug)]
pub struct FrameCodec {
    keyframe_interval: u32,
    prev: Option<FrameData>,
}

impl FrameCodec {
    /// Creates a codec that re-synchronizes with an I-frame every
    /// `keyframe_interval` frames
    pub fn new(keyframe_interval: u32) -> Self {
        Self {
            keyframe_interval: keyframe_interval.max(1),
            prev: None,
        }
    }

    /// Encodes one frame, choosing I or P encoding.
    ///
    /// An I-frame is forced on frame 0, whenever the keyframe interval
    /// elapses, and whenever the previous frame is absent or empty. A
    /// P-frame attempt that overflows quantization falls back to an
    /// I-frame transparently.
    pub fn encode(&mut self, frame: &FrameData, frame_index: u32) -> Result<EncodedFrame> {
        frame.check_consistency()?;

        let force_iframe = frame_index == 0
            || frame_index % self.keyframe_interval == 0
            || self.prev.as_ref().is_none_or(FrameData::is_empty);

        let encoded = if force_iframe {
            None
        } else {
            // Unwrap-free: force_iframe covers the None case above.
            self.prev
                .as_ref()
                .and_then(|prev| try_encode_p_payload(frame, prev))
        };

        let result = match encoded {
            Some(payload) => EncodedFrame {
                frame_type: FrameType::Delta,
                packet: write_packet(FrameType::Delta, frame.len() as u32, &payload),
            },
            None => {
                let payload = encode_i_payload(frame);
                EncodedFrame {
                    frame_type: FrameType::Key,
                    packet: write_packet(FrameType::Key, frame.len() as u32, &payload),
                }
            }
        };

        self.prev = Some(frame.clone());
        Ok(result)
    }
}

/// Prepends the 5-byte chunk header to a payload
pub fn write_packet(frame_type: FrameType, count: u32, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
    packet.push(frame_type as u8);
    let _ = packet.write_u32::<LittleEndian>(count);
    packet.extend_from_slice(payload);
    packet
}

/// Splits a decompressed chunk into its header and payload, validating the
/// frame type, the particle count sanity bound, and the exact payload length.
pub fn parse_packet(frame: u32, packet: &[u8]) -> Result<(FrameType, u32, &[u8])> {
    if packet.len() < CHUNK_HEADER_SIZE {
        return Err(NblError::PayloadLength {
            frame,
            count: 0,
            expected: CHUNK_HEADER_SIZE,
            actual: packet.len(),
        });
    }

    let frame_type = FrameType::from_byte(frame, packet[0])?;
    let count = u32::from_le_bytes([packet[1], packet[2], packet[3], packet[4]]);
    if count > MAX_PARTICLE_COUNT {
        return Err(NblError::ParticleCountOutOfRange {
            frame,
            count,
            max: MAX_PARTICLE_COUNT,
        });
    }

    let payload = &packet[CHUNK_HEADER_SIZE..];
    let expected = count as usize * frame_type.bytes_per_particle();
    if payload.len() != expected {
        return Err(NblError::PayloadLength {
            frame,
            count,
            expected,
            actual: payload.len(),
        });
    }

    Ok((frame_type, count, payload))
}

/// Encodes a frame's absolute state in struct-of-arrays layout
pub fn encode_i_payload(frame: &FrameData) -> Vec<u8> {
    let n = frame.len();
    let mut buf = Vec::with_capacity(n * IFRAME_BYTES_PER_PARTICLE);

    for axis in 0..3 {
        for pos in &frame.positions {
            let _ = buf.write_f32::<LittleEndian>(pos[axis]);
        }
    }
    for channel in 0..4 {
        for col in &frame.colors {
            buf.push(col[channel]);
        }
    }
    for &size in &frame.sizes {
        let _ = buf.write_u16::<LittleEndian>(size);
    }
    buf.extend_from_slice(&frame.tex_ids);
    buf.extend_from_slice(&frame.seq_indices);
    for &id in &frame.particle_ids {
        let _ = buf.write_i32::<LittleEndian>(id);
    }

    buf
}

/// Attempts to encode `curr` as a delta against `prev`.
///
/// Ids present only in `prev` despawn implicitly; ids present only in
/// `curr` are spawns whose baseline is the zero state, so their delta
/// equals their absolute value. Returns `None` when any quantized delta
/// overflows its integer range.
pub fn try_encode_p_payload(curr: &FrameData, prev: &FrameData) -> Option<Vec<u8>> {
    let n = curr.len();
    let prev_index: HashMap<i32, usize> = prev
        .particle_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut d_pos = vec![[0i16; 3]; n];
    let mut d_col = vec![[0i8; 4]; n];
    let mut d_size = vec![0i16; n];
    let mut d_tex = vec![0i8; n];
    let mut d_seq = vec![0i8; n];

    for (i, &id) in curr.particle_ids.iter().enumerate() {
        let prev_i = prev_index.get(&id).copied();

        let prev_pos = prev_i.map_or([0.0f32; 3], |j| prev.positions[j]);
        for axis in 0..3 {
            let raw = ((curr.positions[i][axis] - prev_pos[axis]) * POSITION_SCALE).round();
            if !(f32::from(i16::MIN)..=f32::from(i16::MAX)).contains(&raw) {
                return None;
            }
            d_pos[i][axis] = raw as i16;
        }

        let prev_col = prev_i.map_or([0u8; 4], |j| prev.colors[j]);
        for channel in 0..4 {
            let raw = i16::from(curr.colors[i][channel]) - i16::from(prev_col[channel]);
            if !(-128..=127).contains(&raw) {
                return None;
            }
            d_col[i][channel] = raw as i8;
        }

        let prev_size = prev_i.map_or(0u16, |j| prev.sizes[j]);
        let raw = i32::from(curr.sizes[i]) - i32::from(prev_size);
        if !(i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&raw) {
            return None;
        }
        d_size[i] = raw as i16;

        let prev_tex = prev_i.map_or(0u8, |j| prev.tex_ids[j]);
        let raw = i16::from(curr.tex_ids[i]) - i16::from(prev_tex);
        if !(-128..=127).contains(&raw) {
            return None;
        }
        d_tex[i] = raw as i8;

        let prev_seq = prev_i.map_or(0u8, |j| prev.seq_indices[j]);
        let raw = i16::from(curr.seq_indices[i]) - i16::from(prev_seq);
        if !(-128..=127).contains(&raw) {
            return None;
        }
        d_seq[i] = raw as i8;
    }

    let mut buf = Vec::with_capacity(n * PFRAME_BYTES_PER_PARTICLE);
    for axis in 0..3 {
        for d in &d_pos {
            let _ = buf.write_i16::<LittleEndian>(d[axis]);
        }
    }
    for channel in 0..4 {
        for d in &d_col {
            buf.push(d[channel] as u8);
        }
    }
    for &d in &d_size {
        let _ = buf.write_i16::<LittleEndian>(d);
    }
    for &d in &d_tex {
        buf.push(d as u8);
    }
    for &d in &d_seq {
        buf.push(d as u8);
    }
    for &id in &curr.particle_ids {
        let _ = buf.write_i32::<LittleEndian>(id);
    }

    Some(buf)
}

/// Decodes a frame payload into absolute particle state.
///
/// For P-frames, `prev` must be the immediately preceding decoded frame;
/// decoding out of sequence is undefined. Callers replay from the nearest
/// keyframe to guarantee this.
pub fn decode_frame(
    frame_type: FrameType,
    payload: &[u8],
    count: u32,
    prev: Option<&FrameData>,
) -> Result<FrameData> {
    match frame_type {
        FrameType::Key => decode_i_payload(payload, count),
        FrameType::Delta => {
            static EMPTY: FrameData = FrameData {
                positions: Vec::new(),
                colors: Vec::new(),
                sizes: Vec::new(),
                tex_ids: Vec::new(),
                seq_indices: Vec::new(),
                particle_ids: Vec::new(),
            };
            decode_p_payload(payload, count, prev.unwrap_or(&EMPTY))
        }
    }
}

fn decode_i_payload(payload: &[u8], count: u32) -> Result<FrameData> {
    let n = count as usize;
    let mut r = Cursor::new(payload);

    let mut px = vec![0.0f32; n];
    r.read_f32_into::<LittleEndian>(&mut px)?;
    let mut py = vec![0.0f32; n];
    r.read_f32_into::<LittleEndian>(&mut py)?;
    let mut pz = vec![0.0f32; n];
    r.read_f32_into::<LittleEndian>(&mut pz)?;

    let mut col = [vec![0u8; n], vec![0u8; n], vec![0u8; n], vec![0u8; n]];
    for channel in &mut col {
        r.read_exact(channel)?;
    }

    let mut sizes = vec![0u16; n];
    r.read_u16_into::<LittleEndian>(&mut sizes)?;

    let mut tex_ids = vec![0u8; n];
    r.read_exact(&mut tex_ids)?;
    let mut seq_indices = vec![0u8; n];
    r.read_exact(&mut seq_indices)?;

    let mut particle_ids = vec![0i32; n];
    r.read_i32_into::<LittleEndian>(&mut particle_ids)?;

    Ok(FrameData {
        positions: (0..n).map(|i| [px[i], py[i], pz[i]]).collect(),
        colors: (0..n).map(|i| [col[0][i], col[1][i], col[2][i], col[3][i]]).collect(),
        sizes,
        tex_ids,
        seq_indices,
        particle_ids,
    })
}

fn decode_p_payload(payload: &[u8], count: u32, prev: &FrameData) -> Result<FrameData> {
    let n = count as usize;
    let mut r = Cursor::new(payload);

    let mut dx = vec![0i16; n];
    r.read_i16_into::<LittleEndian>(&mut dx)?;
    let mut dy = vec![0i16; n];
    r.read_i16_into::<LittleEndian>(&mut dy)?;
    let mut dz = vec![0i16; n];
    r.read_i16_into::<LittleEndian>(&mut dz)?;

    let mut d_col = [vec![0u8; n], vec![0u8; n], vec![0u8; n], vec![0u8; n]];
    for channel in &mut d_col {
        r.read_exact(channel)?;
    }

    let mut d_size = vec![0i16; n];
    r.read_i16_into::<LittleEndian>(&mut d_size)?;

    let mut d_tex = vec![0u8; n];
    r.read_exact(&mut d_tex)?;
    let mut d_seq = vec![0u8; n];
    r.read_exact(&mut d_seq)?;

    let mut particle_ids = vec![0i32; n];
    r.read_i32_into::<LittleEndian>(&mut particle_ids)?;

    let prev_index: HashMap<i32, usize> = prev
        .particle_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut curr = FrameData::with_capacity(n);
    for i in 0..n {
        let id = particle_ids[i];
        let prev_i = prev_index.get(&id).copied();

        let base_pos = prev_i.map_or([0.0f32; 3], |j| prev.positions[j]);
        let position = [
            base_pos[0] + f32::from(dx[i]) / POSITION_SCALE,
            base_pos[1] + f32::from(dy[i]) / POSITION_SCALE,
            base_pos[2] + f32::from(dz[i]) / POSITION_SCALE,
        ];

        let base_col = prev_i.map_or([0u8; 4], |j| prev.colors[j]);
        let mut color = [0u8; 4];
        for channel in 0..4 {
            color[channel] =
                base_col[channel].saturating_add_signed(d_col[channel][i] as i8);
        }

        let base_size = prev_i.map_or(0u16, |j| prev.sizes[j]);
        let size = (i32::from(base_size) + i32::from(d_size[i])).clamp(0, 0xFFFF) as u16;

        let base_tex = prev_i.map_or(0u8, |j| prev.tex_ids[j]);
        let tex_id = base_tex.wrapping_add(d_tex[i]);

        let base_seq = prev_i.map_or(0u8, |j| prev.seq_indices[j]);
        let seq_index = base_seq.wrapping_add(d_seq[i]);

        curr.push(position, color, size, tex_id, seq_index, id);
    }

    Ok(curr)
}
