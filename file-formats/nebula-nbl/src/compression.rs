//! Frame chunk compression
//!
//! Every frame chunk is compressed with a clean zstd context, single-shot.
//! Frames must never depend on a cross-frame compression dictionary: the
//! reader has to be able to decompress any single frame without replaying
//! the ones before it.

use std::io;

use rayon::prelude::*;

use crate::error::Result;
use crate::types::DEFAULT_COMPRESSION_LEVEL;

/// Compresses one frame chunk with a fresh context
pub fn compress_chunk(raw: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::encode_all(raw, level)
}

/// Decompresses one frame chunk
pub fn decompress_chunk(compressed: &[u8]) -> io::Result<Vec<u8>> {
    zstd::decode_all(compressed)
}

/// Order-preserving parallel chunk compressor.
///
/// Raw packets are buffered up to a bounded window, compressed as a batch
/// on the rayon pool, and handed back strictly in submission order for the
/// single writer to append. The window caps the number of
/// uncompressed-but-not-yet-written frames held in memory when compression
/// lags behind sampling.
#[derive(Debug)]
pub struct ParallelCompressor {
    level: i32,
    window: usize,
    pending: Vec<Vec<u8>>,
}

impl ParallelCompressor {
    /// Creates a compressor with the given zstd level and in-flight window.
    /// A window of 0 or 1 compresses synchronously.
    pub fn new(level: i32, window: usize) -> Self {
        Self {
            level,
            window: window.max(1),
            pending: Vec::new(),
        }
    }

    /// Submits one raw packet. Returns the compressed chunks that became
    /// ready, in submission order; the result is empty while the window
    /// is still filling.
    pub fn push(&mut self, packet: Vec<u8>) -> Result<Vec<Vec<u8>>> {
        self.pending.push(packet);
        if self.pending.len() >= self.window {
            self.drain()
        } else {
            Ok(Vec::new())
        }
    }

    /// Compresses and returns everything still in flight
    pub fn finish(&mut self) -> Result<Vec<Vec<u8>>> {
        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<Vec<u8>>> {
        let batch = std::mem::take(&mut self.pending);
        if batch.len() <= 1 {
            // Not worth a pool round-trip for a single chunk.
            return batch
                .iter()
                .map(|raw| compress_chunk(raw, self.level).map_err(Into::into))
                .collect();
        }
        let compressed: io::Result<Vec<Vec<u8>>> = batch
            .par_iter()
            .map(|raw| compress_chunk(raw, self.level))
            .collect();
        Ok(compressed?)
    }
}

impl Default for ParallelCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trip() {
        let raw: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress_chunk(&raw, DEFAULT_COMPRESSION_LEVEL).unwrap();
        assert!(compressed.len() < raw.len());
        assert_eq!(decompress_chunk(&compressed).unwrap(), raw);
    }

    #[test]
    fn chunks_are_independently_decompressible() {
        let a = compress_chunk(b"first frame payload", 3).unwrap();
        let b = compress_chunk(b"second frame payload", 3).unwrap();
        // Decompressing the second chunk must not require the first.
        assert_eq!(decompress_chunk(&b).unwrap(), b"second frame payload");
        assert_eq!(decompress_chunk(&a).unwrap(), b"first frame payload");
    }

    #[test]
    fn parallel_compressor_preserves_order() {
        let mut compressor = ParallelCompressor::new(3, 4);
        let packets: Vec<Vec<u8>> = (0..10u8).map(|i| vec![i; 64 + i as usize]).collect();

        let mut out = Vec::new();
        for packet in &packets {
            out.extend(compressor.push(packet.clone()).unwrap());
        }
        out.extend(compressor.finish().unwrap());

        assert_eq!(out.len(), packets.len());
        for (compressed, raw) in out.iter().zip(&packets) {
            assert_eq!(&decompress_chunk(compressed).unwrap(), raw);
        }
    }

    #[test]
    fn corrupt_chunk_fails_to_decompress() {
        let mut compressed = compress_chunk(b"some payload bytes", 3).unwrap();
        for byte in compressed.iter_mut().skip(4) {
            *byte ^= 0xFF;
        }
        assert!(decompress_chunk(&compressed).is_err());
    }
}
