//! Structural validation for NBL files
//!
//! Unlike the parsing path, which fails on the first problem, validation
//! makes a full pass over the file and collects every issue it can find,
//! so one corrupt chunk does not hide the next. Only an unreadable
//! preamble stops the scan early.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::codec::{FrameType, parse_packet};
use crate::error::Result;
use crate::reader::NblReader;
use crate::types::AttributeFlags;

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The file violates the format and readers may fail or misbehave
    Error,
    /// Suspicious but readable
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One finding from a validation pass
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Byte offset the finding refers to, where one applies
    pub offset: Option<u64>,
    /// Severity of the finding
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "[{}] at 0x{offset:08X}: {}", self.severity, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Everything a validation pass found
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// All findings, in scan order
    pub issues: Vec<ValidationIssue>,
    /// Number of frames the scan covered
    pub frames_checked: u32,
}

impl ValidationReport {
    /// Returns true if no errors were found (warnings are allowed)
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Number of error-severity findings
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Number of warning-severity findings
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    fn error(&mut self, offset: Option<u64>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            offset,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, offset: Option<u64>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            offset,
            severity: Severity::Warning,
            message: message.into(),
        });
    }
}

/// Validates an NBL file on disk
pub fn validate_file(path: impl AsRef<Path>) -> Result<ValidationReport> {
    let file = File::open(path)?;
    validate(BufReader::new(file))
}

/// Validates an NBL container from any seekable source.
///
/// Returns `Err` only when the preamble (header and tables) cannot be
/// parsed at all; every per-frame problem lands in the report instead.
pub fn validate<R: Read + Seek>(source: R) -> Result<ValidationReport> {
    let mut reader = NblReader::new(source)?;
    let mut report = ValidationReport::default();

    validate_header(&reader, &mut report);
    validate_textures(&reader, &mut report);
    validate_keyframe_table(&reader, &mut report);
    validate_frames(&mut reader, &mut report);

    Ok(report)
}

fn validate_header<R: Read + Seek>(reader: &NblReader<R>, report: &mut ValidationReport) {
    let header = reader.header();

    if header.target_fps == 0 {
        report.warning(Some(0x0A), "target fps is zero");
    }

    let known = AttributeFlags::all().bits();
    let unknown = header.attributes.bits() & !known;
    if unknown != 0 {
        report.warning(
            Some(0x12),
            format!("unknown attribute bits set: 0x{unknown:04X}"),
        );
    }

    for axis in 0..3 {
        let (min, max) = (header.bbox_min[axis], header.bbox_max[axis]);
        if !min.is_finite() || !max.is_finite() {
            report.error(Some(0x14), "bounding box contains non-finite values");
            break;
        }
        if min > max {
            report.warning(
                Some(0x14),
                format!("bounding box min exceeds max on axis {axis}: {min} > {max}"),
            );
            break;
        }
    }
}

fn validate_textures<R: Read + Seek>(reader: &NblReader<R>, report: &mut ValidationReport) {
    for (i, entry) in reader.textures().iter().enumerate() {
        if entry.path.is_empty() {
            report.warning(None, format!("texture {i} has an empty path"));
        }
        if entry.rows == 0 || entry.cols == 0 {
            report.error(
                None,
                format!(
                    "texture {i} has a degenerate sprite layout {}x{}",
                    entry.rows, entry.cols
                ),
            );
        }
    }
}

fn validate_keyframe_table<R: Read + Seek>(reader: &NblReader<R>, report: &mut ValidationReport) {
    let total = reader.total_frames();
    let keyframes = reader.keyframes();

    if total > 0 && keyframes.first() != Some(&0) {
        report.error(None, "keyframe table does not start with frame 0");
    }
    for pair in keyframes.windows(2) {
        if pair[1] <= pair[0] {
            report.error(
                None,
                format!("keyframe table is not strictly ascending: {} then {}", pair[0], pair[1]),
            );
            break;
        }
    }
    for &kf in keyframes {
        if kf >= total {
            report.error(
                None,
                format!("keyframe index {kf} out of range (container has {total} frames)"),
            );
        }
    }
}

fn validate_frames<R: Read + Seek>(reader: &mut NblReader<R>, report: &mut ValidationReport) {
    let total = reader.total_frames();
    let keyframes: Vec<u32> = reader.keyframes().to_vec();

    for frame in 0..total {
        let (offset, _) = reader.frame_index()[frame as usize];

        let packet = match reader.read_packet(frame) {
            Ok(packet) => packet,
            Err(err) => {
                report.error(Some(offset), format!("frame {frame}: {err}"));
                continue;
            }
        };

        let (frame_type, _, _) = match parse_packet(frame, &packet) {
            Ok(parsed) => parsed,
            Err(err) => {
                report.error(Some(offset), err.to_string());
                continue;
            }
        };

        // The frame type on disk must agree with the keyframe table:
        // anchoring a replay on a delta frame decodes garbage.
        let listed = keyframes.binary_search(&frame).is_ok();
        match (frame_type, listed) {
            (FrameType::Delta, true) => {
                report.error(
                    Some(offset),
                    format!("frame {frame} is in the keyframe table but encoded as a delta frame"),
                );
            }
            (FrameType::Key, false) => {
                report.warning(
                    Some(offset),
                    format!("frame {frame} is a keyframe but missing from the keyframe table"),
                );
            }
            _ => {}
        }

        if frame == 0 && frame_type != FrameType::Key {
            report.error(Some(offset), "frame 0 is not a keyframe");
        }

        report.frames_checked += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameData, TextureEntry};
    use crate::writer::{NblWriter, WriterOptions};
    use std::io::Cursor;

    fn build_container() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = NblWriter::new(
                &mut buf,
                20,
                20,
                &[TextureEntry::new("nebula:smoke.png")],
                WriterOptions {
                    keyframe_interval: 10,
                    ..WriterOptions::default()
                },
            )
            .unwrap();
            for t in 0..20u32 {
                let mut frame = FrameData::empty();
                for i in 0..4 {
                    frame.push(
                        [i as f32, t as f32 * 0.01, 0.0],
                        [255, 255, 255, 255],
                        100,
                        0,
                        0,
                        i,
                    );
                }
                writer.write_frame(&frame).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn clean_file_validates() {
        let report = validate(Cursor::new(build_container())).unwrap();
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.frames_checked, 20);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn corrupt_chunk_is_reported_and_scan_continues() {
        let mut bytes = build_container();
        // Destroy the first chunk's zstd frame header. Flipping bytes in
        // the middle of the stream is not guaranteed to be detected
        // (chunks carry no content checksum), but a broken magic always
        // fails to decompress.
        let reader = NblReader::new(Cursor::new(bytes.clone())).unwrap();
        let (offset, _) = reader.frame_index()[0];
        drop(reader);
        bytes[offset as usize..offset as usize + 4].fill(0);

        let report = validate(Cursor::new(bytes)).unwrap();
        assert!(!report.is_valid());
        // The remaining 19 frames were still checked.
        assert_eq!(report.frames_checked, 19);
    }

    #[test]
    fn garbage_preamble_is_a_hard_error() {
        assert!(validate(Cursor::new(vec![0u8; 64])).is_err());
    }
}
