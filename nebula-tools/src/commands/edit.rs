//! `edit` command: streaming re-encode with transforms
//!
//! Frames are decoded sequentially, transformed in memory, and pushed
//! through the standard write path, so the output gets fresh delta
//! encoding, a fresh keyframe table, and a recomputed bounding box.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use console::style;

use nebula_nbl::{FrameData, NblReader, NblWriter, WriterOptions};

use crate::utils::progress::create_progress_bar;

pub struct EditArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub fps: Option<u16>,
    pub trim: Option<String>,
    pub scale_size: Option<f32>,
    pub translate: Option<String>,
    pub scale: Option<f32>,
    pub keyframe_interval: Option<u32>,
}

pub fn execute(args: EditArgs) -> Result<()> {
    let mut reader = NblReader::open(&args.input)
        .with_context(|| format!("Failed to parse NBL file: {}", args.input.display()))?;

    let total = reader.total_frames();
    let (start, end) = match &args.trim {
        Some(range) => parse_trim(range, total)?,
        None => (0, total),
    };
    let fps = args.fps.unwrap_or(reader.header().target_fps);
    let translate = match &args.translate {
        Some(vector) => parse_translate(vector)?,
        None => [0.0; 3],
    };
    let scale = args.scale.unwrap_or(1.0);
    let size_scale = args.scale_size.unwrap_or(1.0);

    let mut options = WriterOptions::default();
    if let Some(interval) = args.keyframe_interval {
        if interval == 0 {
            bail!("Keyframe interval must be at least 1");
        }
        options.keyframe_interval = interval;
    }

    let textures = reader.textures().to_vec();
    let mut writer = NblWriter::create(&args.output, fps, end - start, &textures, options)
        .with_context(|| format!("Failed to create output file: {}", args.output.display()))?;

    let pb = create_progress_bar(u64::from(end - start), "Re-encoding frames");
    let mut cursor = reader.cursor();
    for t in start..end {
        let mut frame = cursor
            .seek(t)
            .with_context(|| format!("Failed to decode frame {t}"))?
            .clone();
        apply_transforms(&mut frame, scale, translate, size_scale);
        writer
            .write_frame(&frame)
            .with_context(|| format!("Failed to re-encode frame {t}"))?;
        pb.inc(1);
    }
    let written = writer.frames_written();
    writer.finish().context("Failed to finalize output file")?;
    pb.finish_and_clear();

    println!(
        "✓ Wrote {} ({} frames at {} fps)",
        style(args.output.display()).cyan(),
        style(written).green(),
        style(fps).green()
    );
    Ok(())
}

fn apply_transforms(frame: &mut FrameData, scale: f32, translate: [f32; 3], size_scale: f32) {
    for pos in &mut frame.positions {
        for axis in 0..3 {
            pos[axis] = pos[axis] * scale + translate[axis];
        }
    }
    if (size_scale - 1.0).abs() > f32::EPSILON {
        for size in &mut frame.sizes {
            *size = (f32::from(*size) * size_scale).round().clamp(0.0, 65535.0) as u16;
        }
    }
}

/// Parses "start:end" (end exclusive) against the container's frame count
fn parse_trim(range: &str, total: u32) -> Result<(u32, u32)> {
    let Some((start, end)) = range.split_once(':') else {
        bail!("Invalid trim range '{range}', expected START:END");
    };
    let start: u32 = start
        .parse()
        .with_context(|| format!("Invalid trim start '{start}'"))?;
    let end: u32 = end
        .parse()
        .with_context(|| format!("Invalid trim end '{end}'"))?;
    if start >= end || end > total {
        bail!("Trim range {start}:{end} out of bounds for {total} frames");
    }
    Ok((start, end))
}

fn parse_translate(vector: &str) -> Result<[f32; 3]> {
    let parts: Vec<&str> = vector.split(',').collect();
    if parts.len() != 3 {
        bail!("Invalid translation '{vector}', expected X,Y,Z");
    }
    let mut out = [0.0f32; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .with_context(|| format!("Invalid translation component '{part}'"))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_parsing() {
        assert_eq!(parse_trim("10:50", 100).unwrap(), (10, 50));
        assert!(parse_trim("50:10", 100).is_err());
        assert!(parse_trim("0:101", 100).is_err());
        assert!(parse_trim("nonsense", 100).is_err());
    }

    #[test]
    fn translate_parsing() {
        assert_eq!(parse_translate("1,-2.5,0").unwrap(), [1.0, -2.5, 0.0]);
        assert!(parse_translate("1,2").is_err());
        assert!(parse_translate("a,b,c").is_err());
    }

    #[test]
    fn size_scaling_saturates() {
        let mut frame = FrameData::empty();
        frame.push([0.0; 3], [255; 4], 60000, 0, 0, 0);
        apply_transforms(&mut frame, 1.0, [0.0; 3], 2.0);
        assert_eq!(frame.sizes[0], 65535);
    }
}
