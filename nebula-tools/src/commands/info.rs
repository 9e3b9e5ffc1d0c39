//! `info` command: styled container summary

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use nebula_nbl::NblReader;

pub fn execute(path: PathBuf) -> Result<()> {
    let reader = NblReader::open(&path)
        .with_context(|| format!("Failed to parse NBL file: {}", path.display()))?;
    let header = reader.header();

    println!("\n{}", style("NBL File Information").bold().underlined());
    println!("File: {}", style(path.display()).cyan());
    println!("Format version: {}", style(header.version).yellow());
    println!("Target FPS: {}", style(header.target_fps).green());
    println!("Frames: {}", style(header.total_frames).green());
    println!(
        "Duration: {}",
        style(format_duration(header.total_frames, header.target_fps)).green()
    );
    println!("Keyframes: {}", style(reader.keyframes().len()).green());
    println!("Attributes: {:?}", style(header.attributes).yellow());
    println!(
        "Bounding box: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
        header.bbox_min[0],
        header.bbox_min[1],
        header.bbox_min[2],
        header.bbox_max[0],
        header.bbox_max[1],
        header.bbox_max[2],
    );

    if reader.textures().is_empty() {
        println!("Textures: {}", style("none").dim());
    } else {
        println!("\n{}", style("Textures").bold());
        for (i, entry) in reader.textures().iter().enumerate() {
            println!(
                "  [{i}] {} ({}x{} sprite sheet)",
                style(&entry.path).cyan(),
                entry.rows,
                entry.cols
            );
        }
    }

    let compressed_total: u64 = reader
        .frame_index()
        .iter()
        .map(|&(_, size)| u64::from(size))
        .sum();
    println!(
        "\nCompressed frame data: {}",
        style(format_size(compressed_total)).green()
    );

    Ok(())
}

fn format_duration(frames: u32, fps: u16) -> String {
    if fps == 0 {
        return "unknown (fps is 0)".to_string();
    }
    let seconds = f64::from(frames) / f64::from(fps);
    format!("{seconds:.2}s")
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
