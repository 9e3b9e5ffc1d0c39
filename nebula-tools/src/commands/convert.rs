//! `convert` command: migrate legacy v0 containers to the current format

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use nebula_nbl::migrate_file;

use crate::utils::progress::create_spinner;

pub fn execute(input: PathBuf, output: PathBuf) -> Result<()> {
    let spinner = create_spinner("Scanning chunks and rewriting offsets");
    let summary = migrate_file(&input, &output)
        .with_context(|| format!("Failed to migrate NBL file: {}", input.display()))?;
    spinner.finish_and_clear();

    println!(
        "✓ Migrated {} to format v1: {} frames, {} keyframes indexed, offsets shifted by {} bytes",
        style(input.display()).cyan(),
        style(summary.total_frames).green(),
        style(summary.keyframes_found).green(),
        summary.offset_shift
    );
    Ok(())
}
