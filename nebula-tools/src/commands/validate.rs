//! `validate` command: run the structural validator and list every defect

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;

use nebula_nbl::validate_file;

pub fn execute(path: PathBuf) -> Result<()> {
    let report = validate_file(&path)
        .with_context(|| format!("Failed to read NBL file: {}", path.display()))?;

    for issue in &report.issues {
        println!("{issue}");
    }

    if report.is_valid() {
        println!(
            "✓ NBL file '{}' is valid ({} frames checked, {} warnings)",
            style(path.display()).cyan(),
            style(report.frames_checked).green(),
            report.warning_count()
        );
        Ok(())
    } else {
        anyhow::bail!(
            "Validation failed: {} errors, {} warnings",
            report.error_count(),
            report.warning_count()
        );
    }
}
