//! Main entry point for the nebula-tools CLI

mod cli;
mod commands;
mod utils;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set verbosity
    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    // Execute command
    match cli.command {
        Commands::Info { file } => commands::info::execute(file),
        Commands::Validate { file } => commands::validate::execute(file),
        Commands::Convert { input, output } => commands::convert::execute(input, output),
        Commands::Edit {
            input,
            output,
            fps,
            trim,
            scale_size,
            translate,
            scale,
            keyframe_interval,
        } => commands::edit::execute(commands::edit::EditArgs {
            input,
            output,
            fps,
            trim,
            scale_size,
            translate,
            scale,
            keyframe_interval,
        }),
    }
}
