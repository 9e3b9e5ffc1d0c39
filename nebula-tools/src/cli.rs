//! Root CLI structure for nebula-tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nebula-tools")]
#[command(about = "Command-line tools for NBL particle animation containers", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display information about an NBL file
    Info {
        /// Path to the NBL file
        file: PathBuf,
    },

    /// Validate an NBL file and list every defect found
    Validate {
        /// Path to the NBL file
        file: PathBuf,
    },

    /// Convert a legacy (v0) NBL file to the current format
    Convert {
        /// Path to the input NBL file
        input: PathBuf,

        /// Path to write the converted NBL file
        output: PathBuf,
    },

    /// Re-encode an NBL file with transforms applied
    Edit {
        /// Path to the input NBL file
        input: PathBuf,

        /// Path to write the edited NBL file
        output: PathBuf,

        /// Change the playback rate without resampling frames
        #[arg(long, value_name = "FPS")]
        fps: Option<u16>,

        /// Keep only frames start..end (end exclusive), e.g. "30:120"
        #[arg(long, value_name = "START:END")]
        trim: Option<String>,

        /// Multiply every particle size by this factor
        #[arg(long, value_name = "FACTOR")]
        scale_size: Option<f32>,

        /// Translate all positions, e.g. "0,1.5,0"
        #[arg(long, value_name = "X,Y,Z")]
        translate: Option<String>,

        /// Scale all positions around the origin
        #[arg(long, value_name = "FACTOR")]
        scale: Option<f32>,

        /// Re-encode with a different keyframe interval
        #[arg(long, value_name = "FRAMES")]
        keyframe_interval: Option<u32>,
    },
}
