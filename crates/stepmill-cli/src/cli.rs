//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stepmill", version, about = "Batch STEP to STL converter with mesh statistics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert STEP files to STL and report per-file mesh statistics
    Convert {
        /// Directory containing the STEP files
        input_dir: PathBuf,

        /// Specific filenames to convert, in order. When omitted, every
        /// .step/.stp file in the directory is converted in sorted order.
        files: Vec<String>,

        /// Output directory for STL files (created if missing)
        #[arg(long, default_value = "stl")]
        out: PathBuf,

        /// Maximum chord deviation from the true surface, in model units
        #[arg(long, default_value_t = 0.001)]
        tolerance: f64,

        /// Maximum angular step along curved edges, in radians
        #[arg(long, default_value_t = 0.1)]
        angular_tolerance: f64,

        /// Print the final summary as JSON instead of the text block
        #[arg(long)]
        json: bool,
    },

    /// Report statistics for an existing STL file
    Info {
        /// The STL file to analyze
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}
