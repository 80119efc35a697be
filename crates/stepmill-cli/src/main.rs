use std::io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stepmill_cli::cli::{Cli, Command};
use stepmill_cli::info::run_info;
use stepmill_cli::runner::{run_convert, ConvertConfig};
use stepmill_tessellate::TessellationParams;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Convert {
            input_dir,
            files,
            out,
            tolerance,
            angular_tolerance,
            json,
        } => {
            let cfg = ConvertConfig {
                input_dir,
                files,
                out_dir: out,
                params: TessellationParams {
                    tolerance,
                    angular_tolerance,
                },
                json,
            };
            // Per-file failures are part of the report; the run itself
            // succeeds whenever it completes.
            run_convert(&cfg, &mut stdout)?;
            Ok(())
        }
        Command::Info { file, json } => run_info(&file, json, &mut stdout),
    }
}
