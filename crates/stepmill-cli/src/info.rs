//! The `info` subcommand: statistics for an existing STL file.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use stepmill_mesh::read_stl;

/// Read an STL file and print its statistics.
pub fn run_info(file: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let mesh = read_stl(file).with_context(|| format!("reading {}", file.display()))?;
    let report = mesh.report();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(
        out,
        "{}: {} triangles, {} vertices",
        file.display(),
        report.triangles,
        report.vertices
    )?;
    writeln!(out, "  Volume: {:.2} mm\u{b3}", report.volume)?;
    writeln!(out, "  Area: {:.2} mm\u{b2}", report.area)?;
    writeln!(
        out,
        "  Watertight: {}",
        if report.watertight { "Yes" } else { "No" }
    )?;
    if let Some([lo, hi]) = report.bounds {
        writeln!(
            out,
            "  Bounds: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            lo[0], lo[1], lo[2], hi[0], hi[1], hi[2]
        )?;
    }
    Ok(())
}
