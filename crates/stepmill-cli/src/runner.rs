//! The batch conversion driver.
//!
//! A strictly sequential loop with a per-file failure boundary: every input
//! produces exactly one [`FileOutcome`], in input order, and no per-file
//! error stops the run. Console output goes through the writer the caller
//! provides so the driver stays testable.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use stepmill_mesh::{read_stl, write_stl, MeshReport};
use stepmill_step::read_step;
use stepmill_tessellate::{tessellate_solids, TessellationParams};

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory holding the input STEP files.
    pub input_dir: PathBuf,
    /// Ordered input filenames; empty means scan `input_dir`.
    pub files: Vec<String>,
    /// Output directory, created if missing.
    pub out_dir: PathBuf,
    /// Tessellation quality.
    pub params: TessellationParams,
    /// Emit the summary as JSON instead of the text block.
    pub json: bool,
}

/// Final status of one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Status {
    /// Converted and analyzed successfully.
    Converted(MeshReport),
    /// The input file does not exist.
    NotFound,
    /// Import, tessellation, or export failed.
    Failed(String),
}

/// One entry of the result list.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Input filename as given.
    pub file: String,
    /// Final status, flattened so each outcome serializes as
    /// `{"file": ..., "status": ..., "detail": ...}`.
    #[serde(flatten)]
    pub status: Status,
}

#[derive(Serialize)]
struct Summary<'a> {
    total: usize,
    successful: usize,
    failed: usize,
    outcomes: &'a [FileOutcome],
}

/// Run the batch conversion. Returns one outcome per input file, in order.
///
/// Per-file failures are recorded, never propagated; only setup problems
/// (unreadable input directory, uncreatable output directory) and writer
/// errors surface as `Err`.
pub fn run_convert(cfg: &ConvertConfig, out: &mut dyn Write) -> Result<Vec<FileOutcome>> {
    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating output directory {}", cfg.out_dir.display()))?;
    let files = if cfg.files.is_empty() {
        scan_step_files(&cfg.input_dir)?
    } else {
        cfg.files.clone()
    };

    writeln!(out, "Starting conversion of {} files...\n", files.len())?;

    let names = output_names(&files);
    let mut outcomes = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let input_path = cfg.input_dir.join(file);
        let output_name = &names[i];
        let output_path = cfg.out_dir.join(output_name);

        writeln!(out, "[{}/{}] Processing: {}", i + 1, files.len(), file)?;

        let status = if !input_path.exists() {
            writeln!(out, "  \u{2717} File not found: {}\n", input_path.display())?;
            Status::NotFound
        } else {
            match convert_one(&input_path, &output_path, &cfg.params) {
                Ok(report) => {
                    writeln!(out, "  \u{2713} Conversion successful")?;
                    writeln!(out, "    Volume: {:.2} mm\u{b3}", report.volume)?;
                    writeln!(out, "    Area: {:.2} mm\u{b2}", report.area)?;
                    writeln!(out, "    Faces: {}", group_thousands(report.triangles))?;
                    writeln!(
                        out,
                        "    Watertight: {}",
                        if report.watertight { "Yes" } else { "No" }
                    )?;
                    writeln!(out, "    Saved: {output_name}\n")?;
                    Status::Converted(report)
                }
                Err(err) => {
                    writeln!(out, "  \u{2717} Error: {err:#}\n")?;
                    Status::Failed(format!("{err:#}"))
                }
            }
        };
        outcomes.push(FileOutcome {
            file: file.clone(),
            status,
        });
    }

    print_summary(cfg, &outcomes, &names, out)?;
    Ok(outcomes)
}

/// Import, tessellate, export, and re-read one file.
///
/// The report comes from reloading the written STL, so it describes what
/// actually landed on disk.
fn convert_one(input: &Path, output: &Path, params: &TessellationParams) -> Result<MeshReport> {
    let started = Instant::now();
    let solids = read_step(input)?;
    debug!(solids = solids.len(), input = %input.display(), "imported");
    let mesh = tessellate_solids(&solids, params)?;
    write_stl(output, &mesh)?;
    let report = read_stl(output)?.report();
    info!(
        input = %input.display(),
        triangles = report.triangles,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "converted"
    );
    Ok(report)
}

fn print_summary(
    cfg: &ConvertConfig,
    outcomes: &[FileOutcome],
    names: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let successful = outcomes
        .iter()
        .filter(|o| matches!(o.status, Status::Converted(_)))
        .count();
    if cfg.json {
        let summary = Summary {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
            outcomes,
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "CONVERSION SUMMARY")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "\nTotal files: {}", outcomes.len())?;
    writeln!(out, "Successful: {successful}")?;
    writeln!(out, "Failed: {}", outcomes.len() - successful)?;
    writeln!(out, "\nSTL files saved in: {}", cfg.out_dir.display())?;
    writeln!(out, "\nConverted files:")?;
    for (o, name) in outcomes.iter().zip(names) {
        match &o.status {
            Status::Converted(_) => writeln!(out, "  \u{2713} {name}")?,
            Status::NotFound => writeln!(out, "  \u{2717} {} - Not found", o.file)?,
            Status::Failed(message) => writeln!(out, "  \u{2717} {} - Error: {message}", o.file)?,
        }
    }
    Ok(())
}

/// All `.step`/`.stp` filenames in `dir`, sorted.
fn scan_step_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading input directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_step = Path::new(&name)
            .extension()
            .map(|e| e.eq_ignore_ascii_case("step") || e.eq_ignore_ascii_case("stp"))
            .unwrap_or(false);
        if is_step && entry.file_type()?.is_file() {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Output filename: the input name with its extension replaced by `.stl`.
fn stl_name(file: &str) -> String {
    Path::new(file)
        .with_extension("stl")
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{file}.stl"))
}

/// One output filename per input, in order. Inputs whose stems collide
/// (`a.step` and `a.stp` both map to `a.stl`) get a numbered suffix so a
/// later conversion cannot overwrite an earlier one.
fn output_names(files: &[String]) -> Vec<String> {
    let mut used = HashSet::new();
    files
        .iter()
        .map(|file| {
            let base = stl_name(file);
            if used.insert(base.clone()) {
                return base;
            }
            let stem = base.strip_suffix(".stl").unwrap_or(&base).to_owned();
            let mut k = 2;
            loop {
                let candidate = format!("{stem}-{k}.stl");
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                k += 1;
            }
        })
        .collect()
}

/// Thousands-separated decimal rendering, e.g. `12,345`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn stl_names() {
        assert_eq!(stl_name("part.step"), "part.stl");
        assert_eq!(stl_name("part.STP"), "part.stl");
        assert_eq!(stl_name("part.v2.step"), "part.v2.stl");
    }

    #[test]
    fn colliding_stems_are_suffixed() {
        let files = ["a.step", "a.stp", "b.step", "a.STEP"]
            .map(String::from)
            .to_vec();
        assert_eq!(output_names(&files), ["a.stl", "a-2.stl", "b.stl", "a-3.stl"]);
    }
}
