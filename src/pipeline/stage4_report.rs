use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::stage2_evaluate::{RunResults, SkippedRun};
use crate::report::ResultTable;
use crate::report::plot::to_comparative_plot;
use crate::report::svg::render_plot_svg;
use crate::report::tsv::render_table_tsv;

pub const TABLE_FILE: &str = "results.tsv";
pub const JSON_FILE: &str = "results.json";
pub const PLOT_FILE: &str = "comparison.svg";

#[derive(Debug, Clone)]
pub struct Stage4Input<'a> {
    pub evaluator: &'a str,
    pub experiment_dir: &'a Path,
    pub table: &'a ResultTable,
    pub run_results: &'a RunResults,
    pub skipped: &'a [SkippedRun],
    pub plot: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Stage4Output {
    pub written: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    tool_name: &'static str,
    tool_version: &'static str,
    experiment_git_hash: Option<String>,
    evaluator: &'a str,
    experiment_dir: String,
    table: &'a ResultTable,
    runs: &'a RunResults,
    skipped: &'a [SkippedRun],
}

pub fn write_reports(input: &Stage4Input<'_>, out_dir: &Path) -> Result<Stage4Output> {
    fs::create_dir_all(out_dir)?;
    let mut out = Stage4Output::default();

    let table_path = out_dir.join(TABLE_FILE);
    write_text(&table_path, &render_table_tsv(input.table))?;
    out.written.push(table_path);

    let json_path = out_dir.join(JSON_FILE);
    let doc = ResultsDocument {
        tool_name: env!("CARGO_PKG_NAME"),
        tool_version: env!("CARGO_PKG_VERSION"),
        experiment_git_hash: read_git_hash(input.experiment_dir),
        evaluator: input.evaluator,
        experiment_dir: input.experiment_dir.display().to_string(),
        table: input.table,
        runs: input.run_results,
        skipped: input.skipped,
    };
    let mut w = BufWriter::new(File::create(&json_path)?);
    serde_json::to_writer_pretty(&mut w, &doc)?;
    w.write_all(b"\n")?;
    w.flush()?;
    out.written.push(json_path);

    if input.plot {
        let spec = to_comparative_plot(input.run_results);
        if spec.panels.is_empty() {
            tracing::warn!("no per-run metrics to plot, skipping {PLOT_FILE}");
        } else {
            let plot_path = out_dir.join(PLOT_FILE);
            render_plot_svg(&spec, &plot_path)?;
            out.written.push(plot_path);
        }
    }

    for path in &out.written {
        tracing::info!("wrote {}", path.display());
    }
    Ok(out)
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

/// HEAD of the nearest git checkout containing `dir`.
fn read_git_hash(dir: &Path) -> Option<String> {
    let repo_root = dir.ancestors().find(|p| p.join(".git/HEAD").is_file())?;
    let content = fs::read_to_string(repo_root.join(".git/HEAD")).ok()?;
    if let Some(ref_line) = content.strip_prefix("ref: ") {
        let ref_path = repo_root.join(".git").join(ref_line.trim());
        return fs::read_to_string(ref_path)
            .ok()
            .map(|s| s.trim().to_string());
    }
    Some(content.trim().to_string())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_report.rs"]
mod tests;
