use std::path::Path;

use crate::error::Result;
use crate::input::{Competitor, competitor_names, load_competitors, matches_pattern};

#[derive(Debug, Clone)]
pub struct Stage1Output {
    pub competitors: Vec<Competitor>,
    pub n_discovered: usize,
}

pub fn run_stage1(root: &Path, pattern: Option<&str>) -> Result<Stage1Output> {
    let mut names = competitor_names(root)?;
    let n_discovered = names.len();
    // Runs are only listed for competitors that survive the filter.
    names.retain(|name| matches_pattern(name, pattern));
    let competitors = load_competitors(root, names)?;

    let n_runs: usize = competitors.iter().map(|c| c.runs.len()).sum();
    tracing::info!(
        root = %root.display(),
        discovered = n_discovered,
        kept = competitors.len(),
        runs = n_runs,
        "discovered competitors"
    );
    if competitors.is_empty() {
        tracing::warn!(
            "no competitor under {} matches {:?}",
            root.display(),
            pattern.unwrap_or("")
        );
    }

    Ok(Stage1Output {
        competitors,
        n_discovered,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_discover.rs"]
mod tests;
