use std::fs;
use std::path::{Path, PathBuf};

pub mod dataset;
pub mod rows;
pub mod synthetic;

/// One trained-model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub path: PathBuf,
    pub name: String,
}

impl Run {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Fold index from the trailing digits of the run name (`run_12` -> 12).
    pub fn fold(&self) -> Option<usize> {
        trailing_number(&self.name)
    }
}

/// A named configuration and the runs trained with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competitor {
    pub name: String,
    pub runs: Vec<Run>,
}

/// Competitors are the subdirectories of `root`, sorted by name. Runs keep
/// directory listing order.
pub fn discover_competitors(root: &Path) -> std::io::Result<Vec<Competitor>> {
    load_competitors(root, competitor_names(root)?)
}

/// Sorted names of the subdirectories of `root`, without touching their runs.
pub fn competitor_names(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        // Follows symlinks, so linked run trees are discovered too.
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Lists the runs of each named competitor under `root`.
pub fn load_competitors(root: &Path, names: Vec<String>) -> std::io::Result<Vec<Competitor>> {
    let mut competitors = Vec::with_capacity(names.len());
    for name in names {
        let runs = list_runs(&root.join(&name))?;
        competitors.push(Competitor { name, runs });
    }
    Ok(competitors)
}

pub fn matches_pattern(name: &str, pattern: Option<&str>) -> bool {
    pattern.is_none_or(|p| name.contains(p))
}

pub fn filter_by_pattern(competitors: Vec<Competitor>, pattern: Option<&str>) -> Vec<Competitor> {
    competitors
        .into_iter()
        .filter(|c| matches_pattern(&c.name, pattern))
        .collect()
}

fn list_runs(dir: &Path) -> std::io::Result<Vec<Run>> {
    let mut runs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            runs.push(Run::new(entry.path()));
        }
    }
    Ok(runs)
}

fn trailing_number(name: &str) -> Option<usize> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    name[digits_start..].parse().ok()
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
