use serde::Serialize;

use crate::pipeline::stage3_aggregate::AggregatedRow;

pub mod plot;
pub mod svg;
pub mod text;
pub mod tsv;

/// Rows are competitors, columns the union of flattened metric keys in
/// first-seen order. A cell is `None` when a competitor lacks that column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub competitor: String,
    pub values: Vec<Option<f64>>,
}

impl ResultTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, competitor: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.competitor == competitor)
            .and_then(|r| r.values[col])
    }
}

pub fn to_table(rows: &[AggregatedRow]) -> ResultTable {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (key, _) in &row.values {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = rows
        .iter()
        .map(|row| TableRow {
            competitor: row.competitor.clone(),
            values: columns.iter().map(|c| row.get(c)).collect(),
        })
        .collect();

    ResultTable { columns, rows }
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

/// Percentile of already sorted values with linear interpolation between
/// the two closest ranks.
pub fn percentile_linear(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
