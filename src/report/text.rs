use crate::report::{ResultTable, format_f64_6};

/// Fixed-width table for the terminal.
pub fn render_table_text(table: &ResultTable, evaluator: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Evaluation results ({evaluator})\n"));
    if table.is_empty() {
        out.push_str("no competitor produced results\n");
        return out;
    }

    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.values
                .iter()
                .map(|v| v.map(format_f64_6).unwrap_or_else(|| "-".to_string()))
                .collect()
        })
        .collect();

    let name_width = table
        .rows
        .iter()
        .map(|r| r.competitor.len())
        .chain(std::iter::once("competitor".len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| cells.iter().map(|r| r[i].len()).fold(c.len(), usize::max))
        .collect();

    out.push_str(&format!("{:<name_width$}", "competitor"));
    for (column, width) in table.columns.iter().zip(&widths) {
        out.push_str(&format!("  {column:>width$}"));
    }
    out.push('\n');

    for (row, row_cells) in table.rows.iter().zip(&cells) {
        out.push_str(&format!("{:<name_width$}", row.competitor));
        for (cell, width) in row_cells.iter().zip(&widths) {
            out.push_str(&format!("  {cell:>width$}"));
        }
        out.push('\n');
    }
    out
}
