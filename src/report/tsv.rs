use crate::report::{ResultTable, format_f64_6};

pub fn render_table_tsv(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str("competitor");
    for column in &table.columns {
        out.push('\t');
        out.push_str(column);
    }
    out.push('\n');

    for row in &table.rows {
        out.push_str(&row.competitor);
        for value in &row.values {
            out.push('\t');
            if let Some(v) = value {
                out.push_str(&format_f64_6(*v));
            }
        }
        out.push('\n');
    }
    out
}
