//! Serde adapter storing a `DMatrix<f64>` as a list of rows.

use nalgebra::DMatrix;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(m: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    let rows: Vec<Vec<f64>> = m
        .row_iter()
        .map(|r| r.iter().copied().collect())
        .collect();
    rows.serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DMatrix<f64>, D::Error> {
    let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
    from_rows(&rows).map_err(D::Error::custom)
}

pub fn from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, String> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut data = Vec::with_capacity(n_rows * n_cols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_cols {
            return Err(format!(
                "ragged matrix: row {i} has {} values, expected {n_cols}",
                row.len()
            ));
        }
        data.extend_from_slice(row);
    }
    Ok(DMatrix::from_row_slice(n_rows, n_cols, &data))
}
