use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A metric is either one number or one number per shared dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl MetricValue {
    pub fn shape_name(&self) -> String {
        match self {
            MetricValue::Scalar(_) => "scalar".to_string(),
            MetricValue::Vector(v) => format!("vector[{}]", v.len()),
        }
    }

    pub fn same_shape(&self, other: &MetricValue) -> bool {
        match (self, other) {
            (MetricValue::Scalar(_), MetricValue::Scalar(_)) => true,
            (MetricValue::Vector(a), MetricValue::Vector(b)) => a.len() == b.len(),
            _ => false,
        }
    }
}

/// Metrics of one run, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResult {
    entries: Vec<(String, MetricValue)>,
}

impl MetricResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: MetricValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn scalar(&mut self, name: impl Into<String>, value: f64) {
        self.insert(name, MetricValue::Scalar(value));
    }

    pub fn vector(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) {
        self.insert(name, MetricValue::Vector(values.into_iter().collect()));
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scalars verbatim, vectors expanded to `name_0`, `name_1`, ...
    pub fn flatten(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            match value {
                MetricValue::Scalar(v) => out.push((name.clone(), *v)),
                MetricValue::Vector(vs) => {
                    for (i, v) in vs.iter().enumerate() {
                        out.push((indexed_key(name, i), *v));
                    }
                }
            }
        }
        out
    }
}

impl Serialize for MetricResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

pub fn indexed_key(name: &str, index: usize) -> String {
    format!("{name}_{index}")
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/metrics.rs"]
mod tests;
