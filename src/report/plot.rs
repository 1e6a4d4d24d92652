//! Comparative box-plot description, built from per-run (not aggregated)
//! values. Rendering lives in `report::svg`.

use serde::Serialize;

use crate::pipeline::stage2_evaluate::RunResults;
use crate::report::percentile_linear;

pub const Y_RANGE: (f64, f64) = (0.0, 1.0);
const WHISKER_IQR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    pub panels: Vec<PlotPanel>,
    pub y_range: (f64, f64),
    pub y_ticks: Vec<f64>,
}

/// One flattened metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPanel {
    pub metric: String,
    pub series: Vec<CompetitorSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorSeries {
    pub competitor: String,
    pub label: String,
    pub points: Vec<f64>,
    pub stats: BoxStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Quartiles by linear interpolation; whiskers reach the furthest values
    /// within 1.5 IQR of the box. Non-finite values are ignored.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile_linear(&sorted, 0.25);
        let median = percentile_linear(&sorted, 0.5);
        let q3 = percentile_linear(&sorted, 0.75);
        let iqr = q3 - q1;
        let lo_fence = q1 - WHISKER_IQR * iqr;
        let hi_fence = q3 + WHISKER_IQR * iqr;

        let inside = || sorted.iter().copied().filter(|v| *v >= lo_fence && *v <= hi_fence);
        let whisker_low = inside().next().unwrap_or(q1);
        let whisker_high = inside().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(Self {
            median,
            q1,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Short legend label: the first three `_`-separated tokens of the name.
pub fn display_name(competitor: &str) -> String {
    competitor.split('_').take(3).collect::<Vec<_>>().join(" ")
}

pub fn y_ticks() -> Vec<f64> {
    (0..10).map(|i| i as f64 / 10.0).collect()
}

pub fn to_comparative_plot(results: &RunResults) -> PlotSpec {
    let flattened: Vec<(&String, Vec<Vec<(String, f64)>>)> = results
        .iter()
        .map(|(name, runs)| (name, runs.iter().map(|r| r.metrics.flatten()).collect()))
        .collect();

    let mut metrics: Vec<String> = Vec::new();
    for (_, runs) in &flattened {
        for run in runs {
            for (key, _) in run {
                if !metrics.contains(key) {
                    metrics.push(key.clone());
                }
            }
        }
    }

    let panels = metrics
        .into_iter()
        .map(|metric| {
            let series = flattened
                .iter()
                .filter_map(|(name, runs)| {
                    let points: Vec<f64> = runs
                        .iter()
                        .filter_map(|run| run.iter().find(|(k, _)| *k == metric).map(|(_, v)| *v))
                        .collect();
                    let stats = BoxStats::from_values(&points)?;
                    Some(CompetitorSeries {
                        competitor: (*name).clone(),
                        label: display_name(name),
                        points,
                        stats,
                    })
                })
                .collect();
            PlotPanel { metric, series }
        })
        .collect();

    PlotSpec {
        panels,
        y_range: Y_RANGE,
        y_ticks: y_ticks(),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/plot.rs"]
mod tests;
