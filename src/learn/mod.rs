//! Seeded numerical learners used to score latent representations.

pub mod kmeans;
pub mod spectral;
pub mod svm;

/// Fraction of positions where `predicted` matches `truth`.
pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    hits as f64 / truth.len() as f64
}
