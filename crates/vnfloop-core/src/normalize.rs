use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::constants::PROB_PRECISION;

/// Turns non-negative counts into probabilities rounded to [`PROB_PRECISION`] decimal places.
///
/// The rounding residual is added to the largest entry (the first one on ties), so the result
/// sums to one up to floating-point error. If the counts sum to zero, the result is all zeros:
/// there is nothing to distribute, and callers decide what that means.
pub fn normalize(counts: &[f64]) -> Vec<f64> {
    let total = counts.iter().sum::<f64>();
    if total <= 0.0 || total.is_nan() {
        return vec![0.0; counts.len()];
    }
    let scale = 10_f64.powi(PROB_PRECISION);
    let mut probs = counts
        .iter()
        .map(|&c| (c / total * scale).round() / scale)
        .collect::<Vec<_>>();
    let residual = 1.0 - probs.iter().sum::<f64>();
    if residual != 0.0 {
        let largest = probs
            .iter()
            .enumerate()
            .max_by_key(|&(i, &p)| (OrderedFloat(p), Reverse(i)))
            .map(|(i, _)| i);
        if let Some(i) = largest {
            probs[i] += residual;
        }
    }
    probs
}
