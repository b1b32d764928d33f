//! Shared math utilities: percentiles, similarity, and basic statistics.

/// Percentile of a sample with linear interpolation between closest ranks.
///
/// `q` is in [0, 100]. Returns 0.0 for an empty sample. The input does not
/// need to be sorted.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Arithmetic mean. 0.0 for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. 0.0 for an empty sample.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Z-score each column of a row-major matrix in place.
///
/// Columns with zero spread are left at zero so they contribute nothing to
/// distance computations downstream.
pub fn standardize_columns(rows: &mut [Vec<f32>]) {
    if rows.is_empty() {
        return;
    }
    let dims = rows[0].len();
    for d in 0..dims {
        let column: Vec<f64> = rows.iter().map(|r| f64::from(r[d])).collect();
        let m = mean(&column);
        let s = std_dev(&column);
        for row in rows.iter_mut() {
            row[d] = if s > f64::EPSILON {
                ((f64::from(row[d]) - m) / s) as f32
            } else {
                0.0
            };
        }
    }
}
