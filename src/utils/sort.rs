use std::cmp::Ordering;

/// Indices of `vals` ordered by value descending.
/// - NaN values are ordered last
/// - equal values keep their original order (stable)
#[inline]
pub fn argsort_desc(vals: &[f64]) -> Vec<usize> {
    let mut inds: Vec<usize> = (0..vals.len()).collect();
    inds.sort_by(|&a, &b| desc_nan_last(vals[a], vals[b]));
    inds
}

/// First `k` indices of [`argsort_desc`]
#[inline]
pub fn top_k_desc(vals: &[f64], k: usize) -> Vec<usize> {
    let mut inds = argsort_desc(vals);
    inds.truncate(k);
    inds
}

/// Index of the largest value, `None` for an empty slice or all-NaN input
#[inline]
pub fn argmax(vals: &[f64]) -> Option<usize> {
    argsort_desc(vals)
        .into_iter()
        .next()
        .filter(|&i| !vals[i].is_nan())
}

#[inline(always)]
fn desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
