//! Order statistics over expression values

/// The `p`-th percentile (0 to 100) of `values`, interpolating linearly between the two
/// nearest ranks
///
/// Returns None when there are no finite values.
pub(crate) fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = (p.clamp(0., 100.) / 100.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Fraction of `values` less than or equal to `value`
pub(crate) fn rank_fraction(values: &[f64], value: f64) -> f64 {
    if values.is_empty() {
        return 0.;
    }
    let at_or_below = values.iter().filter(|v| **v <= value).count();
    at_or_below as f64 / values.len() as f64
}
