//! Small statistics helpers for reducing result timeseries.
use itertools::Itertools;
use statrs::statistics::Statistics;
use std::hash::Hash;

/// Arithmetic mean; NaN for an empty sequence
pub fn mean(values: &[f64]) -> f64 {
    values.mean()
}

/// Means of values grouped by key, sorted by key. NaN values are left out, and so are groups
/// left with no values.
pub fn grouped_means<K, I>(pairs: I) -> Vec<(K, f64)>
where
    K: Copy + Ord + Hash,
    I: IntoIterator<Item = (K, f64)>,
{
    pairs
        .into_iter()
        .filter(|(_, value)| !value.is_nan())
        .into_group_map()
        .into_iter()
        .map(|(key, values)| (key, values.mean()))
        .sorted_by_key(|(key, _)| *key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_calc_mean() {
        assert_relative_eq!(
            mean(&[322.04, 318.15, 330.15]),
            323.446_666_666_666_7,
            max_relative = 1e-9
        );
        assert!(mean(&[]).is_nan());
    }

    #[rstest]
    fn should_calc_means_by_group_skipping_nan() {
        let pairs = [(2, 0.5), (1, 0.2), (2, f64::NAN), (1, 0.4), (3, f64::NAN), (2, 1.)];
        let means = grouped_means(pairs);

        assert_eq!(means.iter().map(|(key, _)| *key).collect::<Vec<_>>(), vec![1, 2]);
        assert_relative_eq!(means[0].1, 0.3, max_relative = 1e-12);
        assert_relative_eq!(means[1].1, 0.75, max_relative = 1e-12);
    }
}
