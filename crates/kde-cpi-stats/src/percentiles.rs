//! Weighted quantiles and trimmed mean.
//!
//! Quantiles are read off the cumulative weight distribution of the sorted
//! sample. Each observation owns the slice `[Cₖ₋₁, Cₖ]` of cumulative
//! probability mass and is placed at the midpoint of that slice; a quantile
//! between two midpoints is linearly interpolated, and anything outside the
//! first/last midpoint is clamped to the observed minimum/maximum.

use crate::{
    StatsError,
    descriptive::weighted_mean,
    sample::{Sample, WeightedValue},
};

/// Default fraction trimmed from each tail by [`weighted_trimmed_mean`].
pub const DEFAULT_TRIM: f64 = 0.08;

/// Precomputed weighted percentile values for a sample.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{percentiles::Percentiles, sample::Sample};
///
/// let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let percentiles = Percentiles::new(&sample, &[25.0, 50.0, 75.0]).unwrap();
///
/// assert!((percentiles.get(50.0).unwrap() - 3.0).abs() < 1e-9);
/// assert_eq!(percentiles.get(90.0), None);
/// ```
#[derive(Debug, Clone)]
pub struct Percentiles {
    /// Percentile-value pairs in the order requested.
    /// Each tuple contains (percentile, value) where percentile is 0.0-100.0.
    values: Vec<(f64, f64)>,
}

impl Percentiles {
    /// Computes the requested percentiles (`0.0..=100.0`) of a sample.
    ///
    /// The sample is sorted once and shared by every percentile point.
    ///
    /// # Errors
    ///
    /// [`StatsError::InvalidQuantile`] if a percentile point is NaN.
    pub fn new(sample: &Sample, percentile_points: &[f64]) -> Result<Self, StatsError> {
        let sorted = sample.sorted();
        let values = percentile_points
            .iter()
            .map(|&p| {
                let q = checked_quantile(p / 100.0)?;
                Ok((p, quantile_sorted(&sorted, q)))
            })
            .collect::<Result<Vec<_>, StatsError>>()?;
        Ok(Self { values })
    }

    /// Gets the value at a precomputed percentile, or `None` if it was not requested.
    #[must_use]
    pub fn get(&self, percentile: f64) -> Option<f64> {
        self.values.iter().find_map(|(p, value)| {
            if (*p - percentile).abs() < f64::EPSILON {
                Some(*value)
            } else {
                None
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.values
    }
}

/// Weighted quantile at cumulative probability `q`.
///
/// `q` is clamped to `[0, 1]`, so the result always lies within the observed
/// range of values.
///
/// # Errors
///
/// [`StatsError::InvalidQuantile`] if `q` is NaN.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{percentiles::weighted_quantile, sample::Sample};
///
/// let sample = Sample::new(&[100.0, 105.0], &[0.5, 0.5]).unwrap();
/// assert!((weighted_quantile(&sample, 0.5).unwrap() - 102.5).abs() < 1e-9);
/// assert_eq!(weighted_quantile(&sample, 0.0).unwrap(), 100.0);
/// assert_eq!(weighted_quantile(&sample, 1.0).unwrap(), 105.0);
/// ```
pub fn weighted_quantile(sample: &Sample, q: f64) -> Result<f64, StatsError> {
    let q = checked_quantile(q)?;
    Ok(quantile_sorted(&sample.sorted(), q))
}

/// Weighted 50th percentile.
#[must_use]
pub fn weighted_median(sample: &Sample) -> f64 {
    quantile_sorted(&sample.sorted(), 0.5)
}

/// Symmetric weighted trimmed mean.
///
/// The window `[trim, 1 - trim]` of cumulative probability mass is kept. An
/// observation whose mass lies entirely outside the window is dropped, one
/// straddling a boundary keeps only its overlap. The surviving weights are
/// renormalized before averaging. If nothing survives, the plain weighted
/// mean is returned. `trim = 0` is exactly the weighted mean.
///
/// # Errors
///
/// [`StatsError::InvalidTrim`] unless `0 <= trim < 0.5`.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{percentiles::weighted_trimmed_mean, sample::Sample};
///
/// // The outlier at 100 falls entirely inside the upper 20% of the mass.
/// let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
/// assert!((weighted_trimmed_mean(&sample, 0.2).unwrap() - 3.0).abs() < 1e-9);
/// assert!(weighted_trimmed_mean(&sample, 0.5).is_err());
/// ```
pub fn weighted_trimmed_mean(sample: &Sample, trim: f64) -> Result<f64, StatsError> {
    if !(0.0..0.5).contains(&trim) {
        return Err(StatsError::InvalidTrim { trim });
    }
    if trim <= 0.0 {
        return Ok(weighted_mean(sample));
    }

    let sorted = sample.sorted();
    let (lower_bound, upper_bound) = (trim, 1.0 - trim);
    let mut lower = 0.0;
    let mut kept_mass = 0.0;
    let mut kept_sum = 0.0;
    for point in &sorted {
        let upper = lower + point.weight;
        let kept = upper.clamp(lower_bound, upper_bound) - lower.clamp(lower_bound, upper_bound);
        if kept > 0.0 {
            kept_mass += kept;
            kept_sum += kept * point.value;
        }
        lower = upper;
    }

    if kept_mass <= 0.0 {
        return Ok(sorted.iter().map(|p| p.value * p.weight).sum());
    }
    Ok(kept_sum / kept_mass)
}

fn checked_quantile(q: f64) -> Result<f64, StatsError> {
    if q.is_nan() {
        return Err(StatsError::InvalidQuantile { q });
    }
    Ok(q.clamp(0.0, 1.0))
}

/// Quantile of points already sorted ascending by value, `q` in `[0, 1]`.
///
/// Zero-weight points carry no mass and are skipped.
pub(crate) fn quantile_sorted(sorted: &[WeightedValue], q: f64) -> f64 {
    debug_assert!(
        sorted.is_sorted_by(|a, b| a.value <= b.value),
        "points must be sorted in ascending order"
    );

    let mut lower = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    let mut last = f64::NAN;
    for point in sorted.iter().filter(|p| p.weight > 0.0) {
        let upper = lower + point.weight;
        let midpoint = 0.5 * (lower + upper);
        if q <= midpoint {
            return match previous {
                Some((prev_midpoint, prev_value)) if midpoint > prev_midpoint => {
                    let t = (q - prev_midpoint) / (midpoint - prev_midpoint);
                    prev_value + t * (point.value - prev_value)
                }
                _ => point.value,
            };
        }
        previous = Some((midpoint, point.value));
        last = point.value;
        lower = upper;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_median_of_uniform_sample() {
        let sample = Sample::uniform(&[5.0, 3.0, 1.0, 4.0, 2.0]).unwrap();
        assert_close(weighted_median(&sample), 3.0);
    }

    #[test]
    fn test_median_of_even_sample_interpolates() {
        let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_close(weighted_median(&sample), 2.5);
    }

    #[test]
    fn test_quantile_follows_weight() {
        // 80% of the mass sits on 10.0.
        let sample = Sample::new(&[0.0, 10.0], &[0.2, 0.8]).unwrap();
        assert_close(weighted_median(&sample), 10.0 * (0.5 - 0.1) / (0.6 - 0.1));
        assert_close(weighted_quantile(&sample, 0.9).unwrap(), 10.0);
    }

    #[test]
    fn test_quantile_is_clamped_to_observed_range() {
        let sample = Sample::new(&[-3.0, 1.0, 8.0], &[1.0, 5.0, 1.0]).unwrap();
        assert_eq!(weighted_quantile(&sample, 0.0).unwrap(), -3.0);
        assert_eq!(weighted_quantile(&sample, 1.0).unwrap(), 8.0);
        assert_eq!(weighted_quantile(&sample, -4.0).unwrap(), -3.0);
        assert_eq!(weighted_quantile(&sample, 7.5).unwrap(), 8.0);
    }

    #[test]
    fn test_quantile_rejects_nan() {
        let sample = Sample::uniform(&[1.0, 2.0]).unwrap();
        assert!(matches!(
            weighted_quantile(&sample, f64::NAN),
            Err(StatsError::InvalidQuantile { .. })
        ));
    }

    #[test]
    fn test_quantile_single_value() {
        let sample = Sample::uniform(&[0.042]).unwrap();
        for q in [0.0, 0.25, 0.5, 0.75, 1.0] {
            assert_eq!(weighted_quantile(&sample, q).unwrap(), 0.042);
        }
    }

    #[test]
    fn test_quantile_skips_zero_weight_points() {
        let sample = Sample::new(&[1.0, 50.0, 3.0], &[1.0, 0.0, 1.0]).unwrap();
        assert_eq!(weighted_quantile(&sample, 1.0).unwrap(), 3.0);
        assert_close(weighted_median(&sample), 2.0);
    }

    #[test]
    fn test_trimmed_mean_zero_trim_is_exact_mean() {
        let sample = Sample::new(&[0.3, -0.1, 0.7, 0.2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(
            weighted_trimmed_mean(&sample, 0.0).unwrap(),
            weighted_mean(&sample)
        );
    }

    #[test]
    fn test_trimmed_mean_symmetric_sample() {
        let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_close(weighted_trimmed_mean(&sample, DEFAULT_TRIM).unwrap(), 3.0);
    }

    #[test]
    fn test_trimmed_mean_partial_overlap() {
        // Each value owns 25% of the mass; trimming 10% keeps 15% of each end.
        let sample = Sample::uniform(&[0.0, 1.0, 2.0, 10.0]).unwrap();
        let expected = (0.15 * 0.0 + 0.25 * 1.0 + 0.25 * 2.0 + 0.15 * 10.0) / 0.8;
        assert_close(weighted_trimmed_mean(&sample, 0.1).unwrap(), expected);
    }

    #[test]
    fn test_trimmed_mean_rejects_invalid_trim() {
        let sample = Sample::uniform(&[1.0, 2.0]).unwrap();
        for trim in [-0.01, 0.5, 0.75, f64::NAN] {
            assert!(matches!(
                weighted_trimmed_mean(&sample, trim),
                Err(StatsError::InvalidTrim { .. })
            ));
        }
    }

    #[test]
    fn test_trimmed_mean_keeps_central_mass_of_single_point() {
        let sample = Sample::uniform(&[7.0]).unwrap();
        assert_close(weighted_trimmed_mean(&sample, 0.49).unwrap(), 7.0);
    }

    #[test]
    fn test_percentiles_table() {
        let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let percentiles = Percentiles::new(&sample, &[0.0, 50.0, 100.0]).unwrap();
        assert_eq!(percentiles.as_slice().len(), 3);
        assert_eq!(percentiles.get(0.0), Some(1.0));
        assert_eq!(percentiles.get(100.0), Some(5.0));
        let points = percentiles.iter().map(|(p, _)| p).collect::<Vec<_>>();
        assert_eq!(points, [0.0, 50.0, 100.0]);
    }
}
