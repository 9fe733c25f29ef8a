//! One-shot computation of every weighted statistic for a sample.

use serde::{Deserialize, Serialize};

use crate::{
    StatsError,
    descriptive::{
        Kurtosis, effective_sample_size, weighted_kurtosis, weighted_mean, weighted_skewness,
        weighted_std,
    },
    kde::{KdeConfig, weighted_kde_bandwidth, weighted_kde_mode},
    percentiles::{DEFAULT_TRIM, weighted_median, weighted_trimmed_mean},
    sample::Sample,
};

/// Tuning knobs for [`compute_statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Fraction of probability mass trimmed from each tail for the trimmed mean.
    pub trim: f64,
    /// Explicit KDE bandwidth. `None` or `Some(0.0)` derives it from the sample.
    pub bandwidth: Option<f64>,
    /// Grid used by the mode search.
    pub kde: KdeConfig,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            trim: DEFAULT_TRIM,
            bandwidth: None,
            kde: KdeConfig::default(),
        }
    }
}

/// Weighted summary statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub weighted_mean: f64,
    pub weighted_median: f64,
    pub trimmed_mean: f64,
    pub weighted_std: f64,
    pub weighted_skewness: f64,
    /// Excess (Fisher) kurtosis.
    pub weighted_kurtosis: f64,
    pub weighted_kde_bandwidth: f64,
    pub weighted_kde_mode: f64,
    pub effective_sample_size: f64,
}

impl StatSummary {
    /// Computes every statistic of an already validated sample.
    ///
    /// The KDE mode is searched with the same bandwidth reported in
    /// [`StatSummary::weighted_kde_bandwidth`].
    ///
    /// # Errors
    ///
    /// - [`StatsError::InvalidTrim`] if `options.trim` is outside `[0, 0.5)`
    /// - [`StatsError::InvalidBandwidth`] if `options.bandwidth` is not finite or
    ///   overflows the KDE grid
    /// - [`StatsError::InvalidKdeConfig`] if `options.kde` is malformed
    pub fn from_sample(sample: &Sample, options: &SummaryOptions) -> Result<Self, StatsError> {
        let trimmed_mean = weighted_trimmed_mean(sample, options.trim)?;
        let bandwidth = match options.bandwidth.filter(|h| *h != 0.0) {
            Some(bandwidth) if !bandwidth.is_finite() => {
                return Err(StatsError::InvalidBandwidth { bandwidth });
            }
            Some(bandwidth) => bandwidth,
            None => weighted_kde_bandwidth(sample),
        };
        let mode = weighted_kde_mode(sample, Some(bandwidth), &options.kde)?;

        Ok(Self {
            weighted_mean: weighted_mean(sample),
            weighted_median: weighted_median(sample),
            trimmed_mean,
            weighted_std: weighted_std(sample),
            weighted_skewness: weighted_skewness(sample),
            weighted_kurtosis: weighted_kurtosis(sample, Kurtosis::Fisher),
            weighted_kde_bandwidth: bandwidth,
            weighted_kde_mode: mode,
            effective_sample_size: effective_sample_size(sample),
        })
    }
}

/// Validates paired values and weights and summarizes them.
///
/// All-or-nothing: the first error aborts the whole summary.
///
/// # Errors
///
/// Any error of [`Sample::new`] or [`StatSummary::from_sample`].
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::summary::{SummaryOptions, compute_statistics};
///
/// let options = SummaryOptions { bandwidth: Some(0.5), ..SummaryOptions::default() };
/// let summary = compute_statistics(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0], &options).unwrap();
/// assert_eq!(summary.weighted_kde_bandwidth, 0.5);
/// assert!((summary.effective_sample_size - 3.0).abs() < 1e-9);
/// ```
pub fn compute_statistics(
    values: &[f64],
    weights: &[f64],
    options: &SummaryOptions,
) -> Result<StatSummary, StatsError> {
    let sample = Sample::new(values, weights)?;
    StatSummary::from_sample(&sample, options)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        percentiles::weighted_quantile,
        sample::{cumulative_weights, normalize_weights},
    };

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_two_point_summary() {
        let summary =
            compute_statistics(&[100.0, 105.0], &[0.5, 0.5], &SummaryOptions::default()).unwrap();
        assert_close(summary.weighted_mean, 102.5);
        assert_close(summary.weighted_median, 102.5);
        assert_close(summary.weighted_std, 2.5);
        assert_close(summary.effective_sample_size, 2.0);
        assert!(summary.weighted_kde_bandwidth > 0.0);
        assert!((100.0..=105.0).contains(&summary.weighted_kde_mode));
    }

    #[test]
    fn test_uniform_five_points() {
        let summary = compute_statistics(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[1.0; 5],
            &SummaryOptions::default(),
        )
        .unwrap();
        assert_close(summary.weighted_mean, 3.0);
        assert_close(summary.weighted_median, 3.0);
        assert_close(summary.trimmed_mean, 3.0);
        assert_close(summary.weighted_kurtosis, -1.3);
        assert_close(summary.weighted_skewness, 0.0);
    }

    #[test]
    fn test_constant_sample() {
        let summary =
            compute_statistics(&[0.025; 4], &[1.0, 2.0, 3.0, 4.0], &SummaryOptions::default())
                .unwrap();
        assert_eq!(summary.weighted_std, 0.0);
        assert_eq!(summary.weighted_skewness, 0.0);
        assert_eq!(summary.weighted_kurtosis, 0.0);
        assert_eq!(summary.weighted_kde_bandwidth, 0.0);
        assert_eq!(summary.weighted_kde_mode, 0.025);
    }

    #[test]
    fn test_mode_of_growth_components() {
        let values = [-0.02, 0.01, 0.03, 0.03, 0.05];
        let summary =
            compute_statistics(&values, &[1.0; 5], &SummaryOptions::default()).unwrap();
        assert!(summary.weighted_kde_bandwidth > 0.0);
        assert!((-0.02..=0.05).contains(&summary.weighted_kde_mode));
    }

    #[test]
    fn test_summary_is_idempotent() {
        let values = [0.031, -0.004, 0.027, 0.12, 0.018, 0.018];
        let weights = [3.0, 1.0, 0.5, 0.2, 2.0, 1.0];
        let options = SummaryOptions::default();
        let first = compute_statistics(&values, &weights, &options).unwrap();
        let second = compute_statistics(&values, &weights, &options).unwrap();
        assert_eq!(first.weighted_kde_mode.to_bits(), second.weighted_kde_mode.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_bandwidth_is_derived() {
        let values = [1.0, 2.0, 4.0];
        let weights = [1.0; 3];
        let derived = compute_statistics(&values, &weights, &SummaryOptions::default()).unwrap();
        let zero = SummaryOptions {
            bandwidth: Some(0.0),
            ..SummaryOptions::default()
        };
        assert_eq!(compute_statistics(&values, &weights, &zero).unwrap(), derived);
    }

    #[test]
    fn test_errors_abort_the_summary() {
        let options = SummaryOptions::default();
        assert!(matches!(
            compute_statistics(&[1.0, 2.0], &[1.0], &options),
            Err(StatsError::ShapeMismatch {
                values: 2,
                weights: 1
            })
        ));
        assert!(matches!(
            compute_statistics(&[], &[], &options),
            Err(StatsError::EmptySample)
        ));
        assert!(matches!(
            compute_statistics(&[1.0, 2.0], &[1.0, -2.0], &options),
            Err(StatsError::NegativeWeight { index: 1 })
        ));
        assert!(matches!(
            compute_statistics(&[1.0, 2.0], &[0.0, 0.0], &options),
            Err(StatsError::NonPositiveTotalWeight { .. })
        ));

        let bad_trim = SummaryOptions {
            trim: 0.6,
            ..SummaryOptions::default()
        };
        assert!(matches!(
            compute_statistics(&[1.0, 2.0], &[1.0, 1.0], &bad_trim),
            Err(StatsError::InvalidTrim { .. })
        ));

        let bad_bandwidth = SummaryOptions {
            bandwidth: Some(f64::INFINITY),
            ..SummaryOptions::default()
        };
        assert!(matches!(
            compute_statistics(&[1.0, 2.0], &[1.0, 1.0], &bad_bandwidth),
            Err(StatsError::InvalidBandwidth { .. })
        ));

        let huge_bandwidth = SummaryOptions {
            bandwidth: Some(f64::MAX),
            ..SummaryOptions::default()
        };
        assert!(matches!(
            compute_statistics(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0], &huge_bandwidth),
            Err(StatsError::InvalidBandwidth { .. })
        ));
    }

    #[test]
    fn test_summary_json_field_names() {
        let summary =
            compute_statistics(&[1.0, 3.0], &[1.0, 1.0], &SummaryOptions::default()).unwrap();
        let json = serde_json::to_value(summary).unwrap();
        for field in [
            "weighted_mean",
            "weighted_median",
            "trimmed_mean",
            "weighted_std",
            "weighted_skewness",
            "weighted_kurtosis",
            "weighted_kde_bandwidth",
            "weighted_kde_mode",
            "effective_sample_size",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }

    fn weighted_sample() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        (1_usize..40).prop_flat_map(|n| {
            (
                prop::collection::vec(-1.0e3..1.0e3_f64, n),
                prop::collection::vec(0.01..100.0_f64, n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_normalized_weights_sum_to_one(weights in prop::collection::vec(0.0..1.0e6_f64, 1..64)) {
            prop_assume!(weights.iter().sum::<f64>() > 0.0);
            let normalized = normalize_weights(&weights, true).unwrap();
            let total = cumulative_weights(normalized.iter()).last().copied().unwrap_or(0.0);
            prop_assert!((total - 1.0).abs() < 1e-9);
            prop_assert!(normalized.iter().all(|w| w >= 0.0));
        }

        #[test]
        fn prop_quantiles_stay_in_range((values, weights) in weighted_sample(), q in 0.0..=1.0_f64) {
            let sample = Sample::new(&values, &weights).unwrap();
            let quantile = weighted_quantile(&sample, q).unwrap();
            prop_assert!(quantile >= sample.min() && quantile <= sample.max());
        }

        #[test]
        fn prop_zero_trim_is_mean((values, weights) in weighted_sample()) {
            let sample = Sample::new(&values, &weights).unwrap();
            prop_assert_eq!(weighted_trimmed_mean(&sample, 0.0).unwrap(), weighted_mean(&sample));
        }

        #[test]
        fn prop_effective_sample_size_is_bounded((values, weights) in weighted_sample()) {
            let sample = Sample::new(&values, &weights).unwrap();
            let ess = effective_sample_size(&sample);
            #[expect(clippy::cast_precision_loss)]
            let n = sample.len() as f64;
            prop_assert!(ess >= 1.0 - 1e-9);
            prop_assert!(ess <= n + 1e-9);
        }

        #[test]
        fn prop_mode_stays_near_the_data((values, weights) in weighted_sample()) {
            let options = SummaryOptions {
                kde: KdeConfig { grid_points: 128, ..KdeConfig::default() },
                ..SummaryOptions::default()
            };
            let summary = compute_statistics(&values, &weights, &options).unwrap();
            let padding = options.kde.extend * summary.weighted_kde_bandwidth;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(summary.weighted_kde_mode >= min - padding - 1e-9);
            prop_assert!(summary.weighted_kde_mode <= max + padding + 1e-9);
        }
    }
}
