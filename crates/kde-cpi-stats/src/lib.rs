//! Weighted descriptive statistics for CPI growth components.
//!
//! This crate provides the numerical core used to summarize a set of
//! year-over-year inflation components:
//!
//! - **Samples**: Validated `(value, weight)` pairs with normalized weights
//! - **Descriptive statistics**: Weighted mean, variance, standard deviation,
//!   skewness, kurtosis and effective sample size
//! - **Percentiles**: Weighted quantiles, median and trimmed mean
//! - **Kernel density estimation**: Bandwidth selection and grid-search mode of
//!   a weighted Gaussian KDE
//! - **Histogram generation**: Weighted equal-width histograms
//! - **Summaries**: All of the above bundled into one [`summary::StatSummary`]
//!
//! Every function is pure. Nothing is cached between calls, so summaries for
//! different groups or periods may be computed concurrently.
//!
//! # Modules
//!
//! - [`sample`]: Weight normalization, ordering and the [`sample::Sample`] container
//! - [`descriptive`]: Weighted moments and effective sample size
//! - [`percentiles`]: Weighted quantiles and trimmed mean
//! - [`kde`]: Weighted Gaussian KDE bandwidth, mode and density curve
//! - [`histogram`]: Weighted histogram construction
//! - [`summary`]: One-shot computation of every statistic
//!
//! # Examples
//!
//! ## Computing a summary
//!
//! ```
//! use kde_cpi_stats::summary::{SummaryOptions, compute_statistics};
//!
//! let summary = compute_statistics(&[100.0, 105.0], &[0.5, 0.5], &SummaryOptions::default()).unwrap();
//! assert!((summary.weighted_mean - 102.5).abs() < 1e-9);
//! assert!((summary.weighted_median - 102.5).abs() < 1e-9);
//! assert!((summary.weighted_std - 2.5).abs() < 1e-9);
//! ```
//!
//! ## Working with a sample directly
//!
//! ```
//! use kde_cpi_stats::{descriptive, kde, sample::Sample};
//!
//! let sample = Sample::uniform(&[-0.02, 0.01, 0.03, 0.03, 0.05]).unwrap();
//! let bandwidth = kde::weighted_kde_bandwidth(&sample);
//! let mode = kde::weighted_kde_mode(&sample, Some(bandwidth), &kde::KdeConfig::default()).unwrap();
//! assert!(bandwidth > 0.0);
//! assert!((-0.02..=0.05).contains(&mode));
//! assert!((descriptive::effective_sample_size(&sample) - 5.0).abs() < 1e-9);
//! ```
//!
//! ## Rejecting malformed input
//!
//! ```
//! use kde_cpi_stats::{StatsError, sample::Sample};
//!
//! assert!(matches!(
//!     Sample::new(&[1.0, 2.0], &[1.0, -1.0]),
//!     Err(StatsError::NegativeWeight { index: 1 })
//! ));
//! assert!(matches!(
//!     Sample::new(&[1.0, 2.0], &[0.0, 0.0]),
//!     Err(StatsError::NonPositiveTotalWeight { .. })
//! ));
//! ```

pub mod descriptive;
pub mod histogram;
pub mod kde;
pub mod percentiles;
pub mod sample;
pub mod summary;

/// Errors raised for malformed statistical input.
///
/// Well-formed but degenerate input (zero variance, zero bandwidth, a single
/// observation) never produces an error; each statistic has a defined
/// fallback for those cases instead.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum StatsError {
    #[display("sample must contain at least one value")]
    EmptySample,
    #[display("values and weights must share the same length ({values} values, {weights} weights)")]
    ShapeMismatch { values: usize, weights: usize },
    #[display("value at index {index} is not finite")]
    NonFiniteValue { index: usize },
    #[display("weights must be non-negative (weight at index {index} is negative)")]
    NegativeWeight { index: usize },
    #[display("weights must sum to a positive value (sum is {total})")]
    NonPositiveTotalWeight { total: f64 },
    #[display("trim must lie in the interval [0, 0.5) (got {trim})")]
    InvalidTrim { trim: f64 },
    #[display("quantile must be a number (got {q})")]
    InvalidQuantile { q: f64 },
    #[display("bandwidth must be finite and keep the KDE grid finite (got {bandwidth})")]
    InvalidBandwidth { bandwidth: f64 },
    #[display(
        "KDE grid needs at least one point and a finite, non-negative extend (got {grid_points} points, extend {extend})"
    )]
    InvalidKdeConfig { grid_points: usize, extend: f64 },
}
