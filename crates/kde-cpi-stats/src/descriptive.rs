//! Weighted moments and effective sample size.
//!
//! Each observation contributes in proportion to its normalized weight. The
//! standardized moments (skewness, kurtosis) are defined as exactly `0.0` on a
//! sample without spread, so callers always receive a number.

use crate::{
    StatsError,
    sample::{Sample, normalize_weights},
};

/// Convention used by [`weighted_kurtosis`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Kurtosis {
    /// Excess kurtosis: the fourth standardized moment minus 3.
    #[default]
    Fisher,
    /// The plain fourth standardized moment.
    Pearson,
}

/// Weighted arithmetic mean `Σ wᵢ·vᵢ`.
///
/// # Examples
///
/// ```
/// # use kde_cpi_stats::{descriptive::weighted_mean, sample::Sample};
/// let sample = Sample::new(&[1.0, 2.0, 3.0], &[1.0, 1.0, 2.0]).unwrap();
/// assert!((weighted_mean(&sample) - 2.25).abs() < 1e-12);
/// ```
#[must_use]
pub fn weighted_mean(sample: &Sample) -> f64 {
    sample.points().iter().map(|p| p.value * p.weight).sum()
}

/// Weighted population variance `Σ wᵢ·(vᵢ - μ)²`.
#[must_use]
pub fn weighted_variance(sample: &Sample) -> f64 {
    let mean = weighted_mean(sample);
    central_moment(sample, mean, 2)
}

/// Weighted population standard deviation.
///
/// Round-off can leave the variance slightly negative; it is clamped to zero
/// before taking the square root.
#[must_use]
pub fn weighted_std(sample: &Sample) -> f64 {
    weighted_variance(sample).max(0.0).sqrt()
}

/// Weighted third standardized moment.
///
/// Returns `0.0` when the weighted variance is not positive.
///
/// # Examples
///
/// ```
/// # use kde_cpi_stats::{descriptive::weighted_skewness, sample::Sample};
/// let symmetric = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert!(weighted_skewness(&symmetric).abs() < 1e-12);
///
/// let constant = Sample::uniform(&[2.0, 2.0, 2.0]).unwrap();
/// assert_eq!(weighted_skewness(&constant), 0.0);
/// ```
#[must_use]
pub fn weighted_skewness(sample: &Sample) -> f64 {
    standardized_moment(sample, 3).unwrap_or(0.0)
}

/// Weighted fourth standardized moment.
///
/// With [`Kurtosis::Fisher`] the result is the excess kurtosis (normal = 0).
/// Returns `0.0` when the weighted variance is not positive, in either
/// convention.
///
/// # Examples
///
/// ```
/// # use kde_cpi_stats::{descriptive::{Kurtosis, weighted_kurtosis}, sample::Sample};
/// let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert!((weighted_kurtosis(&sample, Kurtosis::Fisher) + 1.3).abs() < 1e-9);
/// assert!((weighted_kurtosis(&sample, Kurtosis::Pearson) - 1.7).abs() < 1e-9);
/// ```
#[must_use]
pub fn weighted_kurtosis(sample: &Sample, convention: Kurtosis) -> f64 {
    let Some(kurtosis) = standardized_moment(sample, 4) else {
        return 0.0;
    };
    match convention {
        Kurtosis::Fisher => kurtosis - 3.0,
        Kurtosis::Pearson => kurtosis,
    }
}

/// Kish effective sample size `1 / Σ wᵢ²` of the sample's normalized weights.
///
/// Equals the number of observations for uniform weights and approaches 1 as
/// the weight concentrates on a single observation.
#[must_use]
pub fn effective_sample_size(sample: &Sample) -> f64 {
    kish(sample.weights())
}

/// Effective sample size of raw, unnormalized weights.
///
/// # Errors
///
/// Fails with the errors of [`normalize_weights`].
///
/// # Examples
///
/// ```
/// # use kde_cpi_stats::descriptive::effective_sample_size_of;
/// assert!((effective_sample_size_of(&[2.0, 2.0, 2.0, 2.0]).unwrap() - 4.0).abs() < 1e-9);
/// assert!(effective_sample_size_of(&[0.99, 0.005, 0.005]).unwrap() < 1.1);
/// ```
pub fn effective_sample_size_of(weights: &[f64]) -> Result<f64, StatsError> {
    let weights = normalize_weights(weights, true)?;
    Ok(kish(weights.iter()))
}

fn kish<I>(normalized: I) -> f64
where
    I: Iterator<Item = f64>,
{
    1.0 / normalized.map(|w| w * w).sum::<f64>()
}

fn central_moment(sample: &Sample, mean: f64, order: i32) -> f64 {
    sample
        .points()
        .iter()
        .map(|p| p.weight * (p.value - mean).powi(order))
        .sum()
}

/// `None` when the variance is not positive.
fn standardized_moment(sample: &Sample, order: i32) -> Option<f64> {
    let mean = weighted_mean(sample);
    let variance = central_moment(sample, mean, 2);
    if variance <= 0.0 {
        return None;
    }
    let std_dev = variance.sqrt();
    Some(
        sample
            .points()
            .iter()
            .map(|p| p.weight * ((p.value - mean) / std_dev).powi(order))
            .sum(),
    )
}
