//! Weight normalization and value ordering.
//!
//! A [`Sample`] pairs every observation with its weight, so values and
//! weights can never drift out of alignment: sorting moves both together and
//! length mismatches are rejected once, at construction.
//!
//! # Examples
//!
//! ```
//! use kde_cpi_stats::sample::{Sample, normalize_weights};
//!
//! let weights = normalize_weights(&[1.0, 2.0, 3.0, 2.0], true).unwrap();
//! assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
//!
//! let sample = Sample::new(&[3.0, 1.0, 2.0], &[10.0, 20.0, 30.0]).unwrap();
//! let sorted = sample.sorted();
//! assert_eq!(sorted.iter().map(|p| p.value).collect::<Vec<_>>(), [1.0, 2.0, 3.0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::StatsError;

/// A single observation together with its weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

impl WeightedValue {
    #[must_use]
    pub const fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Weights rescaled to sum to one.
///
/// All entries are non-negative when produced with `ensure_positive = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWeights(Vec<f64>);

impl NormalizedWeights {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// Normalizes weights so they sum to one.
///
/// # Arguments
///
/// * `weights` - Raw, possibly unnormalized weights
/// * `ensure_positive` - Reject negative entries when `true`
///
/// # Errors
///
/// * [`StatsError::NegativeWeight`] - a weight is negative and `ensure_positive` is set
/// * [`StatsError::NonPositiveTotalWeight`] - the weights sum to zero, a negative
///   number, or a non-finite number (this includes empty input)
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{StatsError, sample::normalize_weights};
///
/// let weights = normalize_weights(&[1.0, 3.0], true).unwrap();
/// assert_eq!(weights.as_slice(), &[0.25, 0.75]);
///
/// assert!(matches!(
///     normalize_weights(&[0.0, 0.0, 0.0], true),
///     Err(StatsError::NonPositiveTotalWeight { .. })
/// ));
/// ```
pub fn normalize_weights(
    weights: &[f64],
    ensure_positive: bool,
) -> Result<NormalizedWeights, StatsError> {
    if ensure_positive && let Some(index) = weights.iter().position(|w| *w < 0.0) {
        return Err(StatsError::NegativeWeight { index });
    }
    let total = weights.iter().sum::<f64>();
    if !total.is_finite() || total <= 0.0 {
        return Err(StatsError::NonPositiveTotalWeight { total });
    }
    Ok(NormalizedWeights(
        weights.iter().map(|w| w / total).collect(),
    ))
}

/// Returns the points sorted ascending by value.
///
/// The sort is stable: points with equal values keep their input order, and
/// each weight stays attached to its value.
#[must_use]
pub fn sort_by_values(points: &[WeightedValue]) -> Vec<WeightedValue> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.value.total_cmp(&b.value));
    sorted
}

/// Collects any sequence of numbers into a dense `f64` vector.
///
/// No validation is performed.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::sample::collect_values;
///
/// assert_eq!(collect_values([1_u32, 2, 3]), vec![1.0, 2.0, 3.0]);
/// assert_eq!(collect_values(vec![0.5_f32]), vec![0.5]);
/// ```
pub fn collect_values<I, T>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = T>,
    T: Into<f64>,
{
    values.into_iter().map(Into::into).collect()
}

/// Running sum of the given weights.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::sample::cumulative_weights;
///
/// assert_eq!(cumulative_weights([1.0, 2.0, 3.0, 4.0]), vec![1.0, 3.0, 6.0, 10.0]);
/// ```
pub fn cumulative_weights<I>(weights: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    weights
        .into_iter()
        .scan(0.0, |acc, w| {
            *acc += w;
            Some(*acc)
        })
        .collect()
}

/// A non-empty set of finite observations with normalized weights.
///
/// Constructing a `Sample` is the validation step shared by every statistic
/// in this crate. The points keep their input order; use [`Sample::sorted`]
/// for an ascending view.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    points: Vec<WeightedValue>,
}

impl Sample {
    /// Builds a sample from parallel value and weight slices.
    ///
    /// # Errors
    ///
    /// * [`StatsError::ShapeMismatch`] - the slices differ in length
    /// * [`StatsError::EmptySample`] - there are no values
    /// * [`StatsError::NonFiniteValue`] - a value is NaN or infinite
    /// * Any error of [`normalize_weights`]
    pub fn new(values: &[f64], weights: &[f64]) -> Result<Self, StatsError> {
        if values.len() != weights.len() {
            return Err(StatsError::ShapeMismatch {
                values: values.len(),
                weights: weights.len(),
            });
        }
        if values.is_empty() {
            return Err(StatsError::EmptySample);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(StatsError::NonFiniteValue { index });
        }
        let weights = normalize_weights(weights, true)?;
        let points = values
            .iter()
            .zip(weights.iter())
            .map(|(&value, weight)| WeightedValue::new(value, weight))
            .collect();
        Ok(Self { points })
    }

    /// Builds a sample where every value carries the same weight.
    ///
    /// # Examples
    ///
    /// ```
    /// use kde_cpi_stats::sample::Sample;
    ///
    /// let sample = Sample::uniform(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert!(sample.weights().all(|w| (w - 0.25).abs() < 1e-12));
    /// ```
    pub fn uniform(values: &[f64]) -> Result<Self, StatsError> {
        Self::new(values, &vec![1.0; values.len()])
    }

    /// Builds a sample from already paired points, normalizing their weights.
    pub fn from_points<I>(points: I) -> Result<Self, StatsError>
    where
        I: IntoIterator<Item = WeightedValue>,
    {
        let (values, weights): (Vec<f64>, Vec<f64>) =
            points.into_iter().map(|p| (p.value, p.weight)).unzip();
        Self::new(&values, &weights)
    }

    #[must_use]
    pub fn points(&self) -> &[WeightedValue] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a sample cannot be constructed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.weight)
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.values().fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.values().fold(f64::NEG_INFINITY, f64::max)
    }

    /// The points in ascending value order. See [`sort_by_values`].
    #[must_use]
    pub fn sorted(&self) -> Vec<WeightedValue> {
        sort_by_values(&self.points)
    }

    /// The first point carrying the largest weight.
    #[must_use]
    pub fn heaviest(&self) -> WeightedValue {
        let mut best = self.points[0];
        for point in &self.points[1..] {
            if point.weight > best.weight {
                best = *point;
            }
        }
        best
    }
}
