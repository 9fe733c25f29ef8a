//! Weighted Gaussian kernel density estimation.
//!
//! # Bandwidth
//!
//! [`weighted_kde_bandwidth`] is Scott's rule of thumb with an IQR guard,
//! using the effective sample size instead of the raw count:
//!
//! ```text
//! scale     = σ                      if IQR <= 0
//!           = min(σ, IQR / 1.34)     otherwise
//! bandwidth = 0.9 · scale · ESS^(-1/5)   (0 when scale <= 0)
//! ```
//!
//! # Mode
//!
//! [`weighted_kde_mode`] evaluates the density on an evenly spaced grid
//! covering the data range padded by `extend` bandwidths on both sides and
//! returns the grid point of maximum density (the first one on ties). The
//! grid resolution bounds the precision of the result. A zero bandwidth means
//! there is no density to search; the value carrying the largest weight is
//! returned instead.

use serde::{Deserialize, Serialize};

use crate::{
    StatsError,
    descriptive::{effective_sample_size, weighted_std},
    percentiles::quantile_sorted,
    sample::Sample,
};

/// Default number of grid points evaluated by the mode search.
pub const DEFAULT_GRID_POINTS: usize = 2048;
/// Default padding beyond the data range, in bandwidths.
pub const DEFAULT_EXTEND: f64 = 3.0;
/// Ratio between the interquartile range and σ of a normal distribution.
pub const IQR_TO_STD: f64 = 1.34;
/// Leading factor of the bandwidth rule.
pub const SCOTT_FACTOR: f64 = 0.9;

const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Grid used to evaluate the density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KdeConfig {
    /// Number of evenly spaced evaluation points.
    pub grid_points: usize,
    /// Padding beyond `[min, max]` of the data, in bandwidths.
    pub extend: f64,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            grid_points: DEFAULT_GRID_POINTS,
            extend: DEFAULT_EXTEND,
        }
    }
}

impl KdeConfig {
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.grid_points == 0 || !self.extend.is_finite() || self.extend < 0.0 {
            return Err(StatsError::InvalidKdeConfig {
                grid_points: self.grid_points,
                extend: self.extend,
            });
        }
        Ok(())
    }
}

/// Standard normal density.
#[must_use]
pub fn gaussian_kernel(u: f64) -> f64 {
    (-0.5 * u * u).exp() * FRAC_1_SQRT_2PI
}

/// Weighted bandwidth rule; `0.0` signals a sample without spread.
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{kde::weighted_kde_bandwidth, sample::Sample};
///
/// let constant = Sample::uniform(&[0.02, 0.02, 0.02]).unwrap();
/// assert_eq!(weighted_kde_bandwidth(&constant), 0.0);
///
/// let spread = Sample::uniform(&[-0.02, 0.01, 0.03, 0.03, 0.05]).unwrap();
/// assert!(weighted_kde_bandwidth(&spread) > 0.0);
/// ```
#[must_use]
pub fn weighted_kde_bandwidth(sample: &Sample) -> f64 {
    let std_dev = weighted_std(sample);
    let sorted = sample.sorted();
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    let scale = if iqr <= 0.0 {
        std_dev
    } else {
        std_dev.min(iqr / IQR_TO_STD)
    };
    if scale <= 0.0 {
        return 0.0;
    }
    let ess = effective_sample_size(sample);
    SCOTT_FACTOR * scale * ess.powf(-1.0 / 5.0)
}

/// Location of the maximum of the weighted Gaussian KDE.
///
/// `bandwidth` overrides the bandwidth rule when given. A bandwidth of zero or
/// less returns the value of the heaviest observation.
///
/// # Errors
///
/// * [`StatsError::InvalidBandwidth`] - the explicit bandwidth is NaN, infinite,
///   or so large that the padded grid overflows
/// * [`StatsError::InvalidKdeConfig`] - the grid configuration is unusable
///
/// # Examples
///
/// ```
/// use kde_cpi_stats::{kde::{KdeConfig, weighted_kde_mode}, sample::Sample};
///
/// let sample = Sample::uniform(&[0.01, 0.02, 0.02, 0.021, 0.09]).unwrap();
/// let mode = weighted_kde_mode(&sample, None, &KdeConfig::default()).unwrap();
/// assert!((mode - 0.02).abs() < 0.01);
///
/// // Zero bandwidth: the heaviest value wins.
/// let sample = Sample::new(&[1.0, 2.0, 3.0], &[1.0, 5.0, 1.0]).unwrap();
/// assert_eq!(weighted_kde_mode(&sample, Some(0.0), &KdeConfig::default()).unwrap(), 2.0);
/// ```
pub fn weighted_kde_mode(
    sample: &Sample,
    bandwidth: Option<f64>,
    config: &KdeConfig,
) -> Result<f64, StatsError> {
    config.validate()?;
    let bandwidth = resolve_bandwidth(sample, bandwidth)?;
    if bandwidth <= 0.0 {
        return Ok(sample.heaviest().value);
    }

    let grid = padded_grid(sample, bandwidth, config)?;
    let mut best_x = grid[0];
    let mut best_density = f64::NEG_INFINITY;
    for &x in &grid {
        let density = density_at(sample, x, bandwidth);
        if density > best_density {
            best_x = x;
            best_density = density;
        }
    }
    Ok(best_x)
}

/// A weighted KDE evaluated on the grid used by [`weighted_kde_mode`].
///
/// This is the curve a plotting layer draws next to the summary markers; it
/// shares the kernel, the bandwidth and the grid with the mode search, so the
/// highest point of the curve is the reported mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    /// Bandwidth the curve was evaluated with.
    pub bandwidth: f64,
    /// Evaluation points, ascending.
    pub grid: Vec<f64>,
    /// Density at each grid point.
    pub density: Vec<f64>,
}

impl DensityCurve {
    /// Evaluates the density of a sample.
    ///
    /// With a bandwidth of zero or less the curve is a single spike: the grid
    /// spans `[min, max]`, every density is `0.0` except `1.0` at the grid
    /// point closest to the heaviest value.
    ///
    /// # Examples
    ///
    /// ```
    /// use kde_cpi_stats::{kde::{DensityCurve, KdeConfig, weighted_kde_mode}, sample::Sample};
    ///
    /// let sample = Sample::uniform(&[0.0, 0.1, 0.15, 0.4]).unwrap();
    /// let config = KdeConfig { grid_points: 256, ..KdeConfig::default() };
    /// let curve = DensityCurve::evaluate(&sample, None, &config).unwrap();
    /// let mode = weighted_kde_mode(&sample, Some(curve.bandwidth), &config).unwrap();
    /// assert_eq!(curve.peak(), Some((mode, curve.density.iter().copied().fold(0.0, f64::max))));
    /// ```
    pub fn evaluate(
        sample: &Sample,
        bandwidth: Option<f64>,
        config: &KdeConfig,
    ) -> Result<Self, StatsError> {
        config.validate()?;
        let bandwidth = resolve_bandwidth(sample, bandwidth)?;
        if bandwidth <= 0.0 {
            let grid = linspace(sample.min(), sample.max(), config.grid_points);
            let target = sample.heaviest().value;
            let mut density = vec![0.0; grid.len()];
            let closest = grid
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
                .map_or(0, |(idx, _)| idx);
            density[closest] = 1.0;
            return Ok(Self {
                bandwidth,
                grid,
                density,
            });
        }

        let grid = padded_grid(sample, bandwidth, config)?;
        let density = grid
            .iter()
            .map(|&x| density_at(sample, x, bandwidth))
            .collect();
        Ok(Self {
            bandwidth,
            grid,
            density,
        })
    }

    /// Returns an iterator over `(x, density)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.grid.iter().copied().zip(self.density.iter().copied())
    }

    /// The first point of maximum density.
    #[must_use]
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.iter()
            .fold(None, |best: Option<(f64, f64)>, (x, d)| match best {
                Some((_, best_d)) if d <= best_d => best,
                _ => Some((x, d)),
            })
    }
}

fn resolve_bandwidth(sample: &Sample, bandwidth: Option<f64>) -> Result<f64, StatsError> {
    match bandwidth {
        Some(bandwidth) if !bandwidth.is_finite() => {
            Err(StatsError::InvalidBandwidth { bandwidth })
        }
        Some(bandwidth) => Ok(bandwidth),
        None => Ok(weighted_kde_bandwidth(sample)),
    }
}

fn density_at(sample: &Sample, x: f64, bandwidth: f64) -> f64 {
    let sum = sample
        .points()
        .iter()
        .map(|p| p.weight * gaussian_kernel((x - p.value) / bandwidth))
        .sum::<f64>();
    sum / bandwidth
}

/// The grid `[min - extend·h, max + extend·h]`.
///
/// A bandwidth so large that the bounds (or the span between them) overflow
/// is rejected as [`StatsError::InvalidBandwidth`].
fn padded_grid(
    sample: &Sample,
    bandwidth: f64,
    config: &KdeConfig,
) -> Result<Vec<f64>, StatsError> {
    let padding = config.extend * bandwidth;
    let (start, end) = (sample.min() - padding, sample.max() + padding);
    if !(start.is_finite() && end.is_finite() && (end - start).is_finite()) {
        return Err(StatsError::InvalidBandwidth { bandwidth });
    }
    Ok(linspace(start, end, config.grid_points))
}

/// `n` evenly spaced points from `start` to `end` inclusive.
#[expect(clippy::cast_precision_loss)]
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid = (0..n).map(|i| start + i as f64 * step).collect::<Vec<_>>();
            grid[n - 1] = end;
            grid
        }
    }
}
