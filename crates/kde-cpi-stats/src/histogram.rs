//! Equal-width histograms of weighted samples.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Default number of bins for component histograms.
pub const DEFAULT_BINS: usize = 30;

/// A weighted histogram of a sample.
///
/// The observed range `[min, max]` is split into equal-width bins and every
/// observation adds its normalized weight to the bin containing it, so the
/// bin weights of a histogram sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

/// A single bin in a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// The range of values covered by this bin (inclusive start, exclusive end).
    /// The last bin also includes its end.
    pub range: Range<f64>,
    /// Total normalized weight of the values in this bin.
    pub weight: f64,
}

impl Histogram {
    /// Creates a weighted histogram with `num_bins` equal-width bins.
    ///
    /// A sample without spread gets the range `[v - 0.5, v + 0.5]` around its
    /// single value. `num_bins == 0` yields an empty histogram.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kde_cpi_stats::{histogram::Histogram, sample::Sample};
    /// let sample = Sample::new(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 1.0, 1.0, 1.0, 4.0]).unwrap();
    /// let histogram = Histogram::new(&sample, 4);
    ///
    /// assert_eq!(histogram.bins.len(), 4);
    /// assert_eq!(histogram.bins[0].range, 0.0..1.0);
    /// // The maximum lands in the last bin together with 3.0.
    /// assert!((histogram.bins[3].weight - 0.625).abs() < 1e-12);
    /// ```
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    #[must_use]
    pub fn new(sample: &Sample, num_bins: usize) -> Self {
        if num_bins == 0 {
            return Self { bins: vec![] };
        }

        let (mut lower, mut upper) = (sample.min(), sample.max());
        if upper - lower <= 0.0 {
            lower -= 0.5;
            upper += 0.5;
        }
        let width = (upper - lower) / num_bins as f64;

        let mut bins = (0..num_bins)
            .map(|idx| {
                // Recompute each edge from the lower bound to avoid accumulating error.
                let start = lower + idx as f64 * width;
                let end = if idx + 1 == num_bins {
                    upper
                } else {
                    lower + (idx + 1) as f64 * width
                };
                HistogramBin {
                    range: start..end,
                    weight: 0.0,
                }
            })
            .collect::<Vec<_>>();

        for point in sample.points() {
            let position = ((point.value - lower) / width).floor();
            let idx = if position <= 0.0 {
                0
            } else {
                (position as usize).min(num_bins - 1)
            };
            bins[idx].weight += point.weight;
        }

        Self { bins }
    }

    /// Sum of all bin weights; one up to rounding.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.bins.iter().map(|bin| bin.weight).sum()
    }
}
