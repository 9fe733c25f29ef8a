//! Report payloads: per-group summaries, panel rows and plot data.
//!
//! Every growth component enters the statistics with the same weight.

use kde_cpi_stats::{
    StatsError,
    percentiles::Percentiles,
    sample::Sample,
    summary::{StatSummary, SummaryOptions},
};
use serde::{Deserialize, Serialize};

use crate::{files::SOURCE_NAME, growth::GrowthComponent};

/// Number of components listed in [`GroupSummary::examples`].
pub const EXAMPLE_COUNT: usize = 5;

/// Percentile points reported for every group.
pub const REPORTED_PERCENTILES: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 90.0];

/// Formats a fraction as a percentage with two decimals.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::report::format_percent;
/// assert_eq!(format_percent(0.0325), "3.25%");
/// assert_eq!(format_percent(-0.001), "-0.10%");
/// ```
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Turns a label into a name safe for a directory.
///
/// Characters other than ASCII alphanumerics, `-` and `_` become `_`, and
/// leading/trailing underscores are stripped. An empty result becomes
/// `group`.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::report::sanitize_label;
/// assert_eq!(sanitize_label("5 chars"), "5_chars");
/// assert_eq!(sanitize_label("  "), "group");
/// ```
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    let safe = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    let trimmed = safe.trim_matches('_');
    if trimmed.is_empty() {
        "group".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Equally weighted sample of component values.
pub fn component_sample(components: &[GrowthComponent]) -> Result<Sample, StatsError> {
    let values = components.iter().map(|c| c.value).collect::<Vec<_>>();
    Sample::uniform(&values)
}

/// [`StatSummary`] with percent strings for the location statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsPayload {
    pub weighted_mean: f64,
    pub weighted_mean_percent: String,
    pub weighted_median: f64,
    pub weighted_median_percent: String,
    pub trimmed_mean: f64,
    pub trimmed_mean_percent: String,
    pub weighted_std: f64,
    pub weighted_skewness: f64,
    pub weighted_kurtosis: f64,
    pub weighted_kde_bandwidth: f64,
    pub weighted_kde_mode: f64,
    pub weighted_kde_mode_percent: String,
    pub effective_sample_size: f64,
}

impl From<&StatSummary> for StatsPayload {
    fn from(stats: &StatSummary) -> Self {
        Self {
            weighted_mean: stats.weighted_mean,
            weighted_mean_percent: format_percent(stats.weighted_mean),
            weighted_median: stats.weighted_median,
            weighted_median_percent: format_percent(stats.weighted_median),
            trimmed_mean: stats.trimmed_mean,
            trimmed_mean_percent: format_percent(stats.trimmed_mean),
            weighted_std: stats.weighted_std,
            weighted_skewness: stats.weighted_skewness,
            weighted_kurtosis: stats.weighted_kurtosis,
            weighted_kde_bandwidth: stats.weighted_kde_bandwidth,
            weighted_kde_mode: stats.weighted_kde_mode,
            weighted_kde_mode_percent: format_percent(stats.weighted_kde_mode),
            effective_sample_size: stats.effective_sample_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: f64,
    pub value: f64,
}

/// A component listed as an example of its group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentExample {
    pub series_id: String,
    pub item_code: String,
    pub item_name: String,
    pub series_title: String,
    pub yoy: f64,
    pub yoy_percent: String,
}

impl From<&GrowthComponent> for ComponentExample {
    fn from(component: &GrowthComponent) -> Self {
        Self {
            series_id: component.series_id.clone(),
            item_code: component.item_code.clone(),
            item_name: component.item_name.clone(),
            series_title: component.series_title.clone(),
            yoy: component.value,
            yoy_percent: format_percent(component.value),
        }
    }
}

/// Summary of one group of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub stats: StatsPayload,
    pub percentiles: Vec<PercentilePoint>,
    /// The components with the largest absolute change.
    pub examples: Vec<ComponentExample>,
}

impl GroupSummary {
    /// Summarizes a group of components.
    ///
    /// # Errors
    ///
    /// [`StatsError::EmptySample`] for an empty group, or any error of
    /// [`StatSummary::from_sample`].
    pub fn new(
        label: &str,
        components: &[GrowthComponent],
        options: &SummaryOptions,
    ) -> Result<Self, StatsError> {
        let sample = component_sample(components)?;
        let stats = StatSummary::from_sample(&sample, options)?;
        Self::from_parts(label, components, &sample, &stats)
    }

    /// Builds the payload from statistics already computed for `sample`.
    pub fn from_parts(
        label: &str,
        components: &[GrowthComponent],
        sample: &Sample,
        stats: &StatSummary,
    ) -> Result<Self, StatsError> {
        let percentiles = Percentiles::new(sample, &REPORTED_PERCENTILES)?
            .iter()
            .map(|(percentile, value)| PercentilePoint { percentile, value })
            .collect();

        let mut ranked = components.iter().collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
        let examples = ranked
            .into_iter()
            .take(EXAMPLE_COUNT)
            .map(ComponentExample::from)
            .collect();

        Ok(Self {
            label: label.to_owned(),
            count: components.len(),
            stats: StatsPayload::from(stats),
            percentiles,
            examples,
        })
    }
}

/// One `(date, group)` row of a panel export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    pub date: String,
    pub group_label: String,
    pub group_by: String,
    pub selectable_only: bool,
    /// Where the observations came from; always [`SOURCE_NAME`].
    pub source: String,
    pub count: usize,
    pub mode: f64,
    pub mode_percent: String,
    pub mean: f64,
    pub median: f64,
    pub trimmed_mean: f64,
    pub std: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub effective_sample_size: f64,
}

impl PanelRow {
    #[must_use]
    pub fn new(date: &str, group_by: &str, selectable_only: bool, summary: &GroupSummary) -> Self {
        let stats = &summary.stats;
        Self {
            date: date.to_owned(),
            group_label: summary.label.clone(),
            group_by: group_by.to_owned(),
            selectable_only,
            source: SOURCE_NAME.to_owned(),
            count: summary.count,
            mode: stats.weighted_kde_mode,
            mode_percent: stats.weighted_kde_mode_percent.clone(),
            mean: stats.weighted_mean,
            median: stats.weighted_median,
            trimmed_mean: stats.trimmed_mean,
            std: stats.weighted_std,
            skewness: stats.weighted_skewness,
            kurtosis: stats.weighted_kurtosis,
            effective_sample_size: stats.effective_sample_size,
        }
    }
}

/// A vertical reference line drawn over the density curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub value: f64,
    pub label: String,
}

/// Reference lines and a suggested x-axis range for a group's plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotMarkers {
    pub markers: Vec<Marker>,
    pub x_min: f64,
    pub x_max: f64,
}

impl PlotMarkers {
    /// Mode, mean and median markers, with axis limits that clip the
    /// outer 0.5% of the values.
    #[must_use]
    pub fn new(stats: &StatSummary, values: &[f64]) -> Self {
        let marker = |name: &str, title: &str, value: f64| Marker {
            name: name.to_owned(),
            value,
            label: format!("{title} ≈ {}", format_percent(value)),
        };
        let (x_min, x_max) = axis_limits(values, 0.995, 0.05);
        Self {
            markers: vec![
                marker("mode", "Mode", stats.weighted_kde_mode),
                marker("mean", "Mean", stats.weighted_mean),
                marker("median", "Median", stats.weighted_median),
            ],
            x_min,
            x_max,
        }
    }
}

/// Axis range covering the central `clip` share of `values`, padded by
/// `padding` of its span and never reaching further than one span beyond the
/// data.
fn axis_limits(values: &[f64], clip: f64, padding: f64) -> (f64, f64) {
    let mut sorted = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect::<Vec<_>>();
    if sorted.is_empty() {
        return (-1.0, 1.0);
    }
    sorted.sort_by(f64::total_cmp);

    let tail = (1.0 - clip.clamp(0.5, 0.9999)) / 2.0;
    let (mut lower, mut upper) = (linear_quantile(&sorted, tail), linear_quantile(&sorted, 1.0 - tail));
    let (data_min, data_max) = (sorted[0], sorted[sorted.len() - 1]);
    let mut span = upper - lower;
    if span <= 0.0 {
        span = lower.abs().max(upper.abs()).max(1.0);
        lower -= span * 0.5;
        upper += span * 0.5;
    } else {
        lower -= span * padding;
        upper += span * padding;
    }
    lower = lower.max(data_min - span);
    upper = upper.min(data_max + span);
    if lower >= upper {
        (lower - 1.0, upper + 1.0)
    } else {
        (lower, upper)
    }
}

/// Unweighted quantile of sorted values, interpolating between order statistics.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = (below + 1).min(sorted.len() - 1);
    let t = position - below as f64;
    sorted[below] + t * (sorted[above] - sorted[below])
}
