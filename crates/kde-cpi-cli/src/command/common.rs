use std::path::Path;

use anyhow::{Context, bail};
use kde_cpi_data::{
    files::{DataSelection, FlatFileSource},
    growth::{GrowthComponent, ObservationCache, compute_growth_components},
    grouping::GroupBy,
    model::Dataset,
    period::{Month, format_period_label},
    report::GroupSummary,
};
use kde_cpi_stats::{
    StatsError,
    kde::{DEFAULT_GRID_POINTS, KdeConfig},
    percentiles::DEFAULT_TRIM,
    summary::SummaryOptions,
};
use tracing::warn;

/// Which flat files to read.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SourceArg {
    /// Observation partition to load (repeatable); all known partitions by default
    #[arg(long = "data-file", value_name = "NAME")]
    data_files: Vec<String>,
    /// Load only `cu.data.0.Current`
    #[arg(long, conflicts_with = "data_files")]
    current_only: bool,
}

impl SourceArg {
    pub(crate) fn selection(&self) -> DataSelection {
        DataSelection::from_flags(self.current_only, &self.data_files)
    }

    pub(crate) fn load(&self, data_dir: &Path) -> anyhow::Result<Dataset> {
        FlatFileSource::new(data_dir)
            .load_dataset(&self.selection())
            .with_context(|| format!("Failed to load CPI flat files from {}", data_dir.display()))
    }
}

/// How growth components are selected and grouped.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ComponentArg {
    /// Grouping dimension: display-level, item-code-length or series-name-length
    #[arg(long, default_value = "display-level")]
    group_by: GroupBy,
    /// Keep only items flagged selectable (default)
    #[arg(long, overrides_with = "include_unselectable")]
    selectable_only: bool,
    /// Keep unselectable items too
    #[arg(long, overrides_with = "selectable_only")]
    include_unselectable: bool,
}

impl ComponentArg {
    pub(crate) fn group_by(&self) -> GroupBy {
        self.group_by.normalize()
    }

    pub(crate) fn selectable_only(&self) -> bool {
        self.selectable_only || !self.include_unselectable
    }
}

/// Tuning of the weighted statistics.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummaryArg {
    /// KDE bandwidth; derived from the data when omitted or 0
    #[arg(long)]
    bandwidth: Option<f64>,
    /// Fraction of weight trimmed from each tail for the trimmed mean
    #[arg(long, default_value_t = DEFAULT_TRIM)]
    trim: f64,
    /// Number of grid points of the KDE mode search
    #[arg(long, default_value_t = DEFAULT_GRID_POINTS)]
    grid_points: usize,
}

impl SummaryArg {
    pub(crate) fn options(&self) -> anyhow::Result<SummaryOptions> {
        let options = SummaryOptions {
            trim: self.trim,
            bandwidth: self.bandwidth,
            kde: KdeConfig {
                grid_points: self.grid_points,
                ..KdeConfig::default()
            },
        };
        if !(0.0..0.5).contains(&options.trim) {
            return Err(StatsError::InvalidTrim { trim: options.trim }).context("Invalid --trim");
        }
        if let Some(bandwidth) = options.bandwidth.filter(|h| !h.is_finite()) {
            return Err(StatsError::InvalidBandwidth { bandwidth }).context("Invalid --bandwidth");
        }
        options.kde.validate().context("Invalid --grid-points")?;
        Ok(options)
    }
}

/// Growth components measured at `date` (`YYYY-MM`), or at each series'
/// latest period when `date` is `None`.
///
/// Returns the label of the measured month along with the components.
pub(crate) fn month_components(
    dataset: &Dataset,
    date: Option<&str>,
    selectable_only: bool,
) -> anyhow::Result<(String, Vec<GrowthComponent>)> {
    let month = date.map(Month::parse).transpose().context("Invalid --date")?;
    let target = month.map(Month::key);

    let cache = ObservationCache::build(dataset);
    let label = match (month, cache.latest_period()) {
        (Some(month), _) => month.to_string(),
        (None, Some(latest)) => format_period_label(latest),
        (None, None) => "latest".to_owned(),
    };

    let components = compute_growth_components(dataset, &cache, selectable_only, target.as_ref());
    if components.is_empty() {
        bail!("No growth components available for {label}");
    }
    Ok((label, components))
}

/// Summarizes every group, skipping (with a warning) those whose statistics
/// cannot be computed.
pub(crate) fn summarize_groups(
    groups: &[(String, Vec<GrowthComponent>)],
    options: &SummaryOptions,
) -> Vec<GroupSummary> {
    groups
        .iter()
        .filter_map(
            |(label, components)| match GroupSummary::new(label, components, options) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(group = %label, error = %err, "skipping group");
                    None
                }
            },
        )
        .collect()
}

/// Writes a small flat-file directory: five U.S. city average series with
/// May and June observations for 2023 and 2024.
#[cfg(test)]
pub(crate) fn write_fixture(dir: &Path) {
    use kde_cpi_data::files::{AREA_FILE, FOOTNOTE_FILE, ITEM_FILE, PERIOD_FILE, SERIES_FILE};

    let items = [
        ("SA0", "All items", 0, "T"),
        ("SAF1", "Food", 1, "F"),
        ("SAF11", "Food at home", 2, "T"),
        ("SEHA", "Rent of primary residence", 2, "T"),
        ("SETB01", "Gasoline (all types)", 3, "T"),
    ];
    let values = [
        ("SA0", [300.0, 301.0, 309.0, 310.0]),
        ("SAF1", [250.0, 250.0, 254.0, 255.0]),
        ("SAF11", [200.0, 200.0, 202.0, 204.0]),
        ("SEHA", [400.0, 400.0, 416.0, 420.0]),
        ("SETB01", [100.0, 100.0, 98.0, 95.0]),
    ];

    let mut item_file = "item_code\titem_name\tdisplay_level\tselectable\tsort_sequence\n".to_owned();
    let mut series_file =
        "series_id\tarea_code\titem_code\tseasonal\tperiodicity_code\tbase_code\tbase_period\tseries_title\n"
            .to_owned();
    for (sort, (code, name, level, selectable)) in items.into_iter().enumerate() {
        item_file.push_str(&format!("{code}\t{name}\t{level}\t{selectable}\t{sort}\n"));
        series_file.push_str(&format!(
            "CUUR0000{code}\t0000\t{code}\tU\tR\tS\t1982-84=100\t{name} in U.S. city average\n"
        ));
    }
    let mut data_file = "series_id\tyear\tperiod\tvalue\tfootnote_codes\n".to_owned();
    for (code, [may_2023, june_2023, may_2024, june_2024]) in values {
        for (year, period, value) in [
            (2023, "M05", may_2023),
            (2023, "M06", june_2023),
            (2024, "M05", may_2024),
            (2024, "M06", june_2024),
        ] {
            data_file.push_str(&format!("CUUR0000{code}\t{year}\t{period}\t{value:.3}\t\n"));
        }
    }

    let files = [
        (AREA_FILE, "area_code\tarea_name\n0000\tU.S. city average\n".to_owned()),
        (ITEM_FILE, item_file),
        (
            PERIOD_FILE,
            "period\tperiod_abbr\tperiod_name\nM05\tMAY\tMay\nM06\tJUN\tJune\n".to_owned(),
        ),
        (FOOTNOTE_FILE, "footnote_code\tfootnote_text\n".to_owned()),
        (SERIES_FILE, series_file),
        ("cu.data.0.Current", data_file),
    ];
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
}
