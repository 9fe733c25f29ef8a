use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use kde_cpi_data::{
    growth::GrowthComponent,
    grouping::group_components,
    model::Dataset,
    report::{GroupSummary, PlotMarkers, component_sample, sanitize_label},
};
use kde_cpi_stats::{
    histogram::{DEFAULT_BINS, Histogram},
    kde::DensityCurve,
    summary::{StatSummary, SummaryOptions},
};
use serde::Serialize;
use tracing::{info, warn};

use super::{
    GlobalArgs,
    common::{ComponentArg, SourceArg, SummaryArg, month_components},
};
use crate::util::{Output, create_unique_dir};

const SUMMARY_FILE: &str = "summary.json";
const DENSITY_FILE: &str = "density.csv";
const HISTOGRAM_FILE: &str = "histogram.csv";
const MARKERS_FILE: &str = "markers.json";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Month to measure (`YYYY-MM`); each series' latest month by default
    #[arg(long)]
    date: Option<String>,
    #[clap(flatten)]
    source: SourceArg,
    #[clap(flatten)]
    components: ComponentArg,
    #[clap(flatten)]
    summary: SummaryArg,
    /// Directory under which the analysis directory is created
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,
    /// Number of histogram bins
    #[arg(long, default_value_t = DEFAULT_BINS)]
    bins: usize,
}

/// Paths of a group's files, relative to the analysis directory.
#[derive(Debug, Clone, Serialize)]
struct GroupFiles {
    summary: String,
    density: String,
    histogram: String,
    markers: String,
}

#[derive(Debug, Clone, Serialize)]
struct GroupReport {
    #[serde(flatten)]
    summary: GroupSummary,
    directory: String,
    files: GroupFiles,
}

#[derive(Debug, Clone, Serialize)]
struct AnalysisIndex {
    generated_at: DateTime<Utc>,
    date: String,
    group_by: String,
    selectable_only: bool,
    components_total: usize,
    group_count: usize,
    output_dir: PathBuf,
    groups: Vec<GroupReport>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct DensityRow {
    x: f64,
    density: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct HistogramRow {
    bin_start: f64,
    bin_end: f64,
    weight: f64,
}

pub(crate) fn run(global: &GlobalArgs, arg: &AnalyzeArg) -> anyhow::Result<()> {
    if arg.bins == 0 {
        bail!("--bins must be at least 1");
    }
    let dataset = arg.source.load(&global.data_dir)?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let output_dir = create_unique_dir(
        &arg.output_dir,
        &arg.components.group_by().slug(),
        &timestamp,
    )?;

    let index = write_analysis(&dataset, arg, &output_dir)?;
    info!(
        output_dir = %output_dir.display(),
        groups = index.group_count,
        components = index.components_total,
        "wrote analysis"
    );
    println!(
        "Wrote {} groups to {}",
        index.group_count,
        output_dir.display()
    );
    Ok(())
}

fn write_analysis(
    dataset: &Dataset,
    arg: &AnalyzeArg,
    output_dir: &Path,
) -> anyhow::Result<AnalysisIndex> {
    let options = arg.summary.options()?;
    let group_by = arg.components.group_by();
    let selectable_only = arg.components.selectable_only();
    let (date, components) = month_components(dataset, arg.date.as_deref(), selectable_only)?;

    let mut groups = vec![];
    for (label, members) in group_components(&components, group_by) {
        match write_group(output_dir, &label, &members, &options, arg.bins) {
            Ok(report) => groups.push(report),
            Err(err) => warn!(group = %label, error = %format!("{err:#}"), "skipping group"),
        }
    }
    if groups.is_empty() {
        bail!("No group statistics could be computed for {date}");
    }

    let index = AnalysisIndex {
        generated_at: Utc::now(),
        date,
        group_by: group_by.to_string(),
        selectable_only,
        components_total: components.len(),
        group_count: groups.len(),
        output_dir: output_dir.to_owned(),
        groups,
    };
    Output::create(output_dir.join(SUMMARY_FILE))?.write_json(&index)?;
    Ok(index)
}

fn write_group(
    output_dir: &Path,
    label: &str,
    components: &[GrowthComponent],
    options: &SummaryOptions,
    bins: usize,
) -> anyhow::Result<GroupReport> {
    let sample = component_sample(components)?;
    let stats = StatSummary::from_sample(&sample, options)?;
    let summary = GroupSummary::from_parts(label, components, &sample, &stats)?;

    let directory = format!("group_{}", sanitize_label(label));
    let files = GroupFiles {
        summary: format!("{directory}/{SUMMARY_FILE}"),
        density: format!("{directory}/{DENSITY_FILE}"),
        histogram: format!("{directory}/{HISTOGRAM_FILE}"),
        markers: format!("{directory}/{MARKERS_FILE}"),
    };

    let curve = DensityCurve::evaluate(&sample, Some(stats.weighted_kde_bandwidth), &options.kde)
        .with_context(|| format!("Failed to evaluate density of group {label}"))?;
    Output::create(output_dir.join(&files.density))?
        .write_csv(curve.iter().map(|(x, density)| DensityRow { x, density }))?;

    let histogram = Histogram::new(&sample, bins);
    Output::create(output_dir.join(&files.histogram))?.write_csv(histogram.bins.iter().map(
        |bin| HistogramRow {
            bin_start: bin.range.start,
            bin_end: bin.range.end,
            weight: bin.weight,
        },
    ))?;

    let values = sample.values().collect::<Vec<_>>();
    Output::create(output_dir.join(&files.markers))?
        .write_json(PlotMarkers::new(&stats, &values))?;

    let report = GroupReport {
        summary,
        directory,
        files,
    };
    Output::create(output_dir.join(&report.files.summary))?.write_json(&report)?;
    Ok(report)
}
