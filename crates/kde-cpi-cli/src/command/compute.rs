use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Utc};
use kde_cpi_data::{
    files::SOURCE_NAME, grouping::group_components, model::Dataset, report::GroupSummary,
};
use serde::Serialize;
use tracing::info;

use super::{
    GlobalArgs,
    common::{ComponentArg, SourceArg, SummaryArg, month_components, summarize_groups},
};
use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ComputeArg {
    /// Month to measure (`YYYY-MM`); each series' latest month by default
    #[arg(long)]
    date: Option<String>,
    #[clap(flatten)]
    source: SourceArg,
    #[clap(flatten)]
    components: ComponentArg,
    #[clap(flatten)]
    summary: SummaryArg,
    /// Output file path (stdout by default)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct ComputeDocument {
    generated_at: DateTime<Utc>,
    date: String,
    group_by: String,
    source: &'static str,
    selectable_only: bool,
    component_count: usize,
    group_count: usize,
    groups: Vec<GroupSummary>,
}

pub(crate) fn run(global: &GlobalArgs, arg: &ComputeArg) -> anyhow::Result<()> {
    let dataset = arg.source.load(&global.data_dir)?;
    let document = build_document(&dataset, arg)?;
    info!(
        date = %document.date,
        groups = document.group_count,
        components = document.component_count,
        "computed grouped statistics"
    );
    Output::save_json(&document, arg.output.clone())
}

fn build_document(dataset: &Dataset, arg: &ComputeArg) -> anyhow::Result<ComputeDocument> {
    let options = arg.summary.options()?;
    let group_by = arg.components.group_by();
    let selectable_only = arg.components.selectable_only();
    let (date, components) = month_components(dataset, arg.date.as_deref(), selectable_only)?;
    let groups = group_components(&components, group_by);
    let summaries = summarize_groups(&groups, &options);
    if summaries.is_empty() {
        bail!("No group statistics could be computed for {date}");
    }

    Ok(ComputeDocument {
        generated_at: Utc::now(),
        date,
        group_by: group_by.to_string(),
        source: SOURCE_NAME,
        selectable_only,
        component_count: components.len(),
        group_count: summaries.len(),
        groups: summaries,
    })
}
