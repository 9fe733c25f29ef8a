use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use kde_cpi_data::{
    growth::{ObservationCache, compute_growth_components},
    grouping::group_components,
    model::Dataset,
    period::{Month, month_sequence},
    report::PanelRow,
};
use parquet::arrow::ArrowWriter;
use tracing::{debug, info};

use super::{
    GlobalArgs,
    common::{ComponentArg, SourceArg, SummaryArg, summarize_groups},
};
use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PanelArg {
    /// First month of the panel (`YYYY-MM`)
    #[arg(long)]
    start: String,
    /// Last month of the panel (`YYYY-MM`), inclusive
    #[arg(long)]
    end: String,
    /// File to write; `.csv`, or `.parquet`/`.pq` for Parquet
    #[arg(long)]
    export: PathBuf,
    #[clap(flatten)]
    source: SourceArg,
    #[clap(flatten)]
    components: ComponentArg,
    #[clap(flatten)]
    summary: SummaryArg,
}

/// Panel file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            _ => bail!(
                "Unsupported export format: {} (expected .csv, .parquet or .pq)",
                path.display()
            ),
        }
    }
}

pub(crate) fn run(global: &GlobalArgs, arg: &PanelArg) -> anyhow::Result<()> {
    let format = ExportFormat::from_path(&arg.export)?;

    let dataset = arg.source.load(&global.data_dir)?;
    let rows = build_rows(&dataset, arg)?;
    match format {
        ExportFormat::Csv => Output::create(arg.export.clone())?.write_csv(&rows)?,
        ExportFormat::Parquet => write_parquet(&arg.export, &rows)?,
    }
    info!(rows = rows.len(), export = %arg.export.display(), ?format, "wrote panel");
    println!("Wrote {} rows to {}", rows.len(), arg.export.display());
    Ok(())
}

/// Writes the rows as a single Parquet row group, one column per field.
fn write_parquet(path: &Path, rows: &[PanelRow]) -> anyhow::Result<()> {
    let batch = panel_batch(rows)?;
    let file = util::create_file(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("Failed to start Parquet file {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("Failed to write Parquet rows to {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("Failed to finish Parquet file {}", path.display()))?;
    Ok(())
}

fn panel_batch(rows: &[PanelRow]) -> anyhow::Result<RecordBatch> {
    fn text(rows: &[PanelRow], f: impl Fn(&PanelRow) -> &str) -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    }
    fn float(rows: &[PanelRow], f: impl Fn(&PanelRow) -> f64) -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    }

    let field = |name: &str, data_type: DataType| Field::new(name, data_type, false);
    let schema = Schema::new(vec![
        field("date", DataType::Utf8),
        field("group_label", DataType::Utf8),
        field("group_by", DataType::Utf8),
        field("selectable_only", DataType::Boolean),
        field("source", DataType::Utf8),
        field("count", DataType::UInt64),
        field("mode", DataType::Float64),
        field("mode_percent", DataType::Utf8),
        field("mean", DataType::Float64),
        field("median", DataType::Float64),
        field("trimmed_mean", DataType::Float64),
        field("std", DataType::Float64),
        field("skewness", DataType::Float64),
        field("kurtosis", DataType::Float64),
        field("effective_sample_size", DataType::Float64),
    ]);
    let columns: Vec<ArrayRef> = vec![
        text(rows, |row| row.date.as_str()),
        text(rows, |row| row.group_label.as_str()),
        text(rows, |row| row.group_by.as_str()),
        Arc::new(BooleanArray::from(
            rows.iter().map(|row| row.selectable_only).collect::<Vec<_>>(),
        )),
        text(rows, |row| row.source.as_str()),
        Arc::new(UInt64Array::from(
            rows.iter().map(|row| row.count as u64).collect::<Vec<_>>(),
        )),
        float(rows, |row| row.mode),
        text(rows, |row| row.mode_percent.as_str()),
        float(rows, |row| row.mean),
        float(rows, |row| row.median),
        float(rows, |row| row.trimmed_mean),
        float(rows, |row| row.std),
        float(rows, |row| row.skewness),
        float(rows, |row| row.kurtosis),
        float(rows, |row| row.effective_sample_size),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("Failed to build panel record batch")
}

fn build_rows(dataset: &Dataset, arg: &PanelArg) -> anyhow::Result<Vec<PanelRow>> {
    let start = Month::parse(&arg.start).context("Invalid --start")?;
    let end = Month::parse(&arg.end).context("Invalid --end")?;
    let months = month_sequence(start, end)?;
    let options = arg.summary.options()?;
    let group_by = arg.components.group_by();
    let selectable_only = arg.components.selectable_only();
    let group_by_label = group_by.to_string();

    let cache = ObservationCache::build(dataset);
    let mut rows = vec![];
    for month in months {
        let date = month.to_string();
        let target = month.key();
        let components =
            compute_growth_components(dataset, &cache, selectable_only, Some(&target));
        if components.is_empty() {
            debug!(%date, "no growth components");
            continue;
        }
        let groups = group_components(&components, group_by);
        rows.extend(
            summarize_groups(&groups, &options)
                .iter()
                .map(|summary| PanelRow::new(&date, &group_by_label, selectable_only, summary)),
        );
    }
    if rows.is_empty() {
        bail!("No panel rows between {} and {}", arg.start, arg.end);
    }
    Ok(rows)
}
