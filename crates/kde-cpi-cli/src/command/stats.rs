use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::PathBuf,
};

use anyhow::{Context, bail};
use kde_cpi_stats::summary::{StatSummary, compute_statistics};
use serde::Deserialize;
use tracing::info;

use super::common::SummaryArg;
use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StatsArg {
    /// CSV file with a `value` column and an optional `weight` column (stdin by default)
    input: Option<PathBuf>,
    #[clap(flatten)]
    summary: SummaryArg,
    /// Output file path (stdout by default)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct StatsRecord {
    value: f64,
    weight: Option<f64>,
}

pub(crate) fn run(arg: &StatsArg) -> anyhow::Result<()> {
    let summary = match &arg.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            summarize(BufReader::new(file), arg)
                .with_context(|| format!("Failed to summarize {}", path.display()))?
        }
        None => summarize(io::stdin().lock(), arg).context("Failed to summarize stdin")?,
    };
    Output::save_json(&summary, arg.output.clone())
}

fn summarize<R>(reader: R, arg: &StatsArg) -> anyhow::Result<StatSummary>
where
    R: Read,
{
    let (values, weights) = read_values(reader)?;
    let weighted = weights.is_some();
    let weights = weights.unwrap_or_else(|| vec![1.0; values.len()]);
    let options = arg.summary.options()?;
    let summary = compute_statistics(&values, &weights, &options)?;
    info!(count = values.len(), weighted, "summarized sample");
    Ok(summary)
}

/// Reads the `value` column, and the `weight` column if the header has one.
///
/// A row with a blank weight is an error when the column exists.
fn read_values<R>(reader: R) -> anyhow::Result<(Vec<f64>, Option<Vec<f64>>)>
where
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("Failed to read CSV header")?;
    if !headers.iter().any(|h| h == "value") {
        bail!("CSV input must have a `value` column");
    }
    let weighted = headers.iter().any(|h| h == "weight");

    let mut values = vec![];
    let mut weights = vec![];
    for (index, record) in reader.deserialize::<StatsRecord>().enumerate() {
        let row = index + 2;
        let record = record.with_context(|| format!("Invalid CSV row {row}"))?;
        values.push(record.value);
        if weighted {
            let Some(weight) = record.weight else {
                bail!("Missing weight in CSV row {row}");
            };
            weights.push(weight);
        }
    }
    Ok((values, weighted.then_some(weights)))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[clap(flatten)]
        stats: StatsArg,
    }

    fn stats_arg(args: &[&str]) -> StatsArg {
        TestArgs::try_parse_from(std::iter::once("test").chain(args.iter().copied()))
            .unwrap()
            .stats
    }

    #[test]
    fn test_weighted_input() {
        let input = "value,weight\n1.0,1\n2.0,5\n3.0,1\n";
        let summary = summarize(input.as_bytes(), &stats_arg(&[])).unwrap();
        assert!((summary.weighted_mean - 2.0).abs() < 1e-12);
        assert!((summary.weighted_median - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unweighted_input() {
        let (values, weights) = read_values("value\n 0.1 \n0.2\n".as_bytes()).unwrap();
        assert_eq!(values, [0.1, 0.2]);
        assert_eq!(weights, None);

        let summary = summarize("value\n100\n105\n".as_bytes(), &stats_arg(&[])).unwrap();
        assert_eq!(summary.weighted_median, 102.5);
    }

    #[test]
    fn test_malformed_input() {
        assert!(read_values("amount\n1.0\n".as_bytes()).is_err());
        assert!(read_values("value,weight\n1.0,\n".as_bytes()).is_err());
        assert!(read_values("value\nabc\n".as_bytes()).is_err());
        assert!(summarize("value\n".as_bytes(), &stats_arg(&[])).is_err());
        assert!(summarize("value,weight\n1.0,-1\n".as_bytes(), &stats_arg(&[])).is_err());
    }

    #[test]
    fn test_explicit_bandwidth_is_reported() {
        let summary = summarize(
            "value\n0.0\n0.1\n0.3\n".as_bytes(),
            &stats_arg(&["--bandwidth", "0.05"]),
        )
        .unwrap();
        assert_eq!(summary.weighted_kde_bandwidth, 0.05);
    }
}
