use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::{self, LogFormat, LogLevel};

use self::{
    analyze::AnalyzeArg, compute::ComputeArg, fetch_dataset::FetchDatasetArg, panel::PanelArg,
    stats::StatsArg,
};

mod analyze;
mod common;
mod compute;
mod fetch_dataset;
mod panel;
mod stats;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[clap(flatten)]
    global: GlobalArgs,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct GlobalArgs {
    /// Directory holding the BLS `cu.*` flat files
    #[arg(long, global = true, env = "KDE_CPI_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
    /// Verbosity: critical, error, warning, info or debug
    #[arg(long, global = true, env = "KDE_CPI_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
    /// Log rendering: console or json
    #[arg(long, global = true, env = "KDE_CPI_LOG_FORMAT", default_value = "console")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Download and load the flat files, optionally writing a JSON snapshot
    FetchDataset(#[clap(flatten)] FetchDatasetArg),
    /// Compute grouped KDE-mode statistics for one month
    Compute(#[clap(flatten)] ComputeArg),
    /// Write density, histogram and summary data for every group
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Export grouped statistics for a range of months as CSV or Parquet
    Panel(#[clap(flatten)] PanelArg),
    /// Summarize a CSV of values and optional weights
    Stats(#[clap(flatten)] StatsArg),
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Self::FetchDataset(_) => "fetch-dataset",
            Self::Compute(_) => "compute",
            Self::Analyze(_) => "analyze",
            Self::Panel(_) => "panel",
            Self::Stats(_) => "stats",
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    logging::init(args.global.log_level, args.global.log_format)?;
    let _span = tracing::info_span!("command", command = args.mode.name()).entered();
    match &args.mode {
        Mode::FetchDataset(arg) => fetch_dataset::run(&args.global, arg)?,
        Mode::Compute(arg) => compute::run(&args.global, arg)?,
        Mode::Analyze(arg) => analyze::run(&args.global, arg)?,
        Mode::Panel(arg) => panel::run(&args.global, arg)?,
        Mode::Stats(arg) => stats::run(arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_compute() {
        let args = CommandArgs::try_parse_from([
            "kde-cpi",
            "--data-dir",
            "mirror",
            "compute",
            "--date",
            "2024-06",
            "--group-by",
            "item-code-length",
            "--include-unselectable",
            "--trim",
            "0.1",
        ])
        .unwrap();
        assert_eq!(args.global.data_dir, PathBuf::from("mirror"));
        assert_eq!(args.mode.name(), "compute");
    }

    #[test]
    fn test_current_only_conflicts_with_data_file() {
        let result = CommandArgs::try_parse_from([
            "kde-cpi",
            "fetch-dataset",
            "--current-only",
            "--data-file",
            "cu.data.1.AllItems",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_options_after_subcommand() {
        let args = CommandArgs::try_parse_from([
            "kde-cpi",
            "stats",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.global.log_level, LogLevel::Debug);
        assert_eq!(args.global.log_format, LogFormat::Json);
    }
}
