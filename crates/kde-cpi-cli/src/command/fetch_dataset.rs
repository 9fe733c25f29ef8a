use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use kde_cpi_data::{
    fetch::{
        BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FlatFileFetcher, HttpTransport, Transport,
    },
    model::Dataset,
};
use serde::Serialize;
use tracing::info;

use super::{GlobalArgs, common::SourceArg};
use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct FetchDatasetArg {
    #[clap(flatten)]
    source: SourceArg,
    #[clap(flatten)]
    download: DownloadArg,
    /// Write the dataset snapshot as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Where and how the flat files are downloaded.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DownloadArg {
    /// Parse the files already in the data directory instead of downloading
    #[arg(long)]
    no_download: bool,
    /// URL the `cu.*` files are downloaded from [default: the BLS site]
    #[arg(long, env = "KDE_CPI_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
    /// `User-Agent` header; BLS expects one naming a contact address
    #[arg(long, env = "KDE_CPI_USER_AGENT")]
    user_agent: Option<String>,
    /// Request timeout in seconds [default: 30]
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl DownloadArg {
    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(BASE_URL)
    }

    fn transport(&self) -> HttpTransport {
        HttpTransport::new(
            self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
            self.timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct DatasetCounts {
    series: usize,
    observations: usize,
    areas: usize,
    items: usize,
}

impl DatasetCounts {
    fn new(dataset: &Dataset) -> Self {
        Self {
            series: dataset.series.len(),
            observations: dataset.observations().len(),
            areas: dataset.areas.len(),
            items: dataset.items.len(),
        }
    }
}

pub(crate) fn run(global: &GlobalArgs, arg: &FetchDatasetArg) -> anyhow::Result<()> {
    run_with(global, arg, arg.download.transport())
}

fn run_with<T>(global: &GlobalArgs, arg: &FetchDatasetArg, transport: T) -> anyhow::Result<()>
where
    T: Transport,
{
    let FetchDatasetArg {
        source,
        download,
        output,
    } = arg;

    if download.no_download {
        info!(dir = %global.data_dir.display(), "skipping download");
    } else {
        let fetcher = FlatFileFetcher::new(download.base_url(), transport);
        let paths = fetcher
            .fetch_selection(&global.data_dir, &source.selection())
            .with_context(|| {
                format!("Failed to download CPI flat files from {}", download.base_url())
            })?;
        println!(
            "Downloaded {} files into {}",
            paths.len(),
            global.data_dir.display()
        );
    }

    let dataset = source.load(&global.data_dir)?;
    let counts = DatasetCounts::new(&dataset);
    info!(
        series = counts.series,
        observations = counts.observations,
        areas = counts.areas,
        items = counts.items,
        "loaded dataset"
    );
    println!(
        "Loaded {} series, {} observations, {} areas and {} items",
        counts.series, counts.observations, counts.areas, counts.items
    );

    if let Some(path) = output {
        let mut output = Output::create(path.clone())?;
        output.write_json(&dataset)?;
        println!("Wrote dataset snapshot to {}", output.display_path());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, io, path::Path};

    use clap::Parser;
    use kde_cpi_data::DataError;

    use super::*;
    use crate::{
        command::common::write_fixture,
        logging::{LogFormat, LogLevel},
    };

    /// Serves the files of a local directory, keyed by the last URL segment.
    struct DirTransport<'a>(&'a Path);

    impl Transport for DirTransport<'_> {
        fn fetch(&self, url: &str, writer: &mut dyn io::Write) -> Result<u64, DataError> {
            let name = url.rsplit('/').next().unwrap_or_default();
            let body = fs::read(self.0.join(name)).map_err(|_| DataError::HttpStatus {
                url: url.to_owned(),
                status: 404,
            })?;
            writer.write_all(&body).unwrap();
            Ok(body.len() as u64)
        }
    }

    fn global(data_dir: &Path) -> GlobalArgs {
        GlobalArgs {
            data_dir: data_dir.to_owned(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Console,
        }
    }

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[clap(flatten)]
        arg: FetchDatasetArg,
    }

    fn parse(args: &[&str]) -> FetchDatasetArg {
        TestArgs::try_parse_from(std::iter::once("fetch-dataset").chain(args.iter().copied()))
            .unwrap()
            .arg
    }

    fn load_snapshot(path: &Path) -> DatasetCounts {
        let dataset: Dataset = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        DatasetCounts::new(&dataset)
    }

    const FIXTURE_COUNTS: DatasetCounts = DatasetCounts {
        series: 5,
        observations: 20,
        areas: 1,
        items: 5,
    };

    #[test]
    fn test_writes_snapshot_without_download() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let output = dir.path().join("snapshot/dataset.json");
        let arg = FetchDatasetArg {
            download: DownloadArg {
                no_download: true,
                ..DownloadArg::default()
            },
            output: Some(output.clone()),
            ..FetchDatasetArg::default()
        };
        run(&global(dir.path()), &arg).unwrap();
        assert_eq!(load_snapshot(&output), FIXTURE_COUNTS);
    }

    #[test]
    fn test_downloads_into_data_dir_before_loading() {
        let mirror = tempfile::tempdir().unwrap();
        write_fixture(mirror.path());
        let data_dir = tempfile::tempdir().unwrap();
        let target = data_dir.path().join("cu");
        let output = data_dir.path().join("dataset.json");

        let arg = parse(&[
            "--current-only",
            "--base-url",
            "https://mirror.example/cu",
            "--output",
            output.to_str().unwrap(),
        ]);
        run_with(&global(&target), &arg, DirTransport(mirror.path())).unwrap();

        assert!(target.join("cu.series").is_file());
        assert!(target.join("cu.data.0.Current").is_file());
        assert_eq!(load_snapshot(&output), FIXTURE_COUNTS);
    }

    #[test]
    fn test_missing_remote_file_fails() {
        let mirror = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let err = run_with(
            &global(data_dir.path()),
            &FetchDatasetArg::default(),
            DirTransport(mirror.path()),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("HTTP 404"));
    }

    #[test]
    fn test_download_defaults() {
        let arg = parse(&[]);
        assert!(!arg.download.no_download);
        assert_eq!(arg.download.base_url(), BASE_URL);
        let arg = parse(&["--no-download", "--timeout-secs", "5"]);
        assert!(arg.download.no_download);
        assert_eq!(arg.download.timeout_secs, Some(5));
    }
}
