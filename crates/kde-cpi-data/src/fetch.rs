//! Downloading the BLS `cu` flat files into a local directory.
//!
//! [`FlatFileFetcher`] writes every file a [`DataSelection`] needs into the
//! directory later read by [`FlatFileSource`](crate::files::FlatFileSource).
//! Each file is streamed to `<name>.part` and renamed once complete, so an
//! interrupted download never leaves a truncated file under the real name.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    DataError,
    files::{DataSelection, MAPPING_FILES, SERIES_FILE},
};

/// Where BLS publishes the `cu` flat files.
pub const BASE_URL: &str = "https://download.bls.gov/pub/time.series/cu/";

/// `User-Agent` sent when none is configured.
///
/// BLS rejects anonymous clients; pass a descriptive agent with a contact
/// address when downloading from the public endpoint.
pub const DEFAULT_USER_AGENT: &str = concat!("kde-cpi/", env!("CARGO_PKG_VERSION"));

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves the body of a URL.
pub trait Transport {
    /// Streams the body of `url` into `writer` and returns its size in bytes.
    fn fetch(&self, url: &str, writer: &mut dyn io::Write) -> Result<u64, DataError>;
}

/// [`Transport`] over blocking HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    #[must_use]
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, writer: &mut dyn io::Write) -> Result<u64, DataError> {
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => DataError::HttpStatus {
                url: url.to_owned(),
                status,
            },
            ureq::Error::Transport(transport) => DataError::Http {
                url: url.to_owned(),
                message: transport.to_string(),
            },
        })?;
        io::copy(&mut response.into_reader(), writer).map_err(|source| DataError::Download {
            url: url.to_owned(),
            source,
        })
    }
}

/// Downloads flat files from a base URL into a directory.
#[derive(Debug, Clone)]
pub struct FlatFileFetcher<T> {
    base_url: String,
    transport: T,
}

impl<T> FlatFileFetcher<T>
where
    T: Transport,
{
    /// Creates a fetcher for the files under `base_url`.
    ///
    /// A missing trailing `/` is added so that file names are appended to the
    /// path rather than replacing its last segment.
    #[must_use]
    pub fn new<S>(base_url: S, transport: T) -> Self
    where
        S: Into<String>,
    {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            transport,
        }
    }

    /// URL of a flat file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kde_cpi_data::fetch::{FlatFileFetcher, HttpTransport};
    /// let fetcher = FlatFileFetcher::new("https://mirror.example/cu", HttpTransport::default());
    /// assert_eq!(fetcher.url("cu.series"), "https://mirror.example/cu/cu.series");
    /// ```
    #[must_use]
    pub fn url(&self, name: &str) -> String {
        format!("{}{name}", self.base_url)
    }

    /// Downloads the lookup tables, the series metadata and the selected data
    /// partitions into `dir`, creating it if needed.
    ///
    /// Returns the paths written, in download order.
    ///
    /// # Errors
    ///
    /// - [`DataError::UnknownDataFile`] if a named partition is not known
    /// - [`DataError::HttpStatus`], [`DataError::Http`] or [`DataError::Download`]
    ///   if a request fails
    /// - [`DataError::Io`] if the directory or a file cannot be written
    pub fn fetch_selection(
        &self,
        dir: &Path,
        selection: &DataSelection,
    ) -> Result<Vec<PathBuf>, DataError> {
        let data_files = selection.data_files()?;
        fs::create_dir_all(dir).map_err(|source| DataError::Io {
            path: dir.to_owned(),
            source,
        })?;

        let names = MAPPING_FILES
            .iter()
            .copied()
            .chain([SERIES_FILE])
            .chain(data_files.iter().map(String::as_str));
        let mut paths = vec![];
        for name in names {
            paths.push(self.fetch_file(dir, name)?);
        }
        info!(files = paths.len(), dir = %dir.display(), "downloaded flat files");
        Ok(paths)
    }

    /// Downloads a single flat file into `dir`.
    pub fn fetch_file(&self, dir: &Path, name: &str) -> Result<PathBuf, DataError> {
        let url = self.url(name);
        let path = dir.join(name);
        let partial = dir.join(format!("{name}.part"));

        let bytes = match self.download_to(&url, &partial) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Best effort: the download error is the one worth reporting.
                let _ = fs::remove_file(&partial);
                return Err(err);
            }
        };
        fs::rename(&partial, &path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(%url, bytes, "downloaded flat file");
        Ok(path)
    }

    fn download_to(&self, url: &str, path: &Path) -> Result<u64, DataError> {
        let io_error = |source| DataError::Io {
            path: path.to_owned(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        let bytes = self.transport.fetch(url, &mut writer)?;
        writer.flush().map_err(io_error)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io::{BufRead as _, BufReader, Read as _, Write as _},
        net::TcpListener,
        sync::Mutex,
        thread::{self, JoinHandle},
    };

    use super::*;
    use crate::files::{CURRENT_DATA_FILES, FlatFileSource};

    /// Serves fixed bodies keyed by URL and records every requested URL.
    #[derive(Debug, Default)]
    struct StaticTransport {
        bodies: HashMap<String, &'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl Transport for StaticTransport {
        fn fetch(&self, url: &str, writer: &mut dyn io::Write) -> Result<u64, DataError> {
            self.requested.lock().unwrap().push(url.to_owned());
            let Some(body) = self.bodies.get(url) else {
                return Err(DataError::HttpStatus {
                    url: url.to_owned(),
                    status: 404,
                });
            };
            writer.write_all(body.as_bytes()).unwrap();
            Ok(body.len() as u64)
        }
    }

    fn fixture_bodies() -> Vec<(&'static str, &'static str)> {
        vec![
            ("cu.area", "area_code\tarea_name\n0000\tU.S. city average\n"),
            (
                "cu.item",
                "item_code\titem_name\tdisplay_level\tselectable\tsort_sequence\n\
                 SA0\tAll items\t0\tT\t2\n",
            ),
            ("cu.period", "period\tperiod_abbr\tperiod_name\nM06\tJUN\tJune\n"),
            ("cu.footnote", "footnote_code\tfootnote_text\n"),
            (
                "cu.series",
                "series_id\tarea_code\titem_code\tseasonal\tperiodicity_code\tbase_code\tbase_period\n\
                 CUUR0000SA0\t0000\tSA0\tU\tR\tS\t1982-84=100\n",
            ),
            (
                "cu.data.0.Current",
                "series_id\tyear\tperiod\tvalue\tfootnote_codes\n\
                 CUUR0000SA0\t2023\tM06\t305.109\t\n\
                 CUUR0000SA0\t2024\tM06\t314.175\t\n",
            ),
        ]
    }

    /// Answers `connections` HTTP requests on a local port from the fixture
    /// bodies, one request per connection. Returns the base URL and a handle
    /// yielding the requested paths and `User-Agent` headers.
    fn serve(connections: usize) -> (String, JoinHandle<Vec<(String, String)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/pub/cu/", listener.local_addr().unwrap());
        let bodies = fixture_bodies()
            .into_iter()
            .map(|(name, body)| (format!("/pub/cu/{name}"), body))
            .collect::<HashMap<_, _>>();
        let handle = thread::spawn(move || {
            let mut requests = vec![];
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut user_agent = String::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line.trim().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':')
                        && name.eq_ignore_ascii_case("user-agent")
                    {
                        user_agent = value.trim().to_owned();
                    }
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_owned();
                let response = match bodies.get(&path) {
                    Some(body) => format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    ),
                    None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_owned(),
                };
                stream.write_all(response.as_bytes()).unwrap();
                requests.push((path, user_agent));
            }
            requests
        });
        (base_url, handle)
    }

    #[test]
    fn test_fetch_selection_writes_loadable_directory() {
        let transport = StaticTransport {
            bodies: fixture_bodies()
                .into_iter()
                .map(|(name, body)| (format!("https://mirror.example/cu/{name}"), body))
                .collect(),
            ..StaticTransport::default()
        };
        let fetcher = FlatFileFetcher::new("https://mirror.example/cu", transport);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");

        let paths = fetcher
            .fetch_selection(&target, &DataSelection::CurrentOnly)
            .unwrap();
        assert_eq!(paths.len(), MAPPING_FILES.len() + 1 + CURRENT_DATA_FILES.len());
        assert_eq!(
            fetcher.transport.requested.lock().unwrap()[4],
            "https://mirror.example/cu/cu.series"
        );

        let dataset = FlatFileSource::new(&target)
            .load_dataset(&DataSelection::CurrentOnly)
            .unwrap();
        assert_eq!(dataset.series.len(), 1);
        assert_eq!(dataset.observations().len(), 2);
    }

    #[test]
    fn test_failed_download_leaves_no_file() {
        let fetcher = FlatFileFetcher::new("https://mirror.example/cu/", StaticTransport::default());
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher.fetch_file(dir.path(), "cu.area").unwrap_err();
        assert!(matches!(err, DataError::HttpStatus { status: 404, .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_partition_is_rejected_before_downloading() {
        let fetcher = FlatFileFetcher::new(BASE_URL, StaticTransport::default());
        let dir = tempfile::tempdir().unwrap();
        let selection = DataSelection::Files(vec!["cu.data.99.Nope".to_owned()]);
        assert!(matches!(
            fetcher.fetch_selection(dir.path(), &selection),
            Err(DataError::UnknownDataFile { .. })
        ));
        assert!(fetcher.transport.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_http_transport_downloads_from_server() {
        let (base_url, server) = serve(6);
        let fetcher = FlatFileFetcher::new(
            base_url,
            HttpTransport::new("kde-cpi-test (ops@example.com)", DEFAULT_TIMEOUT),
        );
        let dir = tempfile::tempdir().unwrap();
        fetcher
            .fetch_selection(dir.path(), &DataSelection::CurrentOnly)
            .unwrap();

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[0].0, "/pub/cu/cu.area");
        assert!(
            requests
                .iter()
                .all(|(_, agent)| agent == "kde-cpi-test (ops@example.com)")
        );

        let mut text = String::new();
        File::open(dir.path().join("cu.data.0.Current"))
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.contains("314.175"));
    }

    #[test]
    fn test_http_transport_reports_status() {
        let (base_url, server) = serve(1);
        let fetcher = FlatFileFetcher::new(base_url, HttpTransport::default());
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch_file(dir.path(), "cu.data.12.USHousing")
            .unwrap_err();
        assert!(matches!(err, DataError::HttpStatus { status: 404, .. }));
        assert!(err.to_string().contains("cu.data.12.USHousing"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let requests = server.join().unwrap();
        assert_eq!(requests[0].0, "/pub/cu/cu.data.12.USHousing");
        assert_eq!(requests[0].1, DEFAULT_USER_AGENT);
    }
}
