//! Log subscriber setup.
//!
//! Events go to stderr so that JSON documents written to stdout stay clean.
//! When `RUST_LOG` is set it takes precedence over `--log-level`.

use std::io;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub(crate) enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// `tracing` has no level above `error`, so `critical` shares it.
    fn directive(self) -> &'static str {
        match self {
            Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub(crate) enum LogFormat {
    #[default]
    Console,
    Json,
}

pub(crate) fn init(level: LogLevel, format: LogFormat) -> anyhow::Result<()> {
    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::try_from_default_env().context("Invalid RUST_LOG filter")?
    } else {
        EnvFilter::new(level.directive())
    };
    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter);
    let result = match format {
        LogFormat::Console => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| anyhow::anyhow!("Failed to install log subscriber: {err}"))
}
