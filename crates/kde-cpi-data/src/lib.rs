//! CPI flat-file ingestion and year-over-year component analysis
//!
//! This crate turns the BLS `cu` (CPI for All Urban Consumers) flat files into
//! the weighted samples consumed by [`kde_cpi_stats`], and shapes the results
//! into report payloads.
//!
//! # Overview
//!
//! 0. **Fetch** ([`fetch::FlatFileFetcher`]): Download the flat files from the
//!    BLS site (or a mirror) into a local directory
//! 1. **Load** ([`files::FlatFileSource`]): Read the lookup tables, series
//!    metadata and data partitions from a local mirror of the flat files
//! 2. **Index** ([`growth::ObservationCache`]): Per-series lookup of
//!    observations by period
//! 3. **Derive** ([`growth::compute_growth_components`]): Year-over-year change
//!    of every series for a target month
//! 4. **Group** ([`grouping::group_components`]): Split components by item
//!    display level or item code length
//! 5. **Report** ([`report::GroupSummary`], [`report::PanelRow`]): Weighted
//!    statistics per group as JSON/CSV-ready records
//!
//! # Examples
//!
//! ```
//! use kde_cpi_data::{
//!     growth::{ObservationCache, compute_growth_components},
//!     grouping::{GroupBy, group_components},
//!     parser,
//!     report::GroupSummary,
//!     model::Dataset,
//! };
//! use kde_cpi_stats::summary::SummaryOptions;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let mut dataset = Dataset::new();
//! for item in parser::parse_items(
//!     "item_code\titem_name\tdisplay_level\tselectable\tsort_sequence\n\
//!      SAF11\tFood at home\t2\tT\t10\n\
//!      SEHA\tRent of primary residence\t3\tT\t20\n"
//!         .as_bytes(),
//! )? {
//!     dataset.add_item(item);
//! }
//! for series in parser::parse_series(
//!     "series_id\tarea_code\titem_code\tseasonal\tperiodicity_code\tbase_code\tbase_period\n\
//!      CUUR0000SAF11\t0000\tSAF11\tU\tR\tS\t1982-84=100\n\
//!      CUUR0000SEHA\t0000\tSEHA\tU\tR\tS\t1982-84=100\n"
//!         .as_bytes(),
//! )? {
//!     dataset.add_series(series);
//! }
//! dataset.extend_observations(parser::parse_observations(
//!     "series_id\tyear\tperiod\tvalue\n\
//!      CUUR0000SAF11\t2023\tM06\t300.0\n\
//!      CUUR0000SAF11\t2024\tM06\t303.0\n\
//!      CUUR0000SEHA\t2023\tM06\t400.0\n\
//!      CUUR0000SEHA\t2024\tM06\t420.0\n"
//!         .as_bytes(),
//! )?);
//!
//! let cache = ObservationCache::build(&dataset);
//! let components = compute_growth_components(&dataset, &cache, true, None);
//! assert_eq!(components.len(), 2);
//!
//! let groups = group_components(&components, GroupBy::DisplayLevel);
//! let labels = groups.iter().map(|(label, _)| label.as_str()).collect::<Vec<_>>();
//! assert_eq!(labels, ["2", "3"]);
//!
//! let summary = GroupSummary::new("2", &groups[0].1, &SummaryOptions::default())?;
//! assert_eq!(summary.stats.weighted_mean_percent, "1.00%");
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod fetch;
pub mod files;
pub mod growth;
pub mod grouping;
pub mod model;
pub mod parser;
pub mod period;
pub mod report;

/// Errors raised while reading or interpreting CPI flat files.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DataError {
    #[display("missing column '{column}'")]
    MissingColumn { column: String },
    #[display("invalid integer '{value}' in column '{column}'")]
    InvalidInteger { column: String, value: String },
    #[display("invalid number '{value}' in column '{column}'")]
    InvalidNumber { column: String, value: String },
    #[display("malformed tab-separated data: {_0}")]
    Csv(csv::Error),
    #[display("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("invalid month '{value}', expected YYYY-MM")]
    InvalidMonth { value: String },
    #[display("start month {start} is after end month {end}")]
    InvalidMonthRange { start: String, end: String },
    #[display("unknown data file '{name}'")]
    UnknownDataFile { name: String },
    #[display("GET {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[display("GET {url} failed: {message}")]
    Http { url: String, message: String },
    #[display("failed to download {url}: {source}")]
    Download { url: String, source: std::io::Error },
}
