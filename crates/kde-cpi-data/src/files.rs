//! Loading a dataset from a local mirror of the BLS `cu` flat files.
//!
//! The directory is expected to hold the files as published under
//! `https://download.bls.gov/pub/time.series/cu/`, with their original names.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    DataError,
    model::Dataset,
    parser::{
        parse_areas, parse_footnotes, parse_items, parse_observations, parse_periods, parse_series,
    },
};

/// Name of this data source in report payloads.
pub const SOURCE_NAME: &str = "flatfiles";

pub const SERIES_FILE: &str = "cu.series";
pub const AREA_FILE: &str = "cu.area";
pub const ITEM_FILE: &str = "cu.item";
pub const PERIOD_FILE: &str = "cu.period";
pub const FOOTNOTE_FILE: &str = "cu.footnote";

/// The lookup tables every dataset needs.
pub const MAPPING_FILES: [&str; 4] = [AREA_FILE, ITEM_FILE, PERIOD_FILE, FOOTNOTE_FILE];

/// Observation partitions, in load order.
///
/// The order matters: an observation present in several partitions is kept
/// from the first one that contains it.
pub const DATA_FILES: [&str; 21] = [
    "cu.data.0.Current",
    "cu.data.1.AllItems",
    "cu.data.2.Summaries",
    "cu.data.3.AsizeNorthEast",
    "cu.data.4.AsizeNorthCentral",
    "cu.data.5.AsizeSouth",
    "cu.data.6.AsizeWest",
    "cu.data.7.OtherNorthEast",
    "cu.data.8.OtherNorthCentral",
    "cu.data.9.OtherSouth",
    "cu.data.10.OtherWest",
    "cu.data.11.USFoodBeverage",
    "cu.data.12.USHousing",
    "cu.data.13.USApparel",
    "cu.data.14.USTransportation",
    "cu.data.15.USMedical",
    "cu.data.16.USRecreation",
    "cu.data.17.USEducationAndCommunication",
    "cu.data.18.USOtherGoodsAndServices",
    "cu.data.19.PopulationSize",
    "cu.data.20.USCommoditiesServicesSpecial",
];

/// Partitions holding only the most recent observations.
pub const CURRENT_DATA_FILES: [&str; 1] = ["cu.data.0.Current"];

/// Which observation partitions to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DataSelection {
    /// Every partition of [`DATA_FILES`] present in the directory.
    #[default]
    All,
    /// Only [`CURRENT_DATA_FILES`].
    CurrentOnly,
    /// The named partitions; each must be known and present.
    Files(Vec<String>),
}

impl DataSelection {
    /// Builds a selection from command-line style flags.
    #[must_use]
    pub fn from_flags(current_only: bool, data_files: &[String]) -> Self {
        if current_only {
            Self::CurrentOnly
        } else if data_files.is_empty() {
            Self::All
        } else {
            Self::Files(data_files.to_vec())
        }
    }

    /// Names of the partitions this selection asks for.
    ///
    /// [`DataSelection::All`] names every partition of [`DATA_FILES`].
    ///
    /// # Errors
    ///
    /// [`DataError::UnknownDataFile`] if a named partition is not one of [`DATA_FILES`].
    pub fn data_files(&self) -> Result<Vec<String>, DataError> {
        match self {
            Self::All => Ok(DATA_FILES.iter().map(|&name| name.to_owned()).collect()),
            Self::CurrentOnly => Ok(CURRENT_DATA_FILES
                .iter()
                .map(|&name| name.to_owned())
                .collect()),
            Self::Files(names) => {
                if let Some(name) = names.iter().find(|name| !DATA_FILES.contains(&name.as_str())) {
                    return Err(DataError::UnknownDataFile { name: name.clone() });
                }
                Ok(names.clone())
            }
        }
    }
}

/// A directory containing BLS `cu` flat files.
#[derive(Debug, Clone)]
pub struct FlatFileSource {
    dir: PathBuf,
}

impl FlatFileSource {
    pub fn new<P>(dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the lookup tables, the series metadata and the selected
    /// observation partitions into a dataset.
    ///
    /// # Errors
    ///
    /// - [`DataError::UnknownDataFile`] if a named partition is not one of [`DATA_FILES`]
    /// - [`DataError::Io`] if a required file cannot be opened
    /// - Any parse error of the files
    pub fn load_dataset(&self, selection: &DataSelection) -> Result<Dataset, DataError> {
        let mut dataset = Dataset::new();

        parse_areas(self.open(AREA_FILE)?)?
            .into_iter()
            .for_each(|area| dataset.add_area(area));
        parse_items(self.open(ITEM_FILE)?)?
            .into_iter()
            .for_each(|item| dataset.add_item(item));
        parse_periods(self.open(PERIOD_FILE)?)?
            .into_iter()
            .for_each(|period| dataset.add_period(period));
        parse_footnotes(self.open(FOOTNOTE_FILE)?)?
            .into_iter()
            .for_each(|footnote| dataset.add_footnote(footnote));
        parse_series(self.open(SERIES_FILE)?)?
            .into_iter()
            .for_each(|series| dataset.add_series(series));

        for name in self.resolve_data_files(selection)? {
            let observations = parse_observations(self.open(&name)?)?;
            let parsed = observations.len();
            let added = dataset.extend_observations(observations);
            info!(file = %name, parsed, added, "loaded data partition");
        }

        if dataset.observations().is_empty() {
            warn!(dir = %self.dir.display(), "no observations were loaded");
        }
        Ok(dataset)
    }

    fn resolve_data_files(&self, selection: &DataSelection) -> Result<Vec<String>, DataError> {
        let names = selection.data_files()?;
        if *selection != DataSelection::All {
            return Ok(names);
        }
        Ok(names
            .into_iter()
            .filter(|name| {
                let exists = self.dir.join(name).is_file();
                if !exists {
                    debug!(file = %name, "data partition not present, skipping");
                }
                exists
            })
            .collect())
    }

    fn open(&self, name: &str) -> Result<BufReader<File>, DataError> {
        let path = self.dir.join(name);
        let file = File::open(&path).map_err(|source| DataError::Io { path, source })?;
        Ok(BufReader::new(file))
    }
}
