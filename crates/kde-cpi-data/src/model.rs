//! CPI survey records and the in-memory dataset.
//!
//! The types mirror the tables of the BLS `cu` flat files:
//!
//! ```text
//! Dataset
//! ├─ areas:     area_code  -> Area
//! ├─ items:     item_code  -> Item
//! ├─ periods:   period     -> Period
//! ├─ footnotes: code       -> Footnote
//! ├─ series:    series_id  -> Series
//! └─ observations: Vec<Observation>   (unique per series_id/year/period)
//! ```
//!
//! A [`Dataset`] serializes to a JSON snapshot with one list per table.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Geographic area from the area lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub code: String,
    pub name: String,
}

/// Item metadata describing a CPI product grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub code: String,
    pub name: String,
    /// Depth of the item in the CPI aggregation tree (0 = all items).
    pub display_level: u32,
    /// Whether the item may be selected on the BLS data tools.
    pub selectable: bool,
    pub sort_sequence: u32,
}

/// Reporting period (`M01`..`M13`, `S01`..`S03`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub code: String,
    pub abbr: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub code: String,
    pub text: String,
}

/// Metadata describing a CPI series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub series_id: String,
    pub area_code: String,
    pub item_code: String,
    /// `S` for seasonally adjusted, `U` otherwise.
    pub seasonal: String,
    pub periodicity_code: String,
    pub base_code: String,
    pub base_period: String,
    pub begin_year: i32,
    pub begin_period: String,
    pub end_year: i32,
    pub end_period: String,
    #[serde(default)]
    pub series_title: String,
}

impl Series {
    #[must_use]
    pub fn is_seasonally_adjusted(&self) -> bool {
        self.seasonal.eq_ignore_ascii_case("S")
    }
}

/// A single index value of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    /// `None` when the flat file leaves the value blank.
    pub value: Option<f64>,
    #[serde(default)]
    pub footnotes: Vec<String>,
}

impl Observation {
    /// Whether the observation is an annual average (`M13`) or its
    /// semiannual-table counterpart (`R13`).
    ///
    /// # Examples
    ///
    /// ```
    /// # use kde_cpi_data::model::Observation;
    /// let obs = Observation {
    ///     series_id: "CUUR0000SA0".to_owned(),
    ///     year: 2023,
    ///     period: "m13".to_owned(),
    ///     value: Some(304.702),
    ///     footnotes: vec![],
    /// };
    /// assert!(obs.is_annual());
    /// ```
    #[must_use]
    pub fn is_annual(&self) -> bool {
        let period = self.period.to_ascii_uppercase();
        period.starts_with("M13") || period.starts_with("R13")
    }

    fn key(&self) -> (String, i32, String) {
        (self.series_id.clone(), self.year, self.period.clone())
    }
}

/// Splits a raw footnote cell into its codes.
///
/// Codes may be separated by commas, whitespace, or both.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::model::split_footnote_codes;
/// assert_eq!(split_footnote_codes(" P, 1 C "), ["P", "1", "C"]);
/// assert!(split_footnote_codes("  ").is_empty());
/// ```
#[must_use]
pub fn split_footnote_codes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Aggregate of the lookup tables, series metadata and observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DatasetSnapshot", into = "DatasetSnapshot")]
pub struct Dataset {
    pub areas: BTreeMap<String, Area>,
    pub items: BTreeMap<String, Item>,
    pub periods: BTreeMap<String, Period>,
    pub footnotes: BTreeMap<String, Footnote>,
    pub series: BTreeMap<String, Series>,
    observations: Vec<Observation>,
    observation_keys: HashSet<(String, i32, String)>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an area.
    pub fn add_area(&mut self, area: Area) {
        self.areas.insert(area.code.clone(), area);
    }

    /// Inserts or replaces an item.
    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.code.clone(), item);
    }

    /// Inserts or replaces a period.
    pub fn add_period(&mut self, period: Period) {
        self.periods.insert(period.code.clone(), period);
    }

    /// Inserts or replaces a footnote.
    pub fn add_footnote(&mut self, footnote: Footnote) {
        self.footnotes.insert(footnote.code.clone(), footnote);
    }

    /// Inserts or replaces a series.
    pub fn add_series(&mut self, series: Series) {
        self.series.insert(series.series_id.clone(), series);
    }

    /// Appends observations, dropping any whose `(series_id, year, period)`
    /// is already present. The first occurrence wins.
    ///
    /// Returns the number of observations actually added.
    pub fn extend_observations<I>(&mut self, observations: I) -> usize
    where
        I: IntoIterator<Item = Observation>,
    {
        let before = self.observations.len();
        for obs in observations {
            if self.observation_keys.insert(obs.key()) {
                self.observations.push(obs);
            }
        }
        self.observations.len() - before
    }

    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

/// JSON layout of a [`Dataset`]: one list per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetSnapshot {
    areas: Vec<Area>,
    items: Vec<Item>,
    periods: Vec<Period>,
    footnotes: Vec<Footnote>,
    series: Vec<Series>,
    observations: Vec<Observation>,
}

impl From<DatasetSnapshot> for Dataset {
    fn from(snapshot: DatasetSnapshot) -> Self {
        let mut dataset = Self::new();
        snapshot.areas.into_iter().for_each(|a| dataset.add_area(a));
        snapshot.items.into_iter().for_each(|i| dataset.add_item(i));
        snapshot
            .periods
            .into_iter()
            .for_each(|p| dataset.add_period(p));
        snapshot
            .footnotes
            .into_iter()
            .for_each(|f| dataset.add_footnote(f));
        snapshot
            .series
            .into_iter()
            .for_each(|s| dataset.add_series(s));
        dataset.extend_observations(snapshot.observations);
        dataset
    }
}

impl From<Dataset> for DatasetSnapshot {
    fn from(dataset: Dataset) -> Self {
        Self {
            areas: dataset.areas.into_values().collect(),
            items: dataset.items.into_values().collect(),
            periods: dataset.periods.into_values().collect(),
            footnotes: dataset.footnotes.into_values().collect(),
            series: dataset.series.into_values().collect(),
            observations: dataset.observations,
        }
    }
}
