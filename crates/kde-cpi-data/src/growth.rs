//! Year-over-year growth components.
//!
//! A component is the relative change of one series between a period and the
//! same period a year earlier, `(current - previous) / previous`. The set of
//! components for a month is the sample whose weighted distribution the
//! statistics engine summarizes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    model::{Dataset, Observation},
    period::PeriodKey,
};

/// Per-series lookup tables built once per dataset.
#[derive(Debug, Clone)]
pub struct ObservationCache<'a> {
    observations: BTreeMap<&'a str, BTreeMap<PeriodKey, &'a Observation>>,
    latest: BTreeMap<&'a str, PeriodKey>,
    periods: Vec<PeriodKey>,
}

impl<'a> ObservationCache<'a> {
    #[must_use]
    pub fn build(dataset: &'a Dataset) -> Self {
        let mut observations = BTreeMap::<_, BTreeMap<_, _>>::new();
        let mut latest = BTreeMap::<_, PeriodKey>::new();
        let mut periods = BTreeSet::new();

        for obs in dataset.observations() {
            let key = PeriodKey::new(obs.year, &obs.period);
            periods.insert(key.clone());
            latest
                .entry(obs.series_id.as_str())
                .and_modify(|current| {
                    if key > *current {
                        *current = key.clone();
                    }
                })
                .or_insert_with(|| key.clone());
            observations
                .entry(obs.series_id.as_str())
                .or_default()
                .insert(key, obs);
        }

        Self {
            observations,
            latest,
            periods: periods.into_iter().collect(),
        }
    }

    /// Observation of a series at a period.
    #[must_use]
    pub fn get(&self, series_id: &str, key: &PeriodKey) -> Option<&'a Observation> {
        self.observations.get(series_id)?.get(key).copied()
    }

    /// Most recent period observed for a series.
    #[must_use]
    pub fn latest(&self, series_id: &str) -> Option<&PeriodKey> {
        self.latest.get(series_id)
    }

    /// Every distinct period in the dataset, in chronological order.
    #[must_use]
    pub fn periods(&self) -> &[PeriodKey] {
        &self.periods
    }

    /// Most recent period in the dataset.
    #[must_use]
    pub fn latest_period(&self) -> Option<&PeriodKey> {
        self.periods.last()
    }

    pub fn series_ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.observations.keys().copied()
    }
}

/// YoY change of a single series, with the metadata reports need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthComponent {
    pub series_id: String,
    pub item_code: String,
    pub item_name: String,
    pub display_level: u32,
    pub series_title: String,
    /// Relative change, e.g. `0.032` for 3.2%.
    pub value: f64,
    pub year: i32,
    pub period: String,
}

/// Relative change from `previous` to `current`.
///
/// `None` if either value is missing or the previous value is zero.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::growth::year_over_year;
/// assert!((year_over_year(Some(103.0), Some(100.0)).unwrap() - 0.03).abs() < 1e-12);
/// assert_eq!(year_over_year(Some(1.0), Some(0.0)), None);
/// assert_eq!(year_over_year(None, Some(100.0)), None);
/// ```
#[must_use]
pub fn year_over_year(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous;
    change.is_finite().then_some(change)
}

/// Derives the YoY component of every series in the dataset.
///
/// With `target` set, each series is measured at that period; otherwise at its
/// own latest period. A series is skipped if it lacks either observation,
/// has a blank or zero base value, is unknown to the series or item tables,
/// or (with `selectable_only`) belongs to an unselectable item.
///
/// Components are ordered by series id.
#[must_use]
pub fn compute_growth_components(
    dataset: &Dataset,
    cache: &ObservationCache<'_>,
    selectable_only: bool,
    target: Option<&PeriodKey>,
) -> Vec<GrowthComponent> {
    let mut components = vec![];
    for series_id in cache.series_ids() {
        let Some(current_key) = target.or_else(|| cache.latest(series_id)) else {
            continue;
        };
        let Some(current) = cache.get(series_id, current_key) else {
            continue;
        };
        let Some(previous) = cache.get(series_id, &current_key.previous_year()) else {
            continue;
        };
        let Some(value) = year_over_year(current.value, previous.value) else {
            continue;
        };
        let Some(series) = dataset.series.get(series_id) else {
            continue;
        };
        let Some(item) = dataset.items.get(&series.item_code) else {
            continue;
        };
        if selectable_only && !item.selectable {
            continue;
        }
        components.push(GrowthComponent {
            series_id: series_id.to_owned(),
            item_code: series.item_code.clone(),
            item_name: item.name.clone(),
            display_level: item.display_level,
            series_title: series.series_title.clone(),
            value,
            year: current_key.year,
            period: current_key.period.clone(),
        });
    }
    debug!(count = components.len(), "computed growth components");
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Series};

    fn add_series(dataset: &mut Dataset, series_id: &str, item_code: &str) {
        dataset.add_series(Series {
            series_id: series_id.to_owned(),
            area_code: "0000".to_owned(),
            item_code: item_code.to_owned(),
            seasonal: "U".to_owned(),
            periodicity_code: "R".to_owned(),
            base_code: "S".to_owned(),
            base_period: "1982-84=100".to_owned(),
            begin_year: 2000,
            begin_period: "M01".to_owned(),
            end_year: 2024,
            end_period: "M06".to_owned(),
            series_title: format!("{item_code} in U.S. city average"),
        });
    }

    fn add_item(dataset: &mut Dataset, code: &str, display_level: u32, selectable: bool) {
        dataset.add_item(Item {
            code: code.to_owned(),
            name: format!("Item {code}"),
            display_level,
            selectable,
            sort_sequence: 0,
        });
    }

    fn obs(series_id: &str, year: i32, period: &str, value: Option<f64>) -> Observation {
        Observation {
            series_id: series_id.to_owned(),
            year,
            period: period.to_owned(),
            value,
            footnotes: vec![],
        }
    }

    fn fixture() -> Dataset {
        let mut dataset = Dataset::new();
        add_item(&mut dataset, "SAF11", 2, true);
        add_item(&mut dataset, "SEHA", 3, true);
        add_item(&mut dataset, "SA0L1", 1, false);
        add_item(&mut dataset, "SETB", 3, true);
        add_series(&mut dataset, "CUUR0000SAF11", "SAF11");
        add_series(&mut dataset, "CUUR0000SEHA", "SEHA");
        add_series(&mut dataset, "CUUR0000SA0L1", "SA0L1");
        add_series(&mut dataset, "CUUR0000SETB", "SETB");
        dataset.extend_observations([
            obs("CUUR0000SAF11", 2023, "M05", Some(300.0)),
            obs("CUUR0000SAF11", 2023, "M06", Some(300.0)),
            obs("CUUR0000SAF11", 2024, "M05", Some(306.0)),
            obs("CUUR0000SAF11", 2024, "M06", Some(303.0)),
            obs("CUUR0000SEHA", 2023, "M06", Some(400.0)),
            obs("CUUR0000SEHA", 2024, "M06", Some(420.0)),
            obs("CUUR0000SA0L1", 2023, "M06", Some(200.0)),
            obs("CUUR0000SA0L1", 2024, "M06", Some(210.0)),
            obs("CUUR0000SETB", 2023, "M06", Some(0.0)),
            obs("CUUR0000SETB", 2024, "M06", Some(5.0)),
            obs("CUUR0000UNKNOWN", 2023, "M06", Some(1.0)),
            obs("CUUR0000UNKNOWN", 2024, "M06", Some(2.0)),
        ]);
        dataset
    }

    #[test]
    fn test_cache_indexes_periods() {
        let dataset = fixture();
        let cache = ObservationCache::build(&dataset);
        assert_eq!(cache.periods().len(), 4);
        assert_eq!(cache.latest_period(), Some(&PeriodKey::new(2024, "M06")));
        assert_eq!(
            cache.latest("CUUR0000SAF11"),
            Some(&PeriodKey::new(2024, "M06"))
        );
        assert_eq!(
            cache
                .get("CUUR0000SEHA", &PeriodKey::new(2023, "m06"))
                .and_then(|o| o.value),
            Some(400.0)
        );
    }

    #[test]
    fn test_latest_period_components() {
        let dataset = fixture();
        let cache = ObservationCache::build(&dataset);
        let components = compute_growth_components(&dataset, &cache, true, None);
        let ids = components
            .iter()
            .map(|c| c.series_id.as_str())
            .collect::<Vec<_>>();
        // Unselectable, zero-base and unknown series are skipped.
        assert_eq!(ids, ["CUUR0000SAF11", "CUUR0000SEHA"]);
        assert!((components[0].value - 0.01).abs() < 1e-12);
        assert!((components[1].value - 0.05).abs() < 1e-12);
        assert_eq!(components[1].display_level, 3);
        assert_eq!(components[1].period, "M06");
    }

    #[test]
    fn test_include_unselectable() {
        let dataset = fixture();
        let cache = ObservationCache::build(&dataset);
        let components = compute_growth_components(&dataset, &cache, false, None);
        assert_eq!(components.len(), 3);
        assert!(components.iter().any(|c| c.item_code == "SA0L1"));
    }

    #[test]
    fn test_target_period() {
        let dataset = fixture();
        let cache = ObservationCache::build(&dataset);
        let target = PeriodKey::new(2024, "M05");
        let components = compute_growth_components(&dataset, &cache, true, Some(&target));
        assert_eq!(components.len(), 1);
        assert!((components[0].value - 0.02).abs() < 1e-12);
        assert_eq!(components[0].period, "M05");
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let mut dataset = Dataset::new();
        add_item(&mut dataset, "SAF11", 2, true);
        add_series(&mut dataset, "CUUR0000SAF11", "SAF11");
        dataset.extend_observations([
            obs("CUUR0000SAF11", 2023, "M06", None),
            obs("CUUR0000SAF11", 2024, "M06", Some(303.0)),
        ]);
        let cache = ObservationCache::build(&dataset);
        assert!(compute_growth_components(&dataset, &cache, true, None).is_empty());
    }
}
