//! Splitting growth components into labelled groups.

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::growth::GrowthComponent;

/// Dimension used to group components.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// Item display level in the CPI aggregation tree.
    #[default]
    #[display("display-level")]
    DisplayLevel,
    /// Number of characters in the item code.
    #[display("item-code-length")]
    ItemCodeLength,
    /// Deprecated alias of [`GroupBy::ItemCodeLength`].
    #[display("series-name-length")]
    SeriesNameLength,
}

impl GroupBy {
    /// Replaces the deprecated grouping with its successor, logging a warning.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            Self::SeriesNameLength => {
                warn!(
                    original = %Self::SeriesNameLength,
                    replacement = %Self::ItemCodeLength,
                    "group-by option is deprecated"
                );
                Self::ItemCodeLength
            }
            other => other,
        }
    }

    /// Identifier used in output directory names.
    #[must_use]
    pub fn slug(self) -> String {
        self.to_string().replace('-', "_")
    }

    fn label(self, component: &GrowthComponent) -> String {
        match self {
            Self::DisplayLevel => component.display_level.to_string(),
            Self::ItemCodeLength | Self::SeriesNameLength => {
                format!("{} chars", component.item_code.trim().chars().count())
            }
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unknown grouping '{value}' (expected display-level, item-code-length or series-name-length)")]
pub struct ParseGroupByError {
    value: String,
}

impl FromStr for GroupBy {
    type Err = ParseGroupByError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "display-level" => Ok(Self::DisplayLevel),
            "item-code-length" => Ok(Self::ItemCodeLength),
            "series-name-length" => Ok(Self::SeriesNameLength),
            _ => Err(ParseGroupByError {
                value: s.to_owned(),
            }),
        }
    }
}

/// Groups components by the requested dimension.
///
/// Groups are ordered by the first numeric token of their label, then by the
/// label itself; components keep their input order within a group.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::{growth::GrowthComponent, grouping::{GroupBy, group_components}};
/// let component = |item_code: &str, display_level| GrowthComponent {
///     series_id: format!("CUUR0000{item_code}"),
///     item_code: item_code.to_owned(),
///     item_name: String::new(),
///     display_level,
///     series_title: String::new(),
///     value: 0.0,
///     year: 2024,
///     period: "M06".to_owned(),
/// };
/// let components = [component("SEHA", 10), component("SAF11", 2), component("SETB01", 3)];
///
/// let groups = group_components(&components, GroupBy::ItemCodeLength);
/// let labels = groups.iter().map(|(label, _)| label.as_str()).collect::<Vec<_>>();
/// assert_eq!(labels, ["4 chars", "5 chars", "6 chars"]);
///
/// let groups = group_components(&components, GroupBy::DisplayLevel);
/// let labels = groups.iter().map(|(label, _)| label.as_str()).collect::<Vec<_>>();
/// assert_eq!(labels, ["2", "3", "10"]);
/// ```
#[must_use]
pub fn group_components(
    components: &[GrowthComponent],
    group_by: GroupBy,
) -> Vec<(String, Vec<GrowthComponent>)> {
    let mut groups = BTreeMap::<String, Vec<GrowthComponent>>::new();
    for component in components {
        groups
            .entry(group_by.label(component))
            .or_default()
            .push(component.clone());
    }
    let mut groups = groups.into_iter().collect::<Vec<_>>();
    groups.sort_by(|(a, _), (b, _)| {
        label_rank(a)
            .cmp(&label_rank(b))
            .then_with(|| a.cmp(b))
    });
    groups
}

/// First whitespace-separated token of the label that is a number, or 0.
fn label_rank(label: &str) -> u64 {
    label
        .split_whitespace()
        .find_map(|token| token.parse().ok())
        .unwrap_or(0)
}
