//! Parsers for the tab-separated BLS flat files.
//!
//! Every file starts with a header row. Header names are normalized (trimmed,
//! lower-cased, spaces replaced by `_`) before lookup, cell values are
//! trimmed, and rows consisting only of blank cells are skipped. Optional
//! columns that are absent or blank fall back to a default.

use std::{io, str::FromStr};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    DataError,
    model::{Area, Footnote, Item, Observation, Period, Series, split_footnote_codes},
};

/// Parses the area lookup table (`cu.area`).
pub fn parse_areas<R>(reader: R) -> Result<Vec<Area>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        Ok(Area {
            code: row.required("area_code")?.to_owned(),
            name: row.required("area_name")?.to_owned(),
        })
    })
}

/// Parses the item lookup table (`cu.item`).
pub fn parse_items<R>(reader: R) -> Result<Vec<Item>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        Ok(Item {
            code: row.required("item_code")?.to_owned(),
            name: row.required("item_name")?.to_owned(),
            display_level: row.integer_or("display_level", 0)?,
            selectable: parse_flag(row.optional("selectable").unwrap_or("F")),
            sort_sequence: row.integer_or("sort_sequence", 0)?,
        })
    })
}

/// Parses the period lookup table (`cu.period`).
pub fn parse_periods<R>(reader: R) -> Result<Vec<Period>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        Ok(Period {
            code: row.required("period")?.to_owned(),
            abbr: row.required("period_abbr")?.to_owned(),
            name: row.required("period_name")?.to_owned(),
        })
    })
}

/// Parses the footnote lookup table (`cu.footnote`).
pub fn parse_footnotes<R>(reader: R) -> Result<Vec<Footnote>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        Ok(Footnote {
            code: row.required("footnote_code")?.to_owned(),
            text: row.required("footnote_text")?.to_owned(),
        })
    })
}

/// Parses series metadata (`cu.series`).
pub fn parse_series<R>(reader: R) -> Result<Vec<Series>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        Ok(Series {
            series_id: row.required("series_id")?.to_owned(),
            area_code: row.required("area_code")?.to_owned(),
            item_code: row.required("item_code")?.to_owned(),
            seasonal: row.required("seasonal")?.to_owned(),
            periodicity_code: row.required("periodicity_code")?.to_owned(),
            base_code: row.required("base_code")?.to_owned(),
            base_period: row.text_or("base_period", ""),
            begin_year: row.integer_or("begin_year", 0)?,
            begin_period: row.text_or("begin_period", ""),
            end_year: row.integer_or("end_year", 0)?,
            end_period: row.text_or("end_period", ""),
            series_title: row.text_or("series_title", ""),
        })
    })
}

/// Parses observations from a data partition (`cu.data.*`).
///
/// A blank value cell becomes `None`; footnote codes are split on commas and
/// whitespace.
///
/// # Examples
///
/// ```
/// use kde_cpi_data::parser::parse_observations;
///
/// let text = "series_id        \tyear\tperiod\t       value\tfootnote_codes\n\
///             CUUR0000SA0      \t2024\tM01\t     308.417\t\n\
///             CUUR0000SA0      \t2024\tM02\t            \tP\n";
/// let observations = parse_observations(text.as_bytes()).unwrap();
/// assert_eq!(observations[0].series_id, "CUUR0000SA0");
/// assert_eq!(observations[0].value, Some(308.417));
/// assert_eq!(observations[1].value, None);
/// assert_eq!(observations[1].footnotes, ["P"]);
/// ```
pub fn parse_observations<R>(reader: R) -> Result<Vec<Observation>, DataError>
where
    R: io::Read,
{
    read_rows(reader, |row| {
        let value = match row.optional("value") {
            Some(raw) => Some(raw.parse::<f64>().map_err(|_| DataError::InvalidNumber {
                column: "value".to_owned(),
                value: raw.to_owned(),
            })?),
            None => None,
        };
        Ok(Observation {
            series_id: row.required("series_id")?.to_owned(),
            year: row.integer("year")?,
            period: row.required("period")?.to_owned(),
            value,
            footnotes: split_footnote_codes(row.optional("footnote_codes").unwrap_or_default()),
        })
    })
}

/// Interprets the BLS truthy strings `T`, `TRUE`, `1` and `Y`.
///
/// # Examples
///
/// ```
/// # use kde_cpi_data::parser::parse_flag;
/// assert!(parse_flag("t"));
/// assert!(parse_flag(" Y "));
/// assert!(!parse_flag("F"));
/// assert!(!parse_flag(""));
/// ```
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_uppercase().as_str(),
        "T" | "TRUE" | "1" | "Y"
    )
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

struct Row<'a> {
    headers: &'a [String],
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// The cell of `column`, or `None` if the column is absent or the cell blank.
    fn optional(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.record.get(idx).filter(|value| !value.is_empty())
    }

    fn required(&self, column: &str) -> Result<&'a str, DataError> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| DataError::MissingColumn {
                column: column.to_owned(),
            })?;
        Ok(self.record.get(idx).unwrap_or_default())
    }

    fn text_or(&self, column: &str, default: &str) -> String {
        self.optional(column).unwrap_or(default).to_owned()
    }

    fn integer<T>(&self, column: &str) -> Result<T, DataError>
    where
        T: FromStr,
    {
        let raw = self.required(column)?;
        parse_integer(column, raw)
    }

    fn integer_or<T>(&self, column: &str, default: T) -> Result<T, DataError>
    where
        T: FromStr,
    {
        self.optional(column)
            .map_or(Ok(default), |raw| parse_integer(column, raw))
    }
}

fn parse_integer<T>(column: &str, raw: &str) -> Result<T, DataError>
where
    T: FromStr,
{
    raw.parse().map_err(|_| DataError::InvalidInteger {
        column: column.to_owned(),
        value: raw.to_owned(),
    })
}

fn read_rows<R, T, F>(reader: R, mut parse_row: F) -> Result<Vec<T>, DataError>
where
    R: io::Read,
    F: FnMut(&Row<'_>) -> Result<T, DataError>,
{
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(DataError::Csv)?
        .iter()
        .map(normalize_header)
        .collect::<Vec<_>>();

    let mut rows = vec![];
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(DataError::Csv)? {
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        rows.push(parse_row(&Row {
            headers: &headers,
            record: &record,
        })?);
    }
    Ok(rows)
}
