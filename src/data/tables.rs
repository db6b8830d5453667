//! Tabular inputs and their per-timestep row selectors.
//!
//! Each table is parsed once and indexed once; lookups during playback are
//! hash or positional reads, never scans.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::error::{GridvizError, LookupMiss, Result};

/// One row of the timestep to wall-clock table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeRow {
    #[serde(deserialize_with = "integral")]
    pub timestep: usize,
    pub time: String,
}

/// Wall-clock labels keyed by timestep.
#[derive(Debug, Clone, Default)]
pub struct TimeTable {
    rows: Vec<TimeRow>,
    by_timestep: HashMap<usize, usize>,
}

impl TimeTable {
    /// Parses `timestep,time` CSV text.
    ///
    /// # Errors
    ///
    /// Returns [`GridvizError::MissingColumn`] without a `timestep` or `time`
    /// header and [`GridvizError::Csv`] when a row is malformed.
    pub fn from_csv(text: &str, source_name: &str) -> Result<Self> {
        let rows = deserialize_rows::<TimeRow>(text, source_name, &["timestep", "time"])?;
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<TimeRow>) -> Self {
        let by_timestep = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.timestep, i))
            .collect();
        Self { rows, by_timestep }
    }

    /// Label for `timestep`, or `None` if the table has no such row.
    pub fn label(&self, timestep: usize) -> Option<&str> {
        self.by_timestep
            .get(&timestep)
            .map(|&i| self.rows[i].time.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Wide per-bus voltages: row `t` holds every bus at timestep `t`.
#[derive(Debug, Clone, Default)]
pub struct VoltageTable {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<f64>>,
}

impl VoltageTable {
    /// Parses a CSV with one header row of bus names.
    ///
    /// Cells that do not parse as numbers are kept as `NaN` and render black.
    ///
    /// # Errors
    ///
    /// Returns [`GridvizError::Csv`] on structural CSV errors (ragged rows).
    pub fn from_csv(text: &str, source_name: &str) -> Result<Self> {
        let csv_err = |source| GridvizError::Csv {
            source_name: source_name.to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(
                record
                    .iter()
                    .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            );
        }
        Ok(Self::from_parts(columns, rows))
    }

    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            columns,
            column_index,
            rows,
        }
    }

    /// The row at position `timestep`.
    pub fn row(&self, timestep: usize) -> Option<&[f64]> {
        self.rows.get(timestep).map(Vec::as_slice)
    }

    /// Voltage of `bus` at `timestep`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupMiss`] when the row or the bus column is absent.
    pub fn value(&self, timestep: usize, bus: &str) -> std::result::Result<f64, LookupMiss> {
        self.column_index
            .get(bus)
            .zip(self.row(timestep))
            .and_then(|(&col, row)| row.get(col).copied())
            .ok_or_else(|| LookupMiss {
                timestep,
                entity: bus.to_string(),
            })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the long per-site load table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadRow {
    #[serde(deserialize_with = "integral")]
    pub timestep: usize,
    #[serde(deserialize_with = "integral")]
    pub school_id: i64,
    pub power: f64,
}

/// Long per-site loads, indexed by timestep and by `(timestep, site)`.
#[derive(Debug, Clone, Default)]
pub struct LoadTable {
    rows: Vec<LoadRow>,
    by_timestep: HashMap<usize, Vec<usize>>,
    by_key: HashMap<(usize, i64), f64>,
}

impl LoadTable {
    /// Parses `timestep,school_id,power` CSV text (extra columns are ignored).
    ///
    /// # Errors
    ///
    /// Returns [`GridvizError::MissingColumn`] when a required header is
    /// absent and [`GridvizError::Csv`] when a key or power field is malformed.
    pub fn from_csv(text: &str, source_name: &str) -> Result<Self> {
        let rows =
            deserialize_rows::<LoadRow>(text, source_name, &["timestep", "school_id", "power"])?;
        Ok(Self::from_rows(rows))
    }

    /// Builds both indexes. A repeated `(timestep, site)` keeps the last row.
    pub fn from_rows(rows: Vec<LoadRow>) -> Self {
        let mut by_timestep: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut by_key = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            by_timestep.entry(row.timestep).or_default().push(i);
            by_key.insert((row.timestep, row.school_id), row.power);
        }
        Self {
            rows,
            by_timestep,
            by_key,
        }
    }

    /// All rows recorded for `timestep`, in file order.
    pub fn rows_at(&self, timestep: usize) -> impl Iterator<Item = &LoadRow> {
        self.by_timestep
            .get(&timestep)
            .into_iter()
            .flatten()
            .map(|&i| &self.rows[i])
    }

    /// Power of `site` at `timestep`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupMiss`] when the table has no row for the pair.
    pub fn power(&self, timestep: usize, site: i64) -> std::result::Result<f64, LookupMiss> {
        self.by_key
            .get(&(timestep, site))
            .copied()
            .ok_or_else(|| LookupMiss {
                timestep,
                entity: site.to_string(),
            })
    }

    /// Sum of all site loads at `timestep`.
    pub fn total_at(&self, timestep: usize) -> f64 {
        self.rows_at(timestep).map(|r| r.power).sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn deserialize_rows<T: for<'de> Deserialize<'de>>(
    text: &str,
    source_name: &str,
    required: &[&str],
) -> Result<Vec<T>> {
    let csv_err = |source| GridvizError::Csv {
        source_name: source_name.to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(csv_err)?;
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(GridvizError::MissingColumn {
            source_name: source_name.to_string(),
            column: (*column).to_string(),
        });
    }
    reader
        .into_deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(csv_err)
}

/// Accepts integer keys written either as `12` or as `12.0`.
fn integral<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = String::deserialize(deserializer)?;
    let n = raw
        .parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
        .ok_or_else(|| serde::de::Error::custom(format!("\"{raw}\" is not an integer")))?;
    T::try_from(n).map_err(|_| serde::de::Error::custom(format!("{n} is out of range")))
}
