//! Macroeconomic series: calendar-year resampling and year-over-year change.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroObservation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Observations of one statistics table after filtering, sorted by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSeries {
    pub table_id: String,
    pub observations: Vec<MacroObservation>,
}

impl MacroSeries {
    pub fn new(table_id: impl Into<String>, mut observations: Vec<MacroObservation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self {
            table_id: table_id.into(),
            observations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// One value per calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: Option<f64>,
}

/// Mean of the finite observations falling in each calendar year, ascending.
pub fn annual_mean(observations: &[MacroObservation]) -> Vec<YearValue> {
    let mut buckets: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.value.is_finite()) {
        let entry = buckets.entry(obs.date.year()).or_insert((0.0, 0));
        entry.0 += obs.value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(year, (sum, n))| YearValue {
            year,
            value: Some(sum / n as f64),
        })
        .collect()
}

/// Percent change between consecutive entries.
///
/// The first year has no predecessor and yields `None`, as does any year
/// whose predecessor is missing or zero.
pub fn year_over_year(annual: &[YearValue]) -> Vec<YearValue> {
    annual
        .iter()
        .enumerate()
        .map(|(i, cur)| {
            let value = match (i.checked_sub(1).map(|p| annual[p].value), cur.value) {
                (Some(Some(prev)), Some(now)) if prev != 0.0 => Some((now - prev) / prev * 100.0),
                _ => None,
            };
            YearValue {
                year: cur.year,
                value,
            }
        })
        .collect()
}

/// How a table's annual means are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroTransform {
    /// The table already holds a rate of change; show the yearly mean.
    AnnualMean,
    /// Show the percent change of the yearly mean.
    YearOverYear,
}

impl MacroTransform {
    pub fn apply(self, observations: &[MacroObservation]) -> Vec<YearValue> {
        let annual = annual_mean(observations);
        match self {
            MacroTransform::AnnualMean => annual,
            MacroTransform::YearOverYear => year_over_year(&annual),
        }
    }
}

/// Several named annual series joined on year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSummary {
    pub columns: Vec<String>,
    /// Most recent year first.
    pub rows: Vec<(i32, Vec<Option<f64>>)>,
}

impl MacroSummary {
    /// Outer join of `series` on year, sorted descending.
    pub fn merge(series: &[(String, Vec<YearValue>)]) -> Self {
        let years: BTreeSet<i32> = series
            .iter()
            .flat_map(|(_, values)| values.iter().map(|v| v.year))
            .collect();

        let rows = years
            .into_iter()
            .rev()
            .map(|year| {
                let cells = series
                    .iter()
                    .map(|(_, values)| {
                        values.iter().find(|v| v.year == year).and_then(|v| v.value)
                    })
                    .collect();
                (year, cells)
            })
            .collect();

        Self {
            columns: series.iter().map(|(name, _)| name.clone()).collect(),
            rows,
        }
    }

    /// Values of one column, oldest year first (for charting).
    pub fn column(&self, name: &str) -> Option<Vec<(i32, Option<f64>)>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .rev()
                .map(|(year, cells)| (*year, cells[idx]))
                .collect(),
        )
    }
}
