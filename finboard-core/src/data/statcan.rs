//! Statistics Canada full-table CSV reader.
//!
//! Tables are the agency's "download entire table" CSV files, stored as
//! `{data_dir}/{digits}.csv` where `digits` is the table id without dashes
//! and without the trailing view suffix (`36-10-0104-01` -> `36100104.csv`).
//! Columns: `REF_DATE`, `GEO`, one column per dimension, ..., `VALUE`.

use super::provider::DataError;
use crate::macro_series::{MacroObservation, MacroSeries, MacroTransform};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Column filter: keep rows where `column == value`.
pub type Filter = (String, String);

pub trait MacroProvider: Send + Sync {
    fn table(&self, table_id: &str, filters: &[Filter]) -> Result<MacroSeries, DataError>;
}

/// A named table query as shown on the macro page.
#[derive(Debug, Clone)]
pub struct MacroPreset {
    pub key: &'static str,
    pub label: &'static str,
    pub table_id: &'static str,
    pub filters: &'static [(&'static str, &'static str)],
    pub transform: MacroTransform,
}

impl MacroPreset {
    pub fn filters(&self) -> Vec<Filter> {
        self.filters
            .iter()
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .collect()
    }
}

pub const PRESETS: &[MacroPreset] = &[
    MacroPreset {
        key: "consumer_spending",
        label: "Consumer Spending Annual Variation (%)",
        table_id: "36-10-0101-01",
        filters: &[
            ("Quintile", "All quintiles"),
            ("Socio-demographic characteristics", "All households"),
        ],
        transform: MacroTransform::YearOverYear,
    },
    MacroPreset {
        key: "bank_rate",
        label: "Interest Rate Annual Variation (%)",
        table_id: "10-10-0122-01",
        filters: &[("Rates", "Bank rate")],
        transform: MacroTransform::YearOverYear,
    },
    MacroPreset {
        key: "gdp",
        label: "GDP Annual Variation (%)",
        table_id: "36-10-0104-01",
        filters: &[
            ("Prices", "Chained (2017) dollars percentage change"),
            ("Seasonal adjustment", "Seasonally adjusted at annual rates"),
            ("Estimates", "Gross domestic product at market prices"),
        ],
        transform: MacroTransform::AnnualMean,
    },
    MacroPreset {
        key: "inflation",
        label: "Inflation Annual Variation (%)",
        table_id: "18-10-0004-01",
        filters: &[("Products and product groups", "All-items")],
        transform: MacroTransform::YearOverYear,
    },
];

pub fn preset(key: &str) -> Option<&'static MacroPreset> {
    PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
}

pub struct StatCanCsvProvider {
    data_dir: PathBuf,
    start: NaiveDate,
    geo: String,
}

impl StatCanCsvProvider {
    pub fn new(data_dir: impl Into<PathBuf>, start: NaiveDate) -> Self {
        Self {
            data_dir: data_dir.into(),
            start,
            geo: "Canada".into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn table_path(&self, table_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", table_file_stem(table_id)))
    }

    fn parse(
        &self,
        table_id: &str,
        reader: impl std::io::Read,
        filters: &[Filter],
    ) -> Result<MacroSeries, DataError> {
        let unavailable = |reason: String| DataError::TableUnavailable {
            table_id: table_id.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| unavailable(format!("unreadable header: {e}")))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| unavailable(format!("missing column '{name}'")))
        };
        let date_idx = column("REF_DATE")?;
        let geo_idx = column("GEO")?;
        let value_idx = column("VALUE")?;
        let filter_idx = filters
            .iter()
            .map(|(c, v)| Ok((column(c)?, v.as_str())))
            .collect::<Result<Vec<_>, DataError>>()?;

        let mut observations = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| unavailable(format!("malformed row: {e}")))?;
            let field = |i: usize| record.get(i).unwrap_or("").trim();

            if field(geo_idx) != self.geo {
                continue;
            }
            if filter_idx.iter().any(|(i, v)| field(*i) != *v) {
                continue;
            }
            let Some(date) = parse_ref_date(field(date_idx)) else {
                continue;
            };
            if date < self.start {
                continue;
            }
            // Suppressed or confidential cells ("..", "x", "F") are dropped.
            let Ok(value) = field(value_idx).parse::<f64>() else {
                continue;
            };
            observations.push(MacroObservation { date, value });
        }

        tracing::debug!(table_id, rows = observations.len(), "statcan table parsed");
        Ok(MacroSeries::new(table_id, observations))
    }
}

impl MacroProvider for StatCanCsvProvider {
    fn table(&self, table_id: &str, filters: &[Filter]) -> Result<MacroSeries, DataError> {
        let path = self.table_path(table_id);
        let file = std::fs::File::open(&path).map_err(|e| DataError::TableUnavailable {
            table_id: table_id.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        self.parse(table_id, std::io::BufReader::new(file), filters)
    }
}

/// `36-10-0104-01` -> `36100104`.
pub fn table_file_stem(table_id: &str) -> String {
    let digits: String = table_id.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        digits[..8].to_string()
    } else {
        digits
    }
}

/// `REF_DATE` comes as `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
fn parse_ref_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d"))
        .ok()
}
