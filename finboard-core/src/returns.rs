//! Aligned daily return matrix (T observations × N assets).

use crate::allocator::AllocatorError;
use crate::data::SymbolWarning;
use crate::domain::PriceSeries;
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Row-major daily returns with no missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build from explicit rows. Every row must have one finite value per symbol.
    pub fn new(symbols: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, AllocatorError> {
        let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
        let dates = (0..rows.len())
            .map(|i| base + chrono::Duration::days(i as i64))
            .collect();
        Self::with_dates(symbols, dates, rows)
    }

    pub fn with_dates(
        symbols: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, AllocatorError> {
        if symbols.is_empty() {
            return Err(AllocatorError::NoAssets);
        }
        if dates.len() != rows.len() {
            return Err(AllocatorError::DimensionMismatch {
                expected: rows.len(),
                found: dates.len(),
            });
        }
        for row in &rows {
            if row.len() != symbols.len() {
                return Err(AllocatorError::DimensionMismatch {
                    expected: symbols.len(),
                    found: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(AllocatorError::NonFiniteReturn);
            }
        }
        Ok(Self {
            symbols,
            dates,
            rows,
        })
    }

    /// Percentage returns of each series' adjusted price, aligned on the union
    /// of trading dates. Rows with any missing value are dropped; empty series
    /// are excluded and reported.
    pub fn from_series(
        series: &[PriceSeries],
    ) -> Result<(Self, Vec<SymbolWarning>), AllocatorError> {
        let mut warnings = Vec::new();
        let mut prices: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();
        for s in series {
            if s.is_empty() {
                tracing::warn!(symbol = s.symbol(), "excluded from allocation: empty series");
                warnings.push(SymbolWarning::new(
                    s.symbol(),
                    "no observations, excluded from allocation",
                ));
                continue;
            }
            let by_date = s.bars().iter().map(|b| (b.date, b.price())).collect();
            prices.push((s.symbol().to_string(), by_date));
        }

        if prices.is_empty() {
            return Err(AllocatorError::NoAssets);
        }

        let dates: Vec<NaiveDate> = prices
            .iter()
            .flat_map(|(_, p)| p.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut kept_dates = Vec::new();
        let mut rows = Vec::new();
        for w in dates.windows(2) {
            let row: Option<Vec<f64>> = prices
                .iter()
                .map(|(_, p)| {
                    let prev = p.get(&w[0]).copied()?;
                    let next = p.get(&w[1]).copied()?;
                    stats::pct_change(prev, next)
                })
                .collect();
            if let Some(row) = row {
                kept_dates.push(w[1]);
                rows.push(row);
            }
        }

        let symbols = prices.into_iter().map(|(s, _)| s).collect();
        Ok((Self::with_dates(symbols, kept_dates, rows)?, warnings))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_assets(&self) -> usize {
        self.symbols.len()
    }

    pub fn n_obs(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    /// Per-asset mean daily return.
    pub fn mean_returns(&self) -> Vec<f64> {
        (0..self.n_assets()).map(|j| stats::mean(&self.column(j))).collect()
    }

    /// Sample covariance matrix (N × N) of daily returns.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        let columns: Vec<Vec<f64>> = (0..self.n_assets()).map(|j| self.column(j)).collect();
        columns
            .iter()
            .map(|a| columns.iter().map(|b| stats::sample_covariance(a, b)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;

    fn series(symbol: &str, points: &[(u32, f64)]) -> PriceSeries {
        let bars = points
            .iter()
            .map(|&(day, p)| Bar {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                open: p,
                high: p,
                low: p,
                close: p,
                adj_close: p,
                volume: 0,
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    #[test]
    fn rows_with_gaps_are_dropped() {
        let a = series("A", &[(2, 10.0), (3, 11.0), (4, 12.1), (5, 12.1)]);
        let b = series("B", &[(2, 20.0), (3, 20.0), (5, 22.0)]);
        let (m, warnings) = ReturnMatrix::from_series(&[a, b]).unwrap();
        assert!(warnings.is_empty());
        // Only the 2->3 transition exists for both symbols.
        assert_eq!(m.n_obs(), 1);
        assert!((m.rows()[0][0] - 0.1).abs() < 1e-12);
        assert_eq!(m.rows()[0][1], 0.0);
    }

    #[test]
    fn empty_series_excluded_with_warning() {
        let a = series("A", &[(2, 10.0), (3, 11.0)]);
        let empty = PriceSeries::new("E", vec![]).unwrap();
        let (m, warnings) = ReturnMatrix::from_series(&[a, empty]).unwrap();
        assert_eq!(m.symbols(), &["A".to_string()]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].symbol, "E");
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = ReturnMatrix::new(vec!["A".into(), "B".into()], vec![vec![0.1]]).unwrap_err();
        assert!(matches!(err, AllocatorError::DimensionMismatch { .. }));
    }

    #[test]
    fn nan_rejected() {
        assert!(ReturnMatrix::new(vec!["A".into()], vec![vec![f64::NAN]]).is_err());
    }
}
