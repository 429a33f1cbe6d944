//! Technical indicators.
//!
//! Each indicator wraps the corresponding `ta` implementation and exposes a
//! single series aligned 1:1 with the input bars. Values inside the warm-up
//! window (`lookback()` leading bars) are `NaN`. Multi-series indicators
//! (MACD, Bollinger) are exposed as one named instance per line.
//!
//! Bars with a `NaN` close produce `NaN` and are not fed to the underlying
//! state machine, so a single gap does not poison the rest of the series.

pub mod bollinger;
pub mod macd;
pub mod obv;
pub mod rsi;

pub use bollinger::{Bollinger, BollingerBand};
pub use macd::{Macd, MacdLine};
pub use obv::Obv;
pub use rsi::Rsi;

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("invalid parameters for {indicator}: {reason}")]
    InvalidParameter { indicator: String, reason: String },
}

impl IndicatorError {
    pub(crate) fn from_ta(indicator: &str, e: ta::errors::TaError) -> Self {
        IndicatorError::InvalidParameter {
            indicator: indicator.to_string(),
            reason: format!("{e:?}"),
        }
    }
}

pub trait Indicator: Send + Sync {
    /// Series name, e.g. "rsi_14" or "macd_signal".
    fn name(&self) -> &str;

    /// Number of leading bars for which the output is undefined.
    fn lookback(&self) -> usize;

    /// Output has the same length as `bars`; the first `lookback()` values are `NaN`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Overwrite the warm-up region with `NaN`.
pub(crate) fn mask_warmup(values: &mut [f64], lookback: usize) {
    let end = lookback.min(values.len());
    values[..end].fill(f64::NAN);
}

/// Named indicator series for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValues {
    series: BTreeMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Most recent defined value of a series.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.series
            .get(name)?
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Which indicators to compute. Defaults to all four with standard parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSet {
    pub rsi: bool,
    pub macd: bool,
    pub obv: bool,
    pub bollinger: bool,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::all()
    }
}

impl IndicatorSet {
    pub fn all() -> Self {
        Self {
            rsi: true,
            macd: true,
            obv: true,
            bollinger: true,
        }
    }

    pub fn none() -> Self {
        Self {
            rsi: false,
            macd: false,
            obv: false,
            bollinger: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.rsi || self.macd || self.obv || self.bollinger)
    }

    /// Parse a comma-separated list such as "rsi,macd".
    pub fn parse_list(s: &str) -> Result<Self, String> {
        let mut set = Self::none();
        for item in s.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "rsi" => set.rsi = true,
                "macd" => set.macd = true,
                "obv" => set.obv = true,
                "bollinger" | "bb" => set.bollinger = true,
                "all" => set = Self::all(),
                other => {
                    return Err(format!(
                        "unknown indicator '{other}'. Valid: rsi, macd, obv, bollinger, all"
                    ))
                }
            }
        }
        Ok(set)
    }

    /// Instantiate the selected indicators with standard parameters.
    pub fn build(&self) -> Result<Vec<Box<dyn Indicator>>, IndicatorError> {
        let mut out: Vec<Box<dyn Indicator>> = Vec::new();
        if self.rsi {
            out.push(Box::new(Rsi::new(14)?));
        }
        if self.macd {
            for line in [MacdLine::Macd, MacdLine::Signal, MacdLine::Histogram] {
                out.push(Box::new(Macd::new(12, 26, 9, line)?));
            }
        }
        if self.obv {
            out.push(Box::new(Obv::new()));
        }
        if self.bollinger {
            for band in [BollingerBand::Upper, BollingerBand::Middle, BollingerBand::Lower] {
                out.push(Box::new(Bollinger::new(20, 2.0, band)?));
            }
        }
        Ok(out)
    }
}

pub fn compute_set(set: &IndicatorSet, bars: &[Bar]) -> Result<IndicatorValues, IndicatorError> {
    let mut values = IndicatorValues::new();
    for indicator in set.build()? {
        values.insert(indicator.name(), indicator.compute(bars));
    }
    Ok(values)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high/low = ±1.0 around the
/// body, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                adj_close: close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
