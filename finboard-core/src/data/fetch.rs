//! Multi-symbol price loading.
//!
//! A symbol that errors or comes back empty is skipped and reported as a
//! [`SymbolWarning`]; the batch itself always completes.

use super::provider::{DataProvider, DataSource, FetchProgress};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A symbol that produced no usable data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolWarning {
    pub symbol: String,
    pub reason: String,
}

impl SymbolWarning {
    pub fn new(symbol: &str, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SymbolWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: data unavailable ({})", self.symbol, self.reason)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UniverseFetch {
    /// Series in request order.
    pub series: Vec<PriceSeries>,
    pub sources: BTreeMap<String, DataSource>,
    pub warnings: Vec<SymbolWarning>,
}

impl UniverseFetch {
    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series
            .iter()
            .find(|s| s.symbol().eq_ignore_ascii_case(symbol))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.symbol()).collect()
    }
}

/// Fetch every symbol over `[start, end]`, collecting per-symbol warnings.
pub fn fetch_universe(
    symbols: &[String],
    provider: &dyn DataProvider,
    progress: &dyn FetchProgress,
    start: NaiveDate,
    end: NaiveDate,
) -> UniverseFetch {
    let total = symbols.len();
    let mut out = UniverseFetch::default();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let outcome = match provider.fetch(symbol, start, end) {
            Ok(result) if result.series.is_empty() => Err("no observations in period".to_string()),
            Ok(result) => {
                out.sources.insert(symbol.clone(), result.source);
                out.series.push(result.series);
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = &outcome {
            out.warnings.push(SymbolWarning::new(symbol, reason.clone()));
        }
        progress.on_complete(symbol, i, total, &outcome);
    }

    progress.on_batch_complete(out.series.len(), out.warnings.len(), total);
    out
}
