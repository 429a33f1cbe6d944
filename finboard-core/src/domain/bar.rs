//! Bar and PriceSeries, the daily market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV observation for a single symbol on a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any price field is NaN (provider returned a partial row).
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }

    /// Adjusted close when present, raw close otherwise.
    pub fn price(&self) -> f64 {
        if self.adj_close.is_nan() {
            self.close
        } else {
            self.adj_close
        }
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

/// Which field of a bar to extract as a plain series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 6] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::AdjClose,
        PriceField::Volume,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::AdjClose => "Adj Close",
            PriceField::Volume => "Volume",
        }
    }

    pub fn extract(self, bar: &Bar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
            PriceField::AdjClose => bar.price(),
            PriceField::Volume => bar.volume as f64,
        }
    }
}

impl std::str::FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "adj_close" | "adjclose" => Ok(PriceField::AdjClose),
            "volume" => Ok(PriceField::Volume),
            other => Err(format!(
                "unknown price field '{other}'. Valid: open, high, low, close, adj_close, volume"
            )),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate date {date} in series for {symbol}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}

/// Ordered daily observations for one symbol.
///
/// Dates are strictly increasing; construction sorts and rejects duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.date);
        if let Some(w) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SeriesError::DuplicateDate {
                symbol,
                date: w[0].date,
            });
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn field(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| field.extract(b)).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}
