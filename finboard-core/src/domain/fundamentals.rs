//! Descriptive and fundamental fields for one company.
//!
//! Every field is optional: providers omit fields freely and a missing
//! field is displayed as "N/A" rather than treated as an error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel shown for absent or undefined values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Company officer as listed by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Officer {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub title: Option<String>,
    pub total_pay: Option<f64>,
}

/// Governance risk scores (1 = low, 10 = high).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    pub audit: Option<u32>,
    pub board: Option<u32>,
    pub compensation: Option<u32>,
    pub shareholder_rights: Option<u32>,
    pub overall: Option<u32>,
}

/// Most recent annual statement figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementFigures {
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_equity: Option<f64>,
    pub operating_cash_flow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub long_name: Option<String>,
    pub currency: Option<String>,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub fifty_day_average: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    pub market_cap: Option<f64>,
    pub ebitda: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub profit_margins: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub business_summary: Option<String>,
    pub full_time_employees: Option<u64>,
    #[serde(default)]
    pub officers: Vec<Officer>,
    #[serde(default)]
    pub risk: RiskScores,
    pub held_percent_insiders: Option<f64>,
    pub held_percent_institutions: Option<f64>,
    #[serde(default)]
    pub statements: StatementFigures,
}

impl Fundamentals {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Display wrapper for an optional field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number { value: f64, decimals: usize },
    Percent(f64),
    Integer(i64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn number(v: Option<f64>, decimals: usize) -> Self {
        match v {
            Some(value) if value.is_finite() => FieldValue::Number { value, decimals },
            _ => FieldValue::Missing,
        }
    }

    /// A fraction (0.12) rendered as a percentage ("12.00%").
    pub fn percent(fraction: Option<f64>) -> Self {
        match fraction {
            Some(f) if f.is_finite() => FieldValue::Percent(f * 100.0),
            _ => FieldValue::Missing,
        }
    }

    pub fn integer(v: Option<i64>) -> Self {
        v.map_or(FieldValue::Missing, FieldValue::Integer)
    }

    pub fn text(v: Option<&str>) -> Self {
        match v {
            Some(s) if !s.trim().is_empty() => FieldValue::Text(s.to_string()),
            _ => FieldValue::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number { value, decimals } => write!(f, "{:.*}", *decimals, value),
            FieldValue::Percent(p) => write!(f, "{p:.2}%"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Missing => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Serialized as the rendered text, so "N/A" survives into JSON output.
impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
