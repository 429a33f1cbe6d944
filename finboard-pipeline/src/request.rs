//! Explicit dashboard request.
//!
//! Everything a run depends on is carried here; nothing is read from ambient
//! session state.

use chrono::NaiveDate;
use finboard_core::allocator::RiskProfile;
use finboard_core::data::Period;
use finboard_core::indicators::IndicatorSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BUDGET: f64 = 10_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("no symbols requested")]
    NoSymbols,

    #[error("no sections requested")]
    NoSections,

    #[error("budget must be a non-negative finite amount, got {0}")]
    InvalidBudget(f64),
}

/// One independently computed part of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Prices,
    Indicators,
    Fundamentals,
    Allocation,
    Macro,
    Sentiment,
    Insights,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Prices,
        SectionKind::Indicators,
        SectionKind::Fundamentals,
        SectionKind::Allocation,
        SectionKind::Macro,
        SectionKind::Sentiment,
        SectionKind::Insights,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Prices => "prices",
            SectionKind::Indicators => "indicators",
            SectionKind::Fundamentals => "fundamentals",
            SectionKind::Allocation => "allocation",
            SectionKind::Macro => "macro",
            SectionKind::Sentiment => "sentiment",
            SectionKind::Insights => "insights",
        }
    }

    /// Parse a comma-separated list such as "prices,allocation" or "all".
    pub fn parse_list(s: &str) -> Result<BTreeSet<Self>, String> {
        let mut out = BTreeSet::new();
        for item in s.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            if item.eq_ignore_ascii_case("all") {
                out.extend(Self::ALL);
            } else {
                out.insert(item.parse()?);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                format!(
                    "unknown section '{key}'. Valid: prices, indicators, fundamentals, \
                     allocation, macro, sentiment, insights, all"
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    /// Tickers or company names from the reference table.
    pub symbols: Vec<String>,
    pub period: Period,
    /// "Today" for period resolution.
    pub as_of: NaiveDate,
    pub indicators: IndicatorSet,
    pub sections: BTreeSet<SectionKind>,
    pub budget: f64,
    pub risk_profile: RiskProfile,
    /// Overrides the configured master seed.
    pub seed: Option<u64>,
}

impl DashboardRequest {
    /// Request for every section with default period, budget and profile.
    pub fn new(symbols: Vec<String>, as_of: NaiveDate) -> Self {
        Self {
            symbols,
            period: Period::default(),
            as_of,
            indicators: IndicatorSet::all(),
            sections: SectionKind::ALL.into_iter().collect(),
            budget: DEFAULT_BUDGET,
            risk_profile: RiskProfile::default(),
            seed: None,
        }
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = SectionKind>) -> Self {
        self.sections = sections.into_iter().collect();
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_profile(mut self, profile: RiskProfile, budget: f64) -> Self {
        self.risk_profile = profile;
        self.budget = budget;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn wants(&self, kind: SectionKind) -> bool {
        self.sections.contains(&kind)
    }

    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        self.period.range(self.as_of)
    }

    /// Whether any requested section needs price history.
    pub fn needs_prices(&self) -> bool {
        self.wants(SectionKind::Prices)
            || self.wants(SectionKind::Indicators)
            || self.wants(SectionKind::Allocation)
    }

    pub fn needs_fundamentals(&self) -> bool {
        self.wants(SectionKind::Fundamentals) || self.wants(SectionKind::Insights)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(RequestError::NoSymbols);
        }
        if self.sections.is_empty() {
            return Err(RequestError::NoSections);
        }
        if !(self.budget.is_finite() && self.budget >= 0.0) {
            return Err(RequestError::InvalidBudget(self.budget));
        }
        Ok(())
    }
}
