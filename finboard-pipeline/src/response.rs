//! Dashboard response: one [`Section`] per component plus per-symbol warnings.

use crate::request::{DashboardRequest, SectionKind};
use chrono::NaiveDate;
use finboard_core::allocator::Allocation;
use finboard_core::data::{DataSource, SymbolWarning};
use finboard_core::domain::{Fundamentals, PriceSeries};
use finboard_core::fundamentals::{ComparisonTable, StatementRatios};
use finboard_core::indicators::IndicatorValues;
use finboard_core::macro_series::MacroSummary;
use finboard_core::sentiment::RankedSentiment;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one component. A failed section never affects the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Section<T> {
    Ok(T),
    Failed(String),
    #[default]
    Skipped,
}

impl<T> Section<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Section::Ok(v),
            Err(e) => Section::Failed(e.to_string()),
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Section::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Section::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Section::Ok(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Section::Skipped)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceView {
    pub series: Vec<PriceSeries>,
    pub sources: BTreeMap<String, DataSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolIndicators {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub values: IndicatorValues,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundamentalsView {
    pub table: ComparisonTable,
    pub ratios: Vec<(String, StatementRatios)>,
    pub companies: Vec<Fundamentals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationView {
    pub allocation: Allocation,
    pub budget: f64,
    pub projected_value: f64,
    pub amounts: Vec<(String, f64)>,
    /// Requested symbols left out for lack of aligned history.
    pub excluded: Vec<String>,
    pub observations: usize,
    pub samples_evaluated: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MacroView {
    pub summary: MacroSummary,
    /// Presets that could not be loaded, as "label: reason".
    pub unavailable: Vec<String>,
}

/// Narrative summary. An interrupted stream still yields the text received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub text: String,
    pub complete: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub request: DashboardRequest,
    /// Tickers the request resolved to.
    pub symbols: Vec<String>,
    pub prices: Section<PriceView>,
    pub indicators: Section<Vec<SymbolIndicators>>,
    pub fundamentals: Section<FundamentalsView>,
    pub allocation: Section<AllocationView>,
    #[serde(rename = "macro")]
    pub macro_data: Section<MacroView>,
    pub sentiment: Section<Vec<RankedSentiment>>,
    pub insights: Section<Insights>,
    pub warnings: Vec<SymbolWarning>,
}

impl DashboardResponse {
    pub fn empty(request: DashboardRequest, symbols: Vec<String>) -> Self {
        Self {
            request,
            symbols,
            prices: Section::Skipped,
            indicators: Section::Skipped,
            fundamentals: Section::Skipped,
            allocation: Section::Skipped,
            macro_data: Section::Skipped,
            sentiment: Section::Skipped,
            insights: Section::Skipped,
            warnings: Vec::new(),
        }
    }

    /// Error message of a section, if it failed.
    pub fn section_error(&self, kind: SectionKind) -> Option<&str> {
        match kind {
            SectionKind::Prices => self.prices.error(),
            SectionKind::Indicators => self.indicators.error(),
            SectionKind::Fundamentals => self.fundamentals.error(),
            SectionKind::Allocation => self.allocation.error(),
            SectionKind::Macro => self.macro_data.error(),
            SectionKind::Sentiment => self.sentiment.error(),
            SectionKind::Insights => self.insights.error(),
        }
    }

    pub fn failed_sections(&self) -> Vec<(SectionKind, &str)> {
        SectionKind::ALL
            .into_iter()
            .filter_map(|k| self.section_error(k).map(|e| (k, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_from_result() {
        let ok: Section<u32> = Section::from_result(Ok::<_, String>(3));
        assert_eq!(ok.ok(), Some(&3));
        let failed: Section<u32> = Section::from_result(Err("timed out"));
        assert_eq!(failed.error(), Some("timed out"));
        assert!(Section::<u32>::default().is_skipped());
    }

    #[test]
    fn section_json_shape() {
        let ok = serde_json::to_value(Section::Ok(1.5)).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "ok", "value": 1.5}));
        let failed = serde_json::to_value(Section::<f64>::Failed("boom".into())).unwrap();
        assert_eq!(failed, serde_json::json!({"status": "failed", "value": "boom"}));
        let skipped = serde_json::to_value(Section::<f64>::Skipped).unwrap();
        assert_eq!(skipped, serde_json::json!({"status": "skipped"}));
    }

    #[test]
    fn failed_sections_listed_in_order() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let req = DashboardRequest::new(vec!["RY.TO".into()], as_of);
        let mut resp = DashboardResponse::empty(req, vec!["RY.TO".into()]);
        resp.insights = Section::Failed("agent down".into());
        resp.macro_data = Section::Failed("no data dir".into());
        assert_eq!(
            resp.failed_sections(),
            vec![(SectionKind::Macro, "no data dir"), (SectionKind::Insights, "agent down")]
        );
    }
}
