//! Views over company fundamentals: comparison table, statement ratios,
//! sector overview rows and the governance summary.
//!
//! Nothing here fails on missing data. Absent inputs and zero denominators
//! produce `None` / [`FieldValue::Missing`], rendered as "N/A".

use crate::domain::{FieldValue, Fundamentals, Officer, StatementFigures, SymbolInfo};
use crate::stats::safe_ratio;
use serde::{Deserialize, Serialize};

/// A row of the comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CurrentPrice,
    Ebitda,
    ReturnOnAssets,
    ReturnOnEquity,
    DilutedEps,
    DebtToEquity,
    NetProfitMargin,
    TrailingPe,
    ForwardPe,
    FreeCashFlow,
}

impl Metric {
    /// Display order.
    pub const ALL: [Metric; 10] = [
        Metric::CurrentPrice,
        Metric::Ebitda,
        Metric::ReturnOnAssets,
        Metric::ReturnOnEquity,
        Metric::DilutedEps,
        Metric::DebtToEquity,
        Metric::NetProfitMargin,
        Metric::TrailingPe,
        Metric::ForwardPe,
        Metric::FreeCashFlow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::CurrentPrice => "Current Price",
            Metric::Ebitda => "EBITDA",
            Metric::ReturnOnAssets => "ROA",
            Metric::ReturnOnEquity => "ROE",
            Metric::DilutedEps => "EPS (diluted)",
            Metric::DebtToEquity => "Debt-to-Equity",
            Metric::NetProfitMargin => "Net Profit Margin",
            Metric::TrailingPe => "P/E Ratio (trailing)",
            Metric::ForwardPe => "P/E Ratio (forward)",
            Metric::FreeCashFlow => "Free Cash Flow",
        }
    }

    pub fn value(self, f: &Fundamentals) -> FieldValue {
        match self {
            Metric::CurrentPrice => FieldValue::number(f.current_price, 2),
            Metric::Ebitda => FieldValue::number(f.ebitda, 0),
            Metric::ReturnOnAssets => FieldValue::number(f.return_on_assets, 4),
            Metric::ReturnOnEquity => FieldValue::number(f.return_on_equity, 4),
            Metric::DilutedEps => FieldValue::number(f.trailing_eps, 2),
            Metric::DebtToEquity => FieldValue::number(f.debt_to_equity, 2),
            Metric::NetProfitMargin => FieldValue::percent(f.profit_margins),
            Metric::TrailingPe => FieldValue::number(f.trailing_pe, 2),
            Metric::ForwardPe => FieldValue::number(f.forward_pe, 2),
            Metric::FreeCashFlow => FieldValue::number(f.free_cash_flow, 0),
        }
    }
}

/// One metric across several companies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: Metric,
    pub label: &'static str,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub symbols: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn build(companies: &[Fundamentals]) -> Self {
        let rows = Metric::ALL
            .into_iter()
            .map(|metric| ComparisonRow {
                metric,
                label: metric.label(),
                values: companies.iter().map(|f| metric.value(f)).collect(),
            })
            .collect();
        Self {
            symbols: companies.iter().map(|f| f.symbol.clone()).collect(),
            rows,
        }
    }

    pub fn row(&self, metric: Metric) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }
}

/// Ratios derived from the latest annual statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementRatios {
    /// Net income / total assets, in percent.
    pub return_on_assets_pct: Option<f64>,
    /// Total liabilities / total equity.
    pub debt_to_equity: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_cash_flow: Option<f64>,
}

impl StatementRatios {
    pub fn compute(s: &StatementFigures) -> Self {
        Self {
            return_on_assets_pct: safe_ratio(s.net_income, s.total_assets).map(|r| r * 100.0),
            debt_to_equity: safe_ratio(s.total_liabilities, s.total_equity),
            net_income: s.net_income,
            operating_cash_flow: s.operating_cash_flow,
        }
    }
}

/// Sector overview line: price momentum against moving averages and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    /// Current price vs 200-day average, percent.
    pub vs_200d_pct: Option<f64>,
    /// Current price vs 50-day average, percent.
    pub vs_50d_pct: Option<f64>,
    /// Current price vs previous close, percent.
    pub day_change_pct: Option<f64>,
    pub market_cap_billions: Option<f64>,
}

impl OverviewRow {
    pub fn build(info: &SymbolInfo, f: &Fundamentals) -> Self {
        let vs = |base: Option<f64>| safe_ratio(f.current_price, base).map(|r| (r - 1.0) * 100.0);
        Self {
            symbol: info.ticker.clone(),
            name: info.name.clone(),
            sector: info.sector.clone(),
            vs_200d_pct: vs(f.two_hundred_day_average),
            vs_50d_pct: vs(f.fifty_day_average),
            day_change_pct: vs(f.previous_close),
            market_cap_billions: f.market_cap.map(|m| m / 1e9),
        }
    }

    /// Row with every metric missing, for symbols whose lookup failed.
    pub fn unavailable(info: &SymbolInfo) -> Self {
        Self::build(info, &Fundamentals::empty(info.ticker.clone()))
    }
}

/// Board risk band for the gauge (scores run 1 to 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=3 => RiskLevel::Low,
            4..=6 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Officer roster and board risk for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Governance {
    pub symbol: String,
    pub company: Option<String>,
    pub officers: Vec<Officer>,
    pub board_risk: Option<u32>,
    pub level: Option<RiskLevel>,
}

impl Governance {
    pub fn from_fundamentals(f: &Fundamentals) -> Self {
        Self {
            symbol: f.symbol.clone(),
            company: f.long_name.clone(),
            officers: f.officers.clone(),
            board_risk: f.risk.board,
            level: f.risk.board.map(RiskLevel::from_score),
        }
    }

    /// Mean age over officers with a known age.
    pub fn average_age(&self) -> Option<f64> {
        let ages: Vec<f64> = self.officers.iter().filter_map(|o| o.age).map(f64::from).collect();
        (!ages.is_empty()).then(|| ages.iter().sum::<f64>() / ages.len() as f64)
    }

    pub fn total_pay(&self) -> Option<f64> {
        let pays: Vec<f64> = self.officers.iter().filter_map(|o| o.total_pay).collect();
        (!pays.is_empty()).then(|| pays.iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td() -> Fundamentals {
        Fundamentals {
            current_price: Some(80.0),
            two_hundred_day_average: Some(100.0),
            fifty_day_average: Some(80.0),
            previous_close: Some(64.0),
            market_cap: Some(140e9),
            profit_margins: Some(0.2512),
            ..Fundamentals::empty("TD.TO")
        }
    }

    #[test]
    fn comparison_table_has_all_rows() {
        let table = ComparisonTable::build(&[td(), Fundamentals::empty("RY.TO")]);
        assert_eq!(table.rows.len(), Metric::ALL.len());
        let margin = table.row(Metric::NetProfitMargin).unwrap();
        assert_eq!(margin.label, "Net Profit Margin");
        assert_eq!(margin.values[0].to_string(), "25.12%");
        assert_eq!(margin.values[1].to_string(), "N/A");
    }

    #[test]
    fn every_metric_reads_its_own_field() {
        let f = Fundamentals {
            current_price: Some(1.0),
            ebitda: Some(2.0),
            return_on_assets: Some(3.0),
            return_on_equity: Some(4.0),
            trailing_eps: Some(5.0),
            debt_to_equity: Some(6.0),
            profit_margins: Some(0.07),
            trailing_pe: Some(8.0),
            forward_pe: Some(9.0),
            free_cash_flow: Some(10.0),
            ..Fundamentals::empty("SU.TO")
        };
        let table = ComparisonTable::build(&[f]);
        let shown: Vec<String> = table.rows.iter().map(|r| r.values[0].to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "1.00", "2", "3.0000", "4.0000", "5.00", "6.00", "7.00%", "8.00", "9.00", "10"
            ]
        );
        let labels: std::collections::HashSet<_> = Metric::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(labels.len(), Metric::ALL.len());
    }

    #[test]
    fn statement_ratios_guard_zero_denominators() {
        let r = StatementRatios::compute(&StatementFigures {
            net_income: Some(5.0),
            total_assets: Some(0.0),
            total_liabilities: Some(60.0),
            total_equity: Some(40.0),
            operating_cash_flow: None,
        });
        assert_eq!(r.return_on_assets_pct, None);
        assert_eq!(r.debt_to_equity, Some(1.5));
    }

    #[test]
    fn statement_roa_is_percent() {
        let r = StatementRatios::compute(&StatementFigures {
            net_income: Some(5.0),
            total_assets: Some(200.0),
            ..StatementFigures::default()
        });
        assert!((r.return_on_assets_pct.unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(r.debt_to_equity, None);
    }

    #[test]
    fn overview_row_percentages() {
        let info = SymbolInfo::new("TD.TO", "Toronto-Dominion Bank", "Financials");
        let row = OverviewRow::build(&info, &td());
        assert!((row.vs_200d_pct.unwrap() + 20.0).abs() < 1e-9);
        assert!(row.vs_50d_pct.unwrap().abs() < 1e-9);
        assert!((row.day_change_pct.unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(row.market_cap_billions, Some(140.0));
        assert_eq!(OverviewRow::unavailable(&info).vs_200d_pct, None);
    }

    #[test]
    fn governance_levels() {
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(7), RiskLevel::High);

        let mut f = Fundamentals::empty("BCE.TO");
        f.risk.board = Some(8);
        f.officers = vec![
            Officer { age: Some(50), total_pay: Some(1e6), ..Officer::default() },
            Officer { age: Some(60), ..Officer::default() },
        ];
        let g = Governance::from_fundamentals(&f);
        assert_eq!(g.level, Some(RiskLevel::High));
        assert_eq!(g.average_age(), Some(55.0));
        assert_eq!(g.total_pay(), Some(1e6));
    }
}
