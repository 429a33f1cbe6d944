//! Plain-text rendering: aligned tables, sparklines and gauges.
//!
//! Every function returns a `String` so output can be tested without a
//! terminal.

use std::fmt::Write as _;

use finboard_core::domain::{ReferenceTable, NOT_AVAILABLE};
use finboard_core::fundamentals::{Governance, OverviewRow};
use finboard_core::sentiment::RankedSentiment;
use finboard_pipeline::{
    AllocationView, DashboardResponse, FundamentalsView, Insights, MacroView, PriceView, Section,
    SectionKind, SymbolIndicators,
};

const TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 40;

// ── Primitives ───────────────────────────────────────────────────────

/// Aligned table. The first column is left-aligned, the rest right-aligned.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers, &widths);
    let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(total));
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&mut out, &cells, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[&str], widths: &[usize]) {
    let parts: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (c, &w))| if i == 0 { format!("{c:<w$}") } else { format!("{c:>w$}") })
        .collect();
    out.push_str(parts.join("  ").trim_end());
    out.push('\n');
}

/// Unicode sparkline of at most `width` points. Undefined values are blank.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if width == 0 || lo > hi {
        return String::new();
    }

    resample(values, width)
        .into_iter()
        .map(|v| {
            if !v.is_finite() {
                ' '
            } else if hi - lo < f64::EPSILON {
                TICKS[3]
            } else {
                let idx = ((v - lo) / (hi - lo) * 7.0).round() as usize;
                TICKS[idx.min(7)]
            }
        })
        .collect()
}

fn resample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    let step = (width - 1).max(1);
    (0..width)
        .map(|i| values[i * (values.len() - 1) / step])
        .collect()
}

/// `[#####-----]` style gauge of `value` out of `max`.
pub fn gauge(value: f64, max: f64, width: usize) -> String {
    let frac = if max > 0.0 && value.is_finite() {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (frac * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn num(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Already-scaled percentage with sign, e.g. "+4.20%".
pub fn signed_pct(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:+.2}%"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "== {title} ==");
}

// ── Views ────────────────────────────────────────────────────────────

pub fn symbols(reference: &ReferenceTable, sector: Option<&str>) -> String {
    let mut out = String::new();
    for (name, members) in reference.by_sector() {
        if sector.is_some_and(|s| !s.eq_ignore_ascii_case(name)) {
            continue;
        }
        heading(&mut out, name);
        let rows: Vec<Vec<String>> = members
            .iter()
            .map(|s| {
                let mark = if s.tracked { "*" } else { "" };
                vec![format!("{}{mark}", s.ticker), s.name.clone()]
            })
            .collect();
        out.push_str(&table(&["Ticker", "Name"], &rows));
        out.push('\n');
    }
    out
}

pub fn prices(view: &PriceView) -> String {
    let rows: Vec<Vec<String>> = view
        .series
        .iter()
        .map(|s| {
            let closes: Vec<f64> = s.bars().iter().map(|b| b.price()).collect();
            let first = closes.iter().copied().find(|v| v.is_finite());
            let last = closes.iter().rev().copied().find(|v| v.is_finite());
            let change = match (first, last) {
                (Some(a), Some(b)) if a != 0.0 => Some((b / a - 1.0) * 100.0),
                _ => None,
            };
            let source = view
                .sources
                .get(s.symbol())
                .map_or_else(|| NOT_AVAILABLE.to_string(), |src| format!("{src:?}"));
            vec![
                s.symbol().to_string(),
                num(last, 2),
                signed_pct(change),
                s.len().to_string(),
                source,
                sparkline(&closes, SPARK_WIDTH),
            ]
        })
        .collect();
    table(&["Symbol", "Last", "Change", "Bars", "Source", "Trend"], &rows)
}

pub fn indicators(items: &[SymbolIndicators]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{} ({} bars)", item.symbol, item.dates.len());
        let rows: Vec<Vec<String>> = item
            .values
            .names()
            .map(|name| {
                let series = item.values.get_series(name).unwrap_or_default();
                vec![
                    name.to_string(),
                    num(item.values.latest(name), 2),
                    sparkline(series, SPARK_WIDTH),
                ]
            })
            .collect();
        out.push_str(&table(&["Indicator", "Latest", "History"], &rows));
        out.push('\n');
    }
    out
}

pub fn fundamentals(view: &FundamentalsView) -> String {
    let mut headers = vec!["Metric"];
    headers.extend(view.table.symbols.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = view
        .table
        .rows
        .iter()
        .map(|r| {
            std::iter::once(r.label.to_string())
                .chain(r.values.iter().map(|v| v.to_string()))
                .collect()
        })
        .collect();
    let mut out = table(&headers, &rows);

    out.push('\n');
    let ratio_rows: Vec<Vec<String>> = view
        .ratios
        .iter()
        .map(|(symbol, r)| {
            vec![
                symbol.clone(),
                num(r.return_on_assets_pct, 2),
                num(r.debt_to_equity, 2),
                num(r.net_income, 0),
                num(r.operating_cash_flow, 0),
            ]
        })
        .collect();
    out.push_str(&table(
        &["Statements", "ROA %", "Debt/Equity", "Net Income", "Operating CF"],
        &ratio_rows,
    ));
    out
}

pub fn allocation(view: &AllocationView) -> String {
    let a = &view.allocation;
    let rows: Vec<Vec<String>> = a
        .symbols
        .iter()
        .zip(&a.weights)
        .zip(&view.amounts)
        .map(|((s, w), (_, amount))| {
            vec![
                s.clone(),
                format!("{:.2}%", w * 100.0),
                format!("{amount:.2}"),
                gauge(*w, 1.0, 20),
            ]
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Profile: {}   Budget: {:.2}", a.profile, view.budget);
    out.push_str(&table(&["Symbol", "Weight", "Amount", ""], &rows));
    let _ = writeln!(out, "Expected return: {:.2}%", a.expected_return * 100.0);
    let _ = writeln!(out, "Volatility:      {:.2}%", a.volatility * 100.0);
    let sharpe = a
        .sharpe
        .map_or_else(|| "undefined (zero volatility)".to_string(), |s| format!("{s:.3}"));
    let _ = writeln!(out, "Sharpe ratio:    {sharpe}");
    let _ = writeln!(out, "Projected value: {:.2}", view.projected_value);
    if !view.excluded.is_empty() {
        let _ = writeln!(out, "Excluded:        {}", view.excluded.join(", "));
    }
    let _ = writeln!(
        out,
        "({} samples over {} observations, seed {})",
        view.samples_evaluated, view.observations, view.seed
    );
    out
}

pub fn macro_table(view: &MacroView) -> String {
    let mut headers = vec!["Year"];
    headers.extend(view.summary.columns.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = view
        .summary
        .rows
        .iter()
        .map(|(year, cells)| {
            std::iter::once(year.to_string())
                .chain(cells.iter().map(|c| num(*c, 2)))
                .collect()
        })
        .collect();
    let mut out = table(&headers, &rows);
    for u in &view.unavailable {
        let _ = writeln!(out, "unavailable: {u}");
    }
    out
}

pub fn sentiment(ranked: &[RankedSentiment]) -> String {
    let rows: Vec<Vec<String>> = ranked
        .iter()
        .map(|r| match r {
            RankedSentiment::Scored(c) => vec![
                c.company.clone(),
                format!("{:.1}", c.score),
                gauge(c.score, 100.0, 20),
                format!(
                    "{}/{}/{}/{}",
                    c.tally.positive, c.tally.negative, c.tally.neutral, c.tally.mixed
                ),
                format!("{:.2}", c.cursor),
            ],
            RankedSentiment::Failed { company, error } => vec![
                company.clone(),
                NOT_AVAILABLE.to_string(),
                error.clone(),
                String::new(),
                String::new(),
            ],
        })
        .collect();
    table(&["Company", "Score", "", "+/-/=/~", "Cursor"], &rows)
}

pub fn insights(i: &Insights) -> String {
    let mut out = i.text.trim_end().to_string();
    out.push('\n');
    if !i.complete {
        let _ = writeln!(
            out,
            "(incomplete: {})",
            i.error.as_deref().unwrap_or("stream ended early")
        );
    }
    out
}

pub fn overview(rows: &[OverviewRow]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.symbol.clone(),
                r.name.clone(),
                signed_pct(r.vs_200d_pct),
                signed_pct(r.vs_50d_pct),
                signed_pct(r.day_change_pct),
                num(r.market_cap_billions, 1),
            ]
        })
        .collect();
    table(
        &["Symbol", "Name", "vs 200d", "vs 50d", "Day", "Mkt Cap (B)"],
        &cells,
    )
}

pub fn governance(g: &Governance) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({})",
        g.company.as_deref().unwrap_or(NOT_AVAILABLE),
        g.symbol
    );
    match (g.board_risk, g.level) {
        (Some(score), Some(level)) => {
            let _ = writeln!(
                out,
                "Board risk: {} {score}/10 ({})",
                gauge(f64::from(score), 10.0, 10),
                level.label()
            );
        }
        _ => {
            let _ = writeln!(out, "Board risk: {NOT_AVAILABLE}");
        }
    }

    let rows: Vec<Vec<String>> = g
        .officers
        .iter()
        .map(|o| {
            vec![
                o.name.clone().unwrap_or_else(|| NOT_AVAILABLE.into()),
                o.age.map_or_else(|| NOT_AVAILABLE.into(), |a| a.to_string()),
                o.title.clone().unwrap_or_else(|| NOT_AVAILABLE.into()),
                num(o.total_pay, 0),
            ]
        })
        .collect();
    out.push_str(&table(&["Officer", "Age", "Title", "Total Pay"], &rows));
    let _ = writeln!(out, "Average age: {}", num(g.average_age(), 1));
    let _ = writeln!(out, "Total pay:   {}", num(g.total_pay(), 0));
    out
}

fn section<T>(out: &mut String, title: &str, s: &Section<T>, body: impl FnOnce(&T) -> String) {
    match s {
        Section::Ok(v) => {
            heading(out, title);
            out.push_str(&body(v));
            out.push('\n');
        }
        Section::Failed(e) => {
            heading(out, title);
            let _ = writeln!(out, "unavailable: {e}\n");
        }
        Section::Skipped => {}
    }
}

/// Every computed section in request order, then warnings.
pub fn response(resp: &DashboardResponse) -> String {
    let mut out = String::new();
    for kind in &resp.request.sections {
        match kind {
            SectionKind::Prices => section(&mut out, "Prices", &resp.prices, prices),
            SectionKind::Indicators => {
                section(&mut out, "Indicators", &resp.indicators, |v| indicators(v))
            }
            SectionKind::Fundamentals => {
                section(&mut out, "Fundamentals", &resp.fundamentals, fundamentals)
            }
            SectionKind::Allocation => {
                section(&mut out, "Allocation", &resp.allocation, allocation)
            }
            SectionKind::Macro => section(&mut out, "Macro", &resp.macro_data, macro_table),
            SectionKind::Sentiment => {
                section(&mut out, "Sentiment", &resp.sentiment, |v| sentiment(v))
            }
            SectionKind::Insights => section(&mut out, "Insights", &resp.insights, insights),
        }
    }
    for w in &resp.warnings {
        let _ = writeln!(out, "warning: {w}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finboard_core::domain::Officer;
    use finboard_core::fundamentals::RiskLevel;
    use finboard_pipeline::DashboardRequest;

    #[test]
    fn gauge_fills_proportionally() {
        assert_eq!(gauge(5.0, 10.0, 10), "[#####-----]");
        assert_eq!(gauge(0.0, 10.0, 4), "[----]");
        assert_eq!(gauge(12.0, 10.0, 4), "[####]");
        assert_eq!(gauge(f64::NAN, 10.0, 4), "[----]");
    }

    #[test]
    fn sparkline_spans_range() {
        assert_eq!(sparkline(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 8), "▁▂▃▄▅▆▇█");
        assert_eq!(sparkline(&[f64::NAN, 1.0, 2.0], 10), " ▁█");
        assert_eq!(sparkline(&[3.0, 3.0], 10), "▄▄");
        assert_eq!(sparkline(&[f64::NAN], 10), "");
    }

    #[test]
    fn sparkline_resamples_to_width() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let s = sparkline(&values, 10);
        assert_eq!(s.chars().count(), 10);
        assert!(s.starts_with('▁'));
        assert!(s.ends_with('█'));
    }

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["Symbol", "Price"],
            &[vec!["RY.TO".into(), "1.5".into()], vec!["TD.TO".into(), "123.25".into()]],
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "Symbol   Price");
        assert_eq!(lines[1], "--------------");
        assert_eq!(lines[2], "RY.TO      1.5");
        assert_eq!(lines[3], "TD.TO   123.25");
    }

    #[test]
    fn missing_numbers_render_na() {
        assert_eq!(num(None, 2), "N/A");
        assert_eq!(num(Some(f64::NAN), 2), "N/A");
        assert_eq!(signed_pct(Some(4.2)), "+4.20%");
        assert_eq!(signed_pct(Some(-1.0)), "-1.00%");
    }

    #[test]
    fn governance_shows_gauge_and_officers() {
        let g = Governance {
            symbol: "RY.TO".into(),
            company: Some("Royal Bank of Canada".into()),
            officers: vec![Officer {
                name: Some("Jane Roe".into()),
                age: Some(58),
                title: None,
                total_pay: Some(1000.0),
            }],
            board_risk: Some(4),
            level: Some(RiskLevel::Medium),
        };
        let out = governance(&g);
        assert!(out.contains("Board risk: [####------] 4/10 (medium)"));
        assert!(out.contains("Jane Roe"));
        assert!(out.contains("Average age: 58.0"));
    }

    #[test]
    fn response_lists_failures_and_warnings() {
        let req = DashboardRequest::new(
            vec!["RY.TO".into()],
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
        )
        .with_sections([SectionKind::Macro, SectionKind::Insights]);
        let mut resp = DashboardResponse::empty(req, vec!["RY.TO".into()]);
        resp.macro_data = Section::Failed("macro data directory is not configured".into());
        resp.insights = Section::Ok(Insights {
            text: "- Small board".into(),
            complete: false,
            error: Some("stream reset".into()),
        });
        resp.warnings.push(finboard_core::data::SymbolWarning::new("X.TO", "timed out"));

        let out = response(&resp);
        assert!(out.contains("== Macro ==\nunavailable: macro data directory is not configured"));
        assert!(out.contains("- Small board\n(incomplete: stream reset)"));
        assert!(out.contains("warning: X.TO: data unavailable (timed out)"));
        assert!(!out.contains("== Prices =="));
    }
}
