//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from the v8 chart API and descriptive/fundamental
//! fields from the v10 quoteSummary API. Handles rate limiting, retries with
//! exponential backoff, bounded request timeouts and the circuit breaker.
//!
//! quoteSummary answers 401 without a session: the client keeps a cookie jar,
//! primes it from `fc.yahoo.com`, fetches a crumb from `/v1/test/getcrumb`
//! and passes it as a query parameter. The crumb lives for the session and is
//! refreshed once when Yahoo rejects it.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every fundamental field is parsed leniently.

use super::circuit_breaker::{CircuitBreaker, ResponseClass};
use super::provider::{DataError, DataProvider, DataSource, FetchResult, FundamentalsProvider};
use crate::domain::{Bar, Fundamentals, Officer, PriceSeries, RiskScores, StatementFigures};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";
const SUMMARY_MODULES: &str = "price,financialData,defaultKeyStatistics,summaryDetail,assetProfile,\
incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Request tuning for the Yahoo client.
#[derive(Debug, Clone)]
pub struct YahooOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    options: YahooOptions,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        options: YahooOptions,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            options,
            crumb: Mutex::new(None),
        })
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        format!(
            "{CHART_BASE}/{symbol}?period1={start_ts}&period2={end_ts}\
             &interval=1d&includeAdjustedClose=true"
        )
    }

    fn summary_url(symbol: &str, crumb: &str) -> String {
        format!(
            "{SUMMARY_BASE}/{symbol}?modules={SUMMARY_MODULES}&crumb={}",
            urlencoding::encode(crumb)
        )
    }

    /// Session crumb, fetched on first use.
    fn crumb(&self) -> Result<String, DataError> {
        if let Some(c) = self.crumb.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            return Ok(c);
        }
        let fresh = self.fetch_crumb()?;
        *self.crumb.lock().unwrap_or_else(|p| p.into_inner()) = Some(fresh.clone());
        Ok(fresh)
    }

    fn forget_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn fetch_crumb(&self) -> Result<String, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }
        // Only the Set-Cookie headers matter; fc.yahoo.com itself answers 404.
        self.client
            .get(COOKIE_URL)
            .header(reqwest::header::REFERER, REFERER)
            .send()
            .map_err(|e| self.transport_error(e))?;

        for url in CRUMB_URLS {
            let resp = match self
                .client
                .get(url)
                .header(reqwest::header::REFERER, REFERER)
                .send()
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!(url, error = %e, "crumb request failed");
                    continue;
                }
            };
            match self.circuit_breaker.record_status(resp.status()) {
                ResponseClass::Refused => return Err(DataError::CircuitBreakerTripped),
                ResponseClass::RateLimited => {
                    return Err(DataError::RateLimited {
                        retry_after_secs: retry_after(&resp),
                    })
                }
                ResponseClass::Success => {}
                _ => continue,
            }
            let body = resp.text().map_err(|e| self.transport_error(e))?;
            if let Some(crumb) = parse_crumb(&body) {
                tracing::debug!("yahoo crumb acquired");
                return Ok(crumb);
            }
        }
        Err(DataError::AuthenticationRequired(
            "could not obtain a Yahoo Finance crumb".into(),
        ))
    }

    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A valid symbol with no trading days in range comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();
            let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());

            // Holidays come back as all-null rows.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(Bar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                adj_close: adj_close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        // Intraday refreshes can repeat the last session's date.
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }

    /// GET with retry and circuit breaker logic, returning the response body.
    fn get_with_retry(&self, symbol: &str, url: &str) -> Result<String, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = self.options.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    match self.circuit_breaker.record_status(status) {
                        ResponseClass::Success => {
                            return resp.text().map_err(|e| self.transport_error(e));
                        }
                        ResponseClass::Refused => return Err(DataError::CircuitBreakerTripped),
                        ResponseClass::RateLimited => {
                            last_error = Some(DataError::RateLimited {
                                retry_after_secs: retry_after(&resp),
                            });
                        }
                        ResponseClass::Unauthorized => {
                            return Err(DataError::AuthenticationRequired(format!(
                                "Yahoo Finance rejected the session for {symbol}"
                            )));
                        }
                        ResponseClass::NotFound => {
                            return Err(DataError::SymbolNotFound {
                                symbol: symbol.to_string(),
                            });
                        }
                        ResponseClass::Failed => {
                            let message = format!("HTTP {status} for {symbol}");
                            last_error = Some(DataError::Other(message));
                        }
                    }
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(self.transport_error(e));
                        continue;
                    }
                    return Err(self.transport_error(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }

    fn transport_error(&self, e: reqwest::Error) -> DataError {
        if e.is_timeout() {
            DataError::Timeout {
                secs: self.options.timeout.as_secs(),
            }
        } else {
            DataError::NetworkUnreachable(e.to_string())
        }
    }
}

fn retry_after(resp: &reqwest::blocking::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

/// A crumb is a short token; HTML error pages and rate-limit notices are not.
fn parse_crumb(body: &str) -> Option<String> {
    let body = body.trim();
    let plausible = !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<');
    plausible.then(|| body.to_string())
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let body = self.get_with_retry(symbol, &Self::chart_url(symbol, start, end))?;
        let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse chart for {symbol}: {e}"))
        })?;
        let bars = Self::parse_chart(symbol, chart)?;
        let series = PriceSeries::new(symbol, bars)
            .map_err(|e| DataError::ValidationError(e.to_string()))?;
        tracing::debug!(symbol, bars = series.len(), "chart parsed");
        Ok(FetchResult {
            series,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

impl FundamentalsProvider for YahooProvider {
    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError> {
        let crumb = self.crumb()?;
        let body = match self.get_with_retry(symbol, &Self::summary_url(symbol, &crumb)) {
            Err(DataError::AuthenticationRequired(_)) => {
                tracing::debug!(symbol, "crumb rejected, refreshing once");
                self.forget_crumb();
                let crumb = self.crumb()?;
                self.get_with_retry(symbol, &Self::summary_url(symbol, &crumb))?
            }
            other => other?,
        };
        let json: Value = serde_json::from_str(&body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse summary for {symbol}: {e}"))
        })?;
        parse_quote_summary(symbol, &json)
    }
}

/// Parse a quoteSummary response. Absent modules or fields become `None`.
pub fn parse_quote_summary(symbol: &str, json: &Value) -> Result<Fundamentals, DataError> {
    let summary = &json["quoteSummary"];
    if let Some(err) = summary.get("error").filter(|e| !e.is_null()) {
        let code = err["code"].as_str().unwrap_or_default();
        if code == "Not Found" {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        return Err(DataError::ResponseFormatChanged(format!(
            "{code}: {}",
            err["description"].as_str().unwrap_or_default()
        )));
    }

    let result = summary
        .pointer("/result/0")
        .ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;

    let price = &result["price"];
    let financial = &result["financialData"];
    let stats = &result["defaultKeyStatistics"];
    let detail = &result["summaryDetail"];
    let profile = &result["assetProfile"];

    let officers = profile["companyOfficers"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter(|o| o.is_object())
                .map(|o| Officer {
                    name: text(&o["name"]),
                    age: o["age"].as_u64().map(|a| a as u32),
                    title: text(&o["title"]),
                    total_pay: raw(&o["totalPay"]),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Fundamentals {
        symbol: symbol.to_string(),
        long_name: text(&price["longName"]).or_else(|| text(&price["shortName"])),
        currency: text(&price["currency"]).or_else(|| text(&financial["financialCurrency"])),
        current_price: raw(&financial["currentPrice"])
            .or_else(|| raw(&price["regularMarketPrice"])),
        previous_close: raw(&detail["previousClose"])
            .or_else(|| raw(&detail["regularMarketPreviousClose"])),
        fifty_day_average: raw(&detail["fiftyDayAverage"]),
        two_hundred_day_average: raw(&detail["twoHundredDayAverage"]),
        market_cap: raw(&detail["marketCap"]).or_else(|| raw(&price["marketCap"])),
        ebitda: raw(&financial["ebitda"]),
        return_on_assets: raw(&financial["returnOnAssets"]),
        return_on_equity: raw(&financial["returnOnEquity"]),
        trailing_eps: raw(&stats["trailingEps"]),
        trailing_pe: raw(&detail["trailingPE"]),
        forward_pe: raw(&stats["forwardPE"]).or_else(|| raw(&detail["forwardPE"])),
        debt_to_equity: raw(&financial["debtToEquity"]),
        profit_margins: raw(&financial["profitMargins"])
            .or_else(|| raw(&stats["profitMargins"])),
        free_cash_flow: raw(&financial["freeCashflow"]),
        industry: text(&profile["industry"]),
        sector: text(&profile["sector"]),
        business_summary: text(&profile["longBusinessSummary"]),
        full_time_employees: profile["fullTimeEmployees"].as_u64(),
        officers,
        risk: RiskScores {
            audit: score(&profile["auditRisk"]),
            board: score(&profile["boardRisk"]),
            compensation: score(&profile["compensationRisk"]),
            shareholder_rights: score(&profile["shareHolderRightsRisk"]),
            overall: score(&profile["overallRisk"]),
        },
        held_percent_insiders: raw(&stats["heldPercentInsiders"]),
        held_percent_institutions: raw(&stats["heldPercentInstitutions"]),
        statements: parse_statements(result),
    })
}

/// Latest annual statement of each kind; the arrays are newest first.
fn parse_statements(result: &Value) -> StatementFigures {
    let income = &result["incomeStatementHistory"]["incomeStatementHistory"][0];
    let balance = &result["balanceSheetHistory"]["balanceSheetStatements"][0];
    let cash = &result["cashflowStatementHistory"]["cashflowStatements"][0];
    StatementFigures {
        net_income: raw(&income["netIncome"]),
        total_assets: raw(&balance["totalAssets"]),
        total_liabilities: raw(&balance["totalLiab"]),
        total_equity: raw(&balance["totalStockholderEquity"]),
        operating_cash_flow: raw(&cash["totalCashFromOperatingActivities"]),
    }
}

/// Yahoo wraps numbers as `{"raw": 1.2, "fmt": "1.20"}`; `{}` means missing.
fn raw(v: &Value) -> Option<f64> {
    v.get("raw").and_then(Value::as_f64).or_else(|| v.as_f64())
}

fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn score(v: &Value) -> Option<u32> {
    v.as_u64().map(|s| s as u32)
}
