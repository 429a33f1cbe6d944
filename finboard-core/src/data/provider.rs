//! Data provider traits and structured error types.
//!
//! The provider traits abstract over data sources (Yahoo Finance, statistics
//! agency CSV tables) so implementations can be swapped and mocked in tests.

use crate::domain::{Fundamentals, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are displayable as-is in CLI output and dashboard sections.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price observations for {symbol} in the requested period")]
    EmptySeries { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("table {table_id} not available: {reason}")]
    TableUnavailable { table_id: String, reason: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful price fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series: PriceSeries,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    StatCanCsv,
    SessionCache,
    Fixture,
}

/// Historical daily prices.
///
/// Implementations handle the specifics of one source. The session cache
/// wraps this trait; providers don't know about it.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Per-symbol descriptive and fundamental fields.
pub trait FundamentalsProvider: Send + Sync {
    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DataError>;
}

/// Progress callback for multi-symbol operations.
pub trait FetchProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<(), String>);

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits tracing events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, "fetching [{}/{}]", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, result: &Result<(), String>) {
        match result {
            Ok(()) => tracing::debug!(symbol, "fetched"),
            Err(e) => tracing::warn!(symbol, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "fetch batch complete");
    }
}

/// Progress reporter that ignores every event.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<(), String>,
    ) {
    }
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
