//! Market and macroeconomic data access.

pub mod cache;
pub mod circuit_breaker;
pub mod fetch;
pub mod period;
pub mod provider;
pub mod statcan;
pub mod yahoo;

pub use cache::{CacheKey, CachedProvider, SessionCache};
pub use circuit_breaker::CircuitBreaker;
pub use fetch::{fetch_universe, SymbolWarning, UniverseFetch};
pub use period::Period;
pub use provider::{
    DataError, DataProvider, DataSource, FetchProgress, FetchResult, FundamentalsProvider,
    LogProgress, SilentProgress,
};
pub use statcan::{MacroPreset, MacroProvider, StatCanCsvProvider, PRESETS};
pub use yahoo::{YahooOptions, YahooProvider};
