//! Finboard pipeline: configuration, explicit request/response objects and
//! the single fetch → compute pipeline behind every dashboard view.
//!
//! - [`Config`]: TOML configuration with defaults for every field
//! - [`DashboardRequest`]: symbols, period, indicators, sections, budget, profile, seed
//! - [`Dashboard`]: collaborators plus the per-section pipeline
//! - [`DashboardResponse`]: one [`Section`] per component and per-symbol warnings

pub mod config;
pub mod dashboard;
pub mod request;
pub mod response;

pub use config::{Config, ConfigError};
pub use dashboard::{Dashboard, PipelineError};
pub use request::{DashboardRequest, RequestError, SectionKind, DEFAULT_BUDGET};
pub use response::{
    AllocationView, DashboardResponse, FundamentalsView, Insights, MacroView, PriceView, Section,
    SymbolIndicators,
};
