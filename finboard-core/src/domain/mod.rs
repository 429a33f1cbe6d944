//! Domain types for finboard

pub mod bar;
pub mod fundamentals;
pub mod symbol;

pub use bar::{Bar, PriceField, PriceSeries, SeriesError};
pub use fundamentals::{
    FieldValue, Fundamentals, Officer, RiskScores, StatementFigures, NOT_AVAILABLE,
};
pub use symbol::{ReferenceTable, SymbolInfo};

/// Symbol type alias
pub type Symbol = String;
