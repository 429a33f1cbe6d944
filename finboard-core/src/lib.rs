//! finboard core: market data providers, technical indicators, fundamentals,
//! macro series, the Monte-Carlo allocator, sentiment scoring and the
//! narrative summarizer seam.
//!
//! Everything here is synchronous. External calls go through traits
//! ([`data::DataProvider`], [`data::FundamentalsProvider`],
//! [`data::MacroProvider`], [`sentiment::SnippetSource`],
//! [`sentiment::SentimentClassifier`], [`summarizer::Summarizer`]) so tests
//! and offline runs swap in fixtures.

pub mod allocator;
pub mod data;
pub mod domain;
pub mod fundamentals;
pub mod indicators;
pub mod macro_series;
pub mod returns;
pub mod rng;
pub mod sentiment;
pub mod stats;
pub mod summarizer;
