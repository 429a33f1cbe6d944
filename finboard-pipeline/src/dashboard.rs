//! The fetch → compute pipeline.
//!
//! [`Dashboard`] owns the collaborators (providers, snippet source,
//! classifier, summarizer) and turns a [`DashboardRequest`] into a
//! [`DashboardResponse`]. Each section is computed independently: a failure
//! is recorded as [`Section::Failed`] and the remaining sections still run.

use std::sync::Arc;

use finboard_core::allocator::allocate;
use finboard_core::data::{
    fetch_universe, CachedProvider, CircuitBreaker, DataError, DataProvider, FetchProgress,
    FundamentalsProvider, LogProgress, MacroProvider, StatCanCsvProvider, SymbolWarning,
    UniverseFetch, YahooProvider, PRESETS,
};
use finboard_core::domain::{Fundamentals, ReferenceTable};
use finboard_core::fundamentals::{ComparisonTable, Governance, OverviewRow, StatementRatios};
use finboard_core::indicators::{compute_set, IndicatorError};
use finboard_core::macro_series::MacroSummary;
use finboard_core::returns::ReturnMatrix;
use finboard_core::rng::SeedHierarchy;
use finboard_core::sentiment::{
    rank_companies, FileSnippetSource, HttpSnippetSource, LexiconClassifier, RankedSentiment,
    SentimentClassifier, SentimentError, SnippetSource,
};
use finboard_core::summarizer::{
    insights_prompt, HttpSummarizer, SessionId, Summarizer, SummaryError,
};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::request::{DashboardRequest, RequestError, SectionKind};
use crate::response::{
    AllocationView, DashboardResponse, FundamentalsView, Insights, MacroView, PriceView, Section,
    SymbolIndicators,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),
    #[error("sentiment error: {0}")]
    Sentiment(#[from] SentimentError),
    #[error("summarizer error: {0}")]
    Summary(#[from] SummaryError),
    #[error("unknown sector '{0}'")]
    UnknownSector(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

pub struct Dashboard {
    config: Config,
    reference: ReferenceTable,
    prices: Box<dyn DataProvider>,
    fundamentals: Box<dyn FundamentalsProvider>,
    macro_data: Option<Box<dyn MacroProvider>>,
    snippets: Option<Box<dyn SnippetSource>>,
    classifier: Box<dyn SentimentClassifier>,
    summarizer: Option<Box<dyn Summarizer>>,
    progress: Box<dyn FetchProgress>,
}

impl Dashboard {
    /// Dashboard with the required providers; optional collaborators start unset.
    pub fn new(
        config: Config,
        reference: ReferenceTable,
        prices: Box<dyn DataProvider>,
        fundamentals: Box<dyn FundamentalsProvider>,
    ) -> Self {
        Self {
            config,
            reference,
            prices,
            fundamentals,
            macro_data: None,
            snippets: None,
            classifier: Box::new(LexiconClassifier::default()),
            summarizer: None,
            progress: Box::new(LogProgress),
        }
    }

    /// Wire the live providers named by `config`.
    ///
    /// Prices and fundamentals share one circuit breaker, so a block on one
    /// endpoint stops the other too. Price history is memoized for the
    /// lifetime of the dashboard.
    pub fn from_config(config: Config) -> Result<Self, PipelineError> {
        let breaker = Arc::new(CircuitBreaker::new(config.breaker_cooldown()));
        let prices = CachedProvider::new(YahooProvider::new(
            Arc::clone(&breaker),
            config.yahoo_options(),
        )?);
        let fundamentals = YahooProvider::new(breaker, config.yahoo_options())?;
        let reference = config.reference_table()?;

        let macro_data: Option<Box<dyn MacroProvider>> =
            config.macro_data.data_dir.as_ref().map(|dir| {
                Box::new(StatCanCsvProvider::new(dir, config.macro_data.start))
                    as Box<dyn MacroProvider>
            });

        let snippets: Option<Box<dyn SnippetSource>> = match (
            &config.sentiment.snippets_dir,
            &config.sentiment.endpoint,
        ) {
            (Some(dir), _) => Some(Box::new(FileSnippetSource::new(dir))),
            (None, Some(url)) => Some(Box::new(HttpSnippetSource::new(
                url.clone(),
                config.sentiment_timeout(),
            )?)),
            (None, None) => None,
        };

        let summarizer: Option<Box<dyn Summarizer>> = match &config.agent.endpoint {
            Some(url) => Some(Box::new(HttpSummarizer::new(
                url.clone(),
                config.agent_timeout(),
            )?)),
            None => None,
        };

        let mut dashboard = Self::new(config, reference, Box::new(prices), Box::new(fundamentals));
        dashboard.macro_data = macro_data;
        dashboard.snippets = snippets;
        dashboard.summarizer = summarizer;
        Ok(dashboard)
    }

    pub fn with_macro(mut self, provider: Box<dyn MacroProvider>) -> Self {
        self.macro_data = Some(provider);
        self
    }

    pub fn with_snippets(mut self, source: Box<dyn SnippetSource>) -> Self {
        self.snippets = Some(source);
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn SentimentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn FetchProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceTable {
        &self.reference
    }

    /// Map tickers or company names to tickers, dropping blanks and duplicates.
    /// Keys missing from the reference table pass through upper-cased.
    pub fn resolve_symbols(&self, keys: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for key in keys.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            let ticker = self
                .reference
                .resolve(key)
                .map_or_else(|| key.to_ascii_uppercase(), |s| s.ticker.clone());
            if !out.contains(&ticker) {
                out.push(ticker);
            }
        }
        out
    }

    /// Display names for sentiment lookups, falling back to the ticker.
    fn company_names(&self, tickers: &[String]) -> Vec<String> {
        tickers
            .iter()
            .map(|t| self.reference.by_ticker(t).map_or_else(|| t.clone(), |s| s.name.clone()))
            .collect()
    }

    /// Run every requested section.
    ///
    /// Only an invalid request is an error; component failures are reported
    /// inside the response.
    pub fn run(&self, request: &DashboardRequest) -> Result<DashboardResponse, PipelineError> {
        request.validate()?;
        let symbols = self.resolve_symbols(&request.symbols);
        let (start, end) = request.date_range();
        tracing::info!(
            symbols = symbols.len(),
            sections = request.sections.len(),
            %start,
            %end,
            "dashboard run"
        );

        let mut resp = DashboardResponse::empty(request.clone(), symbols.clone());

        let fetched = request.needs_prices().then(|| {
            fetch_universe(&symbols, self.prices.as_ref(), self.progress.as_ref(), start, end)
        });
        if let Some(f) = &fetched {
            resp.warnings.extend(f.warnings.iter().cloned());
        }

        let companies = if request.needs_fundamentals() {
            self.fundamentals_for(&symbols, &mut resp.warnings)
        } else {
            Vec::new()
        };

        for kind in &request.sections {
            match kind {
                SectionKind::Prices => {
                    let view = fetched.as_ref().map_or_else(no_prices, price_view);
                    resp.prices = section(*kind, view);
                }
                SectionKind::Indicators => {
                    resp.indicators = if request.indicators.is_empty() {
                        Section::Skipped
                    } else {
                        section(*kind, self.indicators(request, fetched.as_ref()))
                    };
                }
                SectionKind::Fundamentals => {
                    resp.fundamentals = section(*kind, fundamentals_view(&companies));
                }
                SectionKind::Allocation => {
                    let result = match &fetched {
                        Some(f) => self.allocation(request, &symbols, f, &mut resp.warnings),
                        None => no_prices(),
                    };
                    resp.allocation = section(*kind, result);
                }
                SectionKind::Macro => {
                    resp.macro_data = section(*kind, self.macro_view());
                }
                SectionKind::Sentiment => {
                    resp.sentiment = section(*kind, self.sentiment(&self.company_names(&symbols)));
                }
                SectionKind::Insights => {
                    resp.insights = section(*kind, self.insights(&companies));
                }
            }
        }

        Ok(resp)
    }

    /// Fundamentals for each symbol; lookup failures become warnings.
    pub fn fundamentals_for(
        &self,
        symbols: &[String],
        warnings: &mut Vec<SymbolWarning>,
    ) -> Vec<Fundamentals> {
        symbols
            .iter()
            .filter_map(|s| match self.fundamentals.fundamentals(s) {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!(symbol = %s, error = %e, "fundamentals unavailable");
                    warnings.push(SymbolWarning::new(s, format!("fundamentals: {e}")));
                    None
                }
            })
            .collect()
    }

    fn indicators(
        &self,
        request: &DashboardRequest,
        fetched: Option<&UniverseFetch>,
    ) -> Result<Vec<SymbolIndicators>, PipelineError> {
        let fetched = fetched.ok_or_else(|| DataError::Other("price data was not fetched".into()))?;
        if fetched.series.is_empty() {
            return Err(DataError::Other("no price data for any symbol".into()).into());
        }
        fetched
            .series
            .iter()
            .map(|s| -> Result<SymbolIndicators, PipelineError> {
                Ok(SymbolIndicators {
                    symbol: s.symbol().to_string(),
                    dates: s.dates(),
                    values: compute_set(&request.indicators, s.bars())?,
                })
            })
            .collect()
    }

    fn allocation(
        &self,
        request: &DashboardRequest,
        symbols: &[String],
        fetched: &UniverseFetch,
        warnings: &mut Vec<SymbolWarning>,
    ) -> Result<AllocationView, String> {
        let (matrix, matrix_warnings) =
            ReturnMatrix::from_series(&fetched.series).map_err(|e| e.to_string())?;
        warnings.extend(matrix_warnings);

        let seeds = SeedHierarchy::new(request.seed.unwrap_or(self.config.allocator.seed));
        let mut rng = seeds.rng_for(matrix.symbols(), request.risk_profile);
        let run = allocate(
            &matrix,
            request.risk_profile,
            &self.config.allocator_config(),
            &mut rng,
        )
        .map_err(|e| e.to_string())?;

        let allocation = run.allocation;
        let amounts = allocation
            .amounts(request.budget)
            .into_iter()
            .map(|(s, a)| (s.to_string(), a))
            .collect();
        let excluded = symbols
            .iter()
            .filter(|s| !matrix.symbols().contains(s))
            .cloned()
            .collect();

        tracing::info!(
            profile = %request.risk_profile,
            assets = matrix.n_assets(),
            observations = matrix.n_obs(),
            expected_return = allocation.expected_return,
            "allocation selected"
        );

        Ok(AllocationView {
            budget: request.budget,
            projected_value: allocation.projected_value(request.budget),
            amounts,
            excluded,
            observations: matrix.n_obs(),
            samples_evaluated: run.samples.len(),
            seed: seeds.master_seed(),
            allocation,
        })
    }

    /// Annual macro table over every preset; presets that fail are listed
    /// as unavailable rather than failing the view.
    pub fn macro_view(&self) -> Result<MacroView, PipelineError> {
        let provider = self
            .macro_data
            .as_deref()
            .ok_or(PipelineError::NotConfigured("macro data directory"))?;

        let mut named = Vec::new();
        let mut unavailable = Vec::new();
        for preset in PRESETS {
            match provider.table(preset.table_id, &preset.filters()) {
                Ok(series) if series.is_empty() => {
                    unavailable.push(format!("{}: no observations", preset.label));
                }
                Ok(series) => {
                    let annual = preset.transform.apply(&series.observations);
                    named.push((preset.label.to_string(), annual));
                }
                Err(e) => {
                    tracing::warn!(table = preset.table_id, error = %e, "macro table unavailable");
                    unavailable.push(format!("{}: {e}", preset.label));
                }
            }
        }

        if named.is_empty() {
            return Err(DataError::Other(format!(
                "no macro tables available ({})",
                unavailable.join("; ")
            ))
            .into());
        }
        Ok(MacroView {
            summary: MacroSummary::merge(&named),
            unavailable,
        })
    }

    /// Rank companies by public-opinion score.
    pub fn sentiment(&self, companies: &[String]) -> Result<Vec<RankedSentiment>, PipelineError> {
        let source = self
            .snippets
            .as_deref()
            .ok_or(PipelineError::NotConfigured("sentiment snippet source"))?;
        Ok(rank_companies(
            companies,
            source,
            self.classifier.as_ref(),
            self.config.sentiment.max_snippets,
        ))
    }

    /// Governance summary from the agent. Text received before a mid-stream
    /// failure is kept and flagged incomplete.
    pub fn insights(&self, companies: &[Fundamentals]) -> Result<Insights, PipelineError> {
        let summarizer = self
            .summarizer
            .as_deref()
            .ok_or(PipelineError::NotConfigured("agent endpoint"))?;
        if companies.is_empty() {
            return Err(DataError::Other("no fundamentals available to summarize".into()).into());
        }

        let session = SessionId::new();
        match summarizer.summarize(&session, &insights_prompt(companies)) {
            Ok(text) => Ok(Insights {
                text,
                complete: true,
                error: None,
            }),
            Err(e) => {
                let partial = e.partial().filter(|p| !p.is_empty()).map(str::to_string);
                match partial {
                    Some(text) => {
                        tracing::warn!(session = %session, error = %e, "summary interrupted");
                        Ok(Insights {
                            text,
                            complete: false,
                            error: Some(e.to_string()),
                        })
                    }
                    None => Err(e.into()),
                }
            }
        }
    }

    /// Momentum and size overview for every member of a sector.
    pub fn overview(&self, sector: &str) -> Result<Vec<OverviewRow>, PipelineError> {
        let members = self.reference.sector_members(sector);
        if members.is_empty() {
            return Err(PipelineError::UnknownSector(sector.to_string()));
        }
        Ok(members
            .into_iter()
            .map(|info| match self.fundamentals.fundamentals(&info.ticker) {
                Ok(f) => OverviewRow::build(info, &f),
                Err(e) => {
                    tracing::warn!(symbol = %info.ticker, error = %e, "overview row unavailable");
                    OverviewRow::unavailable(info)
                }
            })
            .collect())
    }

    pub fn governance(&self, symbol: &str) -> Result<Governance, PipelineError> {
        let ticker = self
            .resolve_symbols(&[symbol.to_string()])
            .pop()
            .ok_or(RequestError::NoSymbols)?;
        let f = self.fundamentals.fundamentals(&ticker)?;
        Ok(Governance::from_fundamentals(&f))
    }
}

fn section<T, E: std::fmt::Display>(kind: SectionKind, result: Result<T, E>) -> Section<T> {
    if let Err(e) = &result {
        tracing::warn!(section = %kind, error = %e, "section failed");
    }
    Section::from_result(result)
}

fn no_prices<T>() -> Result<T, String> {
    Err("price data was not fetched".to_string())
}

fn price_view(fetched: &UniverseFetch) -> Result<PriceView, String> {
    if fetched.series.is_empty() {
        return Err("no price data for any symbol".to_string());
    }
    Ok(PriceView {
        series: fetched.series.clone(),
        sources: fetched.sources.clone(),
    })
}

fn fundamentals_view(companies: &[Fundamentals]) -> Result<FundamentalsView, String> {
    if companies.is_empty() {
        return Err("no fundamentals for any symbol".to_string());
    }
    Ok(FundamentalsView {
        table: ComparisonTable::build(companies),
        ratios: companies
            .iter()
            .map(|f| (f.symbol.clone(), StatementRatios::compute(&f.statements)))
            .collect(),
        companies: companies.to_vec(),
    })
}
