//! Finboard CLI: a text dashboard over Canadian equities and macro data.
//!
//! Commands:
//! - `symbols`: list the reference table, optionally one sector
//! - `history` / `indicators`: price history and technical indicators
//! - `fundamentals`: comparison table, statement ratios, optional agent insights
//! - `overview` / `board`: sector momentum overview and governance view
//! - `allocate`: Monte-Carlo portfolio allocation for a risk profile
//! - `macro`: annual Statistics Canada indicators
//! - `sentiment`: public-opinion ranking of companies
//! - `dashboard`: any combination of the above in one request

mod render;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use finboard_core::allocator::RiskProfile;
use finboard_core::data::Period;
use finboard_core::indicators::IndicatorSet;
use finboard_pipeline::{
    Config, Dashboard, DashboardRequest, DashboardResponse, SectionKind, DEFAULT_BUDGET,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finboard", about = "Finboard: market, fundamentals and macro dashboard")]
struct Cli {
    /// Path to a TOML config file. Defaults to <config dir>/finboard/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct RangeArgs {
    /// Lookback period: 1mo, 3mo, 6mo, 1y, 2y, 5y, ytd, max.
    #[arg(long, default_value = "1y")]
    period: Period,

    /// End of the period (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Args, Clone)]
struct AllocationArgs {
    /// Amount to invest.
    #[arg(long, default_value_t = DEFAULT_BUDGET)]
    budget: f64,

    /// Risk profile: aggressive, conservative, balanced.
    #[arg(long, default_value = "balanced")]
    profile: RiskProfile,

    /// Master seed for reproducible sampling. Defaults to the configured seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List reference symbols grouped by sector.
    Symbols {
        /// Only this sector.
        #[arg(long)]
        sector: Option<String>,
    },
    /// Price history with a trend sparkline.
    History {
        /// Tickers or company names.
        #[arg(required = true)]
        symbols: Vec<String>,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Technical indicators (RSI, MACD, OBV, Bollinger Bands).
    Indicators {
        #[arg(required = true)]
        symbols: Vec<String>,
        #[command(flatten)]
        range: RangeArgs,
        /// Comma-separated subset: rsi, macd, obv, bollinger, all.
        #[arg(long, default_value = "all")]
        set: String,
    },
    /// Fundamental comparison table and statement ratios.
    Fundamentals {
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Also request a governance summary from the configured agent.
        #[arg(long, default_value_t = false)]
        insights: bool,
    },
    /// Momentum and size overview of one sector.
    Overview {
        #[arg(long)]
        sector: String,
    },
    /// Officer roster and board risk of one company.
    Board { symbol: String },
    /// Monte-Carlo portfolio allocation.
    Allocate {
        #[arg(required = true)]
        symbols: Vec<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        allocation: AllocationArgs,
    },
    /// Annual macroeconomic indicators from Statistics Canada tables.
    Macro,
    /// Rank companies by public-opinion sentiment.
    Sentiment {
        /// Company names or tickers.
        #[arg(required = true)]
        companies: Vec<String>,
    },
    /// Run several sections in one request.
    Dashboard {
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Comma-separated sections, or "all".
        #[arg(long, default_value = "all")]
        sections: String,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        allocation: AllocationArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let dashboard = Dashboard::from_config(config)?;
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Symbols { sector } => {
            if let Some(s) = &sector {
                if dashboard.reference().sector_members(s).is_empty() {
                    bail!(
                        "unknown sector '{s}'. Valid: {}",
                        dashboard.reference().sectors().join(", ")
                    );
                }
            }
            if out.json {
                let list: Vec<_> = dashboard
                    .reference()
                    .symbols()
                    .iter()
                    .filter(|i| sector.as_ref().map_or(true, |s| i.sector.eq_ignore_ascii_case(s)))
                    .collect();
                out.emit_json(&list)
            } else {
                print!("{}", render::symbols(dashboard.reference(), sector.as_deref()));
                Ok(())
            }
        }
        Commands::History { symbols, range } => {
            let req = request(symbols, &range).with_sections([SectionKind::Prices]);
            out.response(&dashboard.run(&req)?)
        }
        Commands::Indicators { symbols, range, set } => {
            let mut req = request(symbols, &range).with_sections([SectionKind::Indicators]);
            req.indicators = IndicatorSet::parse_list(&set).map_err(anyhow::Error::msg)?;
            if req.indicators.is_empty() {
                bail!("--set selects no indicators");
            }
            out.response(&dashboard.run(&req)?)
        }
        Commands::Fundamentals { symbols, insights } => {
            let mut sections = vec![SectionKind::Fundamentals];
            if insights {
                sections.push(SectionKind::Insights);
            }
            let req = DashboardRequest::new(symbols, today()).with_sections(sections);
            out.response(&dashboard.run(&req)?)
        }
        Commands::Overview { sector } => {
            let rows = dashboard.overview(&sector)?;
            out.show(&rows, |r| render::overview(r))
        }
        Commands::Board { symbol } => {
            let g = dashboard.governance(&symbol)?;
            out.show(&g, render::governance)
        }
        Commands::Allocate {
            symbols,
            range,
            allocation,
        } => {
            let req = with_allocation(request(symbols, &range), &allocation)
                .with_sections([SectionKind::Allocation]);
            out.response(&dashboard.run(&req)?)
        }
        Commands::Macro => {
            let view = dashboard.macro_view()?;
            out.show(&view, render::macro_table)
        }
        Commands::Sentiment { companies } => {
            let names: Vec<String> = companies
                .iter()
                .map(|c| {
                    dashboard
                        .reference()
                        .resolve(c)
                        .map_or_else(|| c.clone(), |info| info.name.clone())
                })
                .collect();
            let ranked = dashboard.sentiment(&names)?;
            out.show(&ranked, |r| render::sentiment(r))
        }
        Commands::Dashboard {
            symbols,
            sections,
            range,
            allocation,
        } => {
            let sections = SectionKind::parse_list(&sections).map_err(anyhow::Error::msg)?;
            let req =
                with_allocation(request(symbols, &range), &allocation).with_sections(sections);
            out.response(&dashboard.run(&req)?)
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `--config`, else the per-user config file if present, else defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(p) = path {
        return Config::from_file(p).with_context(|| format!("loading {}", p.display()));
    }
    if let Some(default) = dirs::config_dir().map(|d| d.join("finboard").join("config.toml")) {
        if default.is_file() {
            tracing::debug!(path = %default.display(), "using user config");
            return Config::from_file(&default)
                .with_context(|| format!("loading {}", default.display()));
        }
    }
    Ok(Config::default())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn request(symbols: Vec<String>, range: &RangeArgs) -> DashboardRequest {
    DashboardRequest::new(symbols, range.as_of.unwrap_or_else(today)).with_period(range.period)
}

fn with_allocation(req: DashboardRequest, args: &AllocationArgs) -> DashboardRequest {
    let req = req.with_profile(args.profile, args.budget);
    match args.seed {
        Some(seed) => req.with_seed(seed),
        None => req,
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn show<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            self.emit_json(value)
        } else {
            print!("{}", text(value));
            Ok(())
        }
    }

    /// Print a pipeline response. Fails when every requested section failed.
    fn response(&self, resp: &DashboardResponse) -> Result<()> {
        self.show(resp, render::response)?;
        let failed = resp.failed_sections();
        if !failed.is_empty() && failed.len() == resp.request.sections.len() {
            let reasons: Vec<String> = failed.iter().map(|(k, e)| format!("{k}: {e}")).collect();
            bail!("no section could be computed ({})", reasons.join("; "));
        }
        Ok(())
    }
}
