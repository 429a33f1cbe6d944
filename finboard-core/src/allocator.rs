//! Monte-Carlo portfolio allocator.
//!
//! Samples long-only weight vectors uniformly-normalised over the simplex,
//! scores each by annualized return, volatility and Sharpe ratio, and picks
//! one according to the investor's risk profile:
//!
//! - Aggressive, Balanced: maximum Sharpe ratio
//! - Conservative: minimum volatility
//!
//! Sampling draws only from the injected RNG, so a seeded RNG reproduces the
//! same allocation exactly. Draws are assigned to columns in symbol order, not
//! matrix order, so permuting the columns of a matrix permutes the weights
//! with them.

use crate::returns::ReturnMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Volatility below this is treated as zero and the Sharpe ratio is undefined.
pub const VOLATILITY_EPSILON: f64 = 1e-12;

pub const DEFAULT_SAMPLES: usize = 10_000;
pub const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Error, PartialEq)]
pub enum AllocatorError {
    #[error("need at least 2 aligned return observations, got {rows}")]
    InsufficientData { rows: usize },

    #[error("no assets with usable price history")]
    NoAssets,

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("return matrix contains a non-finite value")]
    NonFiniteReturn,

    #[error("sample count must be positive")]
    ZeroSamples,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Aggressive,
    Conservative,
    #[default]
    Balanced,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Aggressive,
        RiskProfile::Conservative,
        RiskProfile::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Aggressive => "aggressive",
            RiskProfile::Conservative => "conservative",
            RiskProfile::Balanced => "balanced",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggressive" => Ok(RiskProfile::Aggressive),
            "conservative" => Ok(RiskProfile::Conservative),
            "balanced" => Ok(RiskProfile::Balanced),
            other => Err(format!(
                "unknown risk profile '{other}'. Valid: aggressive, conservative, balanced"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    pub samples: usize,
    /// Annualization factor for returns and covariance.
    pub trading_days: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            trading_days: TRADING_DAYS,
        }
    }
}

/// One candidate weight vector with its scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSample {
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
    /// `None` when volatility is effectively zero.
    pub sharpe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub profile: RiskProfile,
    pub symbols: Vec<String>,
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: Option<f64>,
}

impl Allocation {
    /// Value of `budget` after one year at the expected return.
    pub fn projected_value(&self, budget: f64) -> f64 {
        budget * (1.0 + self.expected_return)
    }

    /// `budget` split by weight, per symbol.
    pub fn amounts(&self, budget: f64) -> Vec<(&str, f64)> {
        self.symbols
            .iter()
            .zip(&self.weights)
            .map(|(s, w)| (s.as_str(), budget * w))
            .collect()
    }
}

/// The chosen allocation plus every sample evaluated to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRun {
    pub allocation: Allocation,
    pub samples: Vec<PortfolioSample>,
}

/// Annualized moments of a return matrix.
struct Moments {
    mu: Vec<f64>,
    sigma: Vec<Vec<f64>>,
}

impl Moments {
    fn annualized(matrix: &ReturnMatrix, trading_days: f64) -> Self {
        let mu = matrix.mean_returns().iter().map(|m| m * trading_days).collect();
        let sigma = matrix
            .covariance()
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * trading_days).collect())
            .collect();
        Self { mu, sigma }
    }

    fn score(&self, weights: Vec<f64>) -> PortfolioSample {
        let expected_return: f64 = weights.iter().zip(&self.mu).map(|(w, m)| w * m).sum();
        let variance: f64 = self
            .sigma
            .iter()
            .zip(&weights)
            .map(|(row, wi)| wi * row.iter().zip(&weights).map(|(c, wj)| c * wj).sum::<f64>())
            .sum();
        // Rounding can push a zero variance slightly negative.
        let volatility = variance.max(0.0).sqrt();
        let sharpe = (volatility >= VOLATILITY_EPSILON).then(|| expected_return / volatility);
        PortfolioSample {
            weights,
            expected_return,
            volatility,
            sharpe,
        }
    }
}

/// Draw a weight vector uniformly normalised onto the simplex.
fn sample_weights<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    loop {
        let raw: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            return raw.into_iter().map(|x| x / total).collect();
        }
    }
}

/// Column indices sorted by upper-cased symbol, ties by position.
fn sampling_order(symbols: &[String]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..symbols.len()).collect();
    order.sort_by_cached_key(|&i| (symbols[i].to_ascii_uppercase(), i));
    order
}

/// Draw in sampling order, then scatter back to matrix columns.
fn sample_in_order<R: Rng + ?Sized>(order: &[usize], rng: &mut R) -> Vec<f64> {
    let drawn = sample_weights(order.len(), rng);
    let mut weights = vec![0.0; order.len()];
    for (&col, w) in order.iter().zip(drawn) {
        weights[col] = w;
    }
    weights
}

fn best_by(
    samples: &[PortfolioSample],
    key: impl Fn(&PortfolioSample) -> Option<f64>,
    maximize: bool,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in samples.iter().enumerate() {
        let Some(v) = key(s) else { continue };
        let better = match best {
            None => true,
            Some((_, b)) if maximize => v > b,
            Some((_, b)) => v < b,
        };
        if better {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

fn select(samples: &[PortfolioSample], profile: RiskProfile) -> usize {
    match profile {
        RiskProfile::Conservative => best_by(samples, |s| Some(s.volatility), false),
        RiskProfile::Aggressive | RiskProfile::Balanced => best_by(samples, |s| s.sharpe, true)
            .or_else(|| best_by(samples, |s| Some(s.expected_return), true)),
    }
    .unwrap_or(0)
}

/// Run the allocator.
///
/// A single asset gets weight 1.0 without sampling. Requires at least two
/// return observations.
pub fn allocate<R: Rng + ?Sized>(
    matrix: &ReturnMatrix,
    profile: RiskProfile,
    config: &AllocatorConfig,
    rng: &mut R,
) -> Result<AllocationRun, AllocatorError> {
    if matrix.n_assets() == 0 {
        return Err(AllocatorError::NoAssets);
    }
    if matrix.n_obs() < 2 {
        return Err(AllocatorError::InsufficientData {
            rows: matrix.n_obs(),
        });
    }
    if config.samples == 0 {
        return Err(AllocatorError::ZeroSamples);
    }

    let moments = Moments::annualized(matrix, config.trading_days);

    let samples: Vec<PortfolioSample> = if matrix.n_assets() == 1 {
        vec![moments.score(vec![1.0])]
    } else {
        let order = sampling_order(matrix.symbols());
        (0..config.samples)
            .map(|_| moments.score(sample_in_order(&order, rng)))
            .collect()
    };

    let best = &samples[select(&samples, profile)];
    tracing::debug!(
        %profile,
        assets = matrix.n_assets(),
        samples = samples.len(),
        expected_return = best.expected_return,
        volatility = best.volatility,
        "allocation selected"
    );

    let allocation = Allocation {
        profile,
        symbols: matrix.symbols().to_vec(),
        weights: best.weights.clone(),
        expected_return: best.expected_return,
        volatility: best.volatility,
        sharpe: best.sharpe,
    };
    Ok(AllocationRun {
        allocation,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sampled(m: &ReturnMatrix, profile: RiskProfile, samples: usize, seed: u64) -> AllocationRun {
        let cfg = AllocatorConfig {
            samples,
            ..AllocatorConfig::default()
        };
        allocate(m, profile, &cfg, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn two_asset() -> ReturnMatrix {
        ReturnMatrix::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![0.01, 0.002],
                vec![-0.01, 0.001],
                vec![0.02, 0.003],
                vec![-0.005, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn single_asset_gets_everything() {
        let m = ReturnMatrix::new(vec!["A".into()], vec![vec![0.01], vec![0.03]]).unwrap();
        let run = sampled(&m, RiskProfile::Aggressive, DEFAULT_SAMPLES, 1);
        assert_eq!(run.allocation.weights, vec![1.0]);
        assert_eq!(run.samples.len(), 1);
        assert!((run.allocation.expected_return - 0.02 * 252.0).abs() < 1e-12);
    }

    #[test]
    fn one_row_is_insufficient() {
        let m = ReturnMatrix::new(vec!["A".into(), "B".into()], vec![vec![0.01, 0.02]]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = allocate(&m, RiskProfile::Balanced, &AllocatorConfig::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, AllocatorError::InsufficientData { rows: 1 });
    }

    #[test]
    fn all_samples_tracked() {
        let run = sampled(&two_asset(), RiskProfile::Balanced, 500, 7);
        assert_eq!(run.samples.len(), 500);
    }

    #[test]
    fn aggressive_has_max_sharpe_among_samples() {
        let run = sampled(&two_asset(), RiskProfile::Aggressive, 2_000, 3);
        let chosen = run.allocation.sharpe.unwrap();
        assert!(run.samples.iter().filter_map(|s| s.sharpe).all(|s| s <= chosen));
    }

    #[test]
    fn conservative_has_min_volatility_among_samples() {
        let run = sampled(&two_asset(), RiskProfile::Conservative, 2_000, 3);
        let chosen = run.allocation.volatility;
        assert!(run.samples.iter().all(|s| s.volatility >= chosen));
    }

    #[test]
    fn zero_volatility_falls_back_to_max_return() {
        let m = ReturnMatrix::new(
            vec!["A".into(), "B".into()],
            vec![vec![0.001, 0.002], vec![0.001, 0.002], vec![0.001, 0.002]],
        )
        .unwrap();
        let run = sampled(&m, RiskProfile::Aggressive, 1_000, 11);
        assert_eq!(run.allocation.sharpe, None);
        let best = run
            .samples
            .iter()
            .map(|s| s.expected_return)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(run.allocation.expected_return, best);
        assert!(run.allocation.weights[1] > 0.9);
    }

    #[test]
    fn projected_value_applies_expected_return() {
        let a = Allocation {
            profile: RiskProfile::Balanced,
            symbols: vec!["A".into()],
            weights: vec![1.0],
            expected_return: 0.1,
            volatility: 0.2,
            sharpe: Some(0.5),
        };
        assert!((a.projected_value(1_000.0) - 1_100.0).abs() < 1e-9);
        assert_eq!(a.amounts(500.0), vec![("A", 500.0)]);
    }

    #[test]
    fn sampling_order_is_by_symbol() {
        let syms: Vec<String> = ["td.to", "RY.TO", "BNS.TO"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sampling_order(&syms), vec![2, 1, 0]);
    }

    #[test]
    fn column_permutation_permutes_weights() {
        let ab = two_asset();
        let ba = ReturnMatrix::new(
            vec!["B".into(), "A".into()],
            ab.rows().iter().map(|r| vec![r[1], r[0]]).collect(),
        )
        .unwrap();
        for profile in RiskProfile::ALL {
            let x = sampled(&ab, profile, 1_000, 42);
            let y = sampled(&ba, profile, 1_000, 42);
            assert_eq!(x.allocation.weights[0], y.allocation.weights[1]);
            assert_eq!(x.allocation.weights[1], y.allocation.weights[0]);
        }
    }

    #[test]
    fn profile_parse() {
        assert_eq!("Conservative".parse::<RiskProfile>().unwrap(), RiskProfile::Conservative);
        assert!("yolo".parse::<RiskProfile>().is_err());
    }
}
