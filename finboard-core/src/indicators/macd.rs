//! Moving Average Convergence Divergence.
//!
//! Three lines (separate Indicator instances):
//! - MACD: EMA(fast) - EMA(slow)
//! - Signal: EMA(signal) of the MACD line
//! - Histogram: MACD - Signal
//!
//! Lookback: slow + signal - 2 for every line.

use super::{mask_warmup, Indicator, IndicatorError};
use crate::domain::Bar;
use ta::indicators::MovingAverageConvergenceDivergence;
use ta::Next;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
    proto: MovingAverageConvergenceDivergence,
}

impl Macd {
    pub fn new(
        fast: usize,
        slow: usize,
        signal: usize,
        line: MacdLine,
    ) -> Result<Self, IndicatorError> {
        if fast >= slow {
            return Err(IndicatorError::InvalidParameter {
                indicator: "macd".into(),
                reason: format!("fast period {fast} must be shorter than slow period {slow}"),
            });
        }
        let proto = MovingAverageConvergenceDivergence::new(fast, slow, signal)
            .map_err(|e| IndicatorError::from_ta("macd", e))?;
        let name = match line {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "macd_signal",
            MacdLine::Histogram => "macd_histogram",
        };
        Ok(Self {
            slow,
            signal,
            line,
            name: name.to_string(),
            proto,
        })
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut macd = self.proto.clone();
        let mut out: Vec<f64> = bars
            .iter()
            .map(|b| {
                if b.close.is_nan() {
                    return f64::NAN;
                }
                let o = macd.next(b.close);
                match self.line {
                    MacdLine::Macd => o.macd,
                    MacdLine::Signal => o.signal,
                    MacdLine::Histogram => o.histogram,
                }
            })
            .collect();
        mask_warmup(&mut out, self.lookback());
        out
    }
}
