//! Relative Strength Index.
//!
//! Lookback: period. Bounded to [0, 100].

use super::{mask_warmup, Indicator, IndicatorError};
use crate::domain::Bar;
use ta::indicators::RelativeStrengthIndex;
use ta::Next;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    proto: RelativeStrengthIndex,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let proto =
            RelativeStrengthIndex::new(period).map_err(|e| IndicatorError::from_ta("rsi", e))?;
        Ok(Self {
            period,
            name: format!("rsi_{period}"),
            proto,
        })
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut rsi = self.proto.clone();
        let mut out: Vec<f64> = bars
            .iter()
            .map(|b| if b.close.is_nan() { f64::NAN } else { rsi.next(b.close) })
            .collect();
        mask_warmup(&mut out, self.lookback());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn rising_prices_saturate_high() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = Rsi::new(14).unwrap().compute(&make_bars(&closes));
        assert!(out[29] > 95.0, "{}", out[29]);
    }

    #[test]
    fn falling_prices_saturate_low() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let out = Rsi::new(14).unwrap().compute(&make_bars(&closes));
        assert!(out[29] < 5.0, "{}", out[29]);
    }

    #[test]
    fn bounded() {
        let closes = [100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0, 101.0, 99.0];
        let out = Rsi::new(3).unwrap().compute(&make_bars(&closes));
        assert!(out[..3].iter().all(|v| v.is_nan()));
        for v in out[3..].iter() {
            assert!((0.0..=100.0).contains(v), "{v}");
        }
    }

    #[test]
    fn zero_period_rejected() {
        assert!(Rsi::new(0).is_err());
    }
}
