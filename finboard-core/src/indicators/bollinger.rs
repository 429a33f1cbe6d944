//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances): upper, middle (SMA), lower.
//! Lookback: period - 1.

use super::{mask_warmup, Indicator, IndicatorError};
use crate::domain::Bar;
use ta::indicators::BollingerBands;
use ta::Next;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    band: BollingerBand,
    name: String,
    proto: BollingerBands,
}

impl Bollinger {
    pub fn new(
        period: usize,
        multiplier: f64,
        band: BollingerBand,
    ) -> Result<Self, IndicatorError> {
        let proto = BollingerBands::new(period, multiplier)
            .map_err(|e| IndicatorError::from_ta("bollinger", e))?;
        let name = match band {
            BollingerBand::Upper => "bollinger_upper",
            BollingerBand::Middle => "bollinger_middle",
            BollingerBand::Lower => "bollinger_lower",
        };
        Ok(Self {
            period,
            band,
            name: name.to_string(),
            proto,
        })
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut bb = self.proto.clone();
        let mut out: Vec<f64> = bars
            .iter()
            .map(|b| {
                if b.close.is_nan() {
                    return f64::NAN;
                }
                let o = bb.next(b.close);
                match self.band {
                    BollingerBand::Upper => o.upper,
                    BollingerBand::Middle => o.average,
                    BollingerBand::Lower => o.lower,
                }
            })
            .collect();
        mask_warmup(&mut out, self.lookback());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn middle_is_sma() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = Bollinger::new(3, 2.0, BollingerBand::Middle).unwrap().compute(&bars);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 2.0, 1e-9);
        assert_approx(out[4], 4.0, 1e-9);
    }

    #[test]
    fn bands_are_symmetric() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 13.0, 9.0, 14.0]);
        let upper = Bollinger::new(3, 2.0, BollingerBand::Upper).unwrap().compute(&bars);
        let middle = Bollinger::new(3, 2.0, BollingerBand::Middle).unwrap().compute(&bars);
        let lower = Bollinger::new(3, 2.0, BollingerBand::Lower).unwrap().compute(&bars);
        for i in 2..bars.len() {
            assert!(upper[i] >= middle[i] && middle[i] >= lower[i]);
            assert_approx(upper[i] - middle[i], middle[i] - lower[i], 1e-9);
        }
    }

    #[test]
    fn flat_prices_collapse_bands() {
        let bars = make_bars(&[7.0; 25]);
        let upper = Bollinger::new(20, 2.0, BollingerBand::Upper).unwrap().compute(&bars);
        assert_approx(upper[24], 7.0, 1e-9);
    }
}
