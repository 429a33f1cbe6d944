//! On-Balance Volume. Cumulative signed volume; defined from the first bar.

use super::Indicator;
use crate::domain::Bar;
use ta::indicators::OnBalanceVolume;
use ta::Next;

#[derive(Debug, Clone)]
pub struct Obv {
    proto: OnBalanceVolume,
}

impl Obv {
    pub fn new() -> Self {
        Self {
            proto: OnBalanceVolume::new(),
        }
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut obv = self.proto.clone();
        bars.iter()
            .map(|b| if b.close.is_nan() { f64::NAN } else { obv.next(b) })
            .collect()
    }
}
