//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (EMA with alpha = 1/period).
//! The first bar has no previous close, so the first ATR value lands on
//! index `period`.

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Full ATR series aligned with `bars`; NaN during warmup.
    pub fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }

    /// ATR at the last bar of `bars`, or `None` while still warming up.
    pub fn latest(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() <= self.period {
            return None;
        }
        self.compute(bars).last().copied().filter(|v| v.is_finite())
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let range = bar.high - bar.low;
        let value = match i.checked_sub(1).map(|p| bars[p].close) {
            None => range,
            Some(pc) => range.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        };
        tr.push(value);
    }
    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
///
/// Seeded with the mean of the first `period` consecutive non-NaN values; a
/// NaN after the seed poisons the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let seed_start = (0..=n - period).find(|&i| values[i..i + period].iter().all(|v| !v.is_nan()));
    let Some(seed_start) = seed_start else {
        return result;
    };
    let seed_end = seed_start + period;

    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}
