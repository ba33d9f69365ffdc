//! Path policy: resolve bars whose range covers both stop and target.
//!
//! OHLC does not say which level traded first, so a double hit is settled by
//! policy rather than by the data.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Stop first, always.
    #[default]
    Conservative,
    /// Target first, always.
    Optimistic,
    /// Whichever level sits closer to the bar's open; ties go to the target.
    NearestToOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTouch {
    StopLoss,
    TakeProfit,
}

impl TieBreak {
    pub fn resolve(self, bar: &Bar, stop_loss: f64, take_profit: f64) -> FirstTouch {
        match self {
            Self::Conservative => FirstTouch::StopLoss,
            Self::Optimistic => FirstTouch::TakeProfit,
            Self::NearestToOpen => {
                if (stop_loss - bar.open).abs() < (take_profit - bar.open).abs() {
                    FirstTouch::StopLoss
                } else {
                    FirstTouch::TakeProfit
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar;

    #[test]
    fn fixed_policies_ignore_the_bar() {
        let b = bar(0, 100.0, 110.0, 90.0, 100.0);
        assert_eq!(TieBreak::Conservative.resolve(&b, 99.0, 101.0), FirstTouch::StopLoss);
        assert_eq!(TieBreak::Optimistic.resolve(&b, 99.0, 101.0), FirstTouch::TakeProfit);
    }

    #[test]
    fn nearest_to_open() {
        let b = bar(0, 100.0, 110.0, 90.0, 100.0);
        assert_eq!(TieBreak::NearestToOpen.resolve(&b, 99.0, 105.0), FirstTouch::StopLoss);
        assert_eq!(TieBreak::NearestToOpen.resolve(&b, 95.0, 101.0), FirstTouch::TakeProfit);
        assert_eq!(TieBreak::NearestToOpen.resolve(&b, 98.0, 102.0), FirstTouch::TakeProfit);
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&TieBreak::NearestToOpen).unwrap();
        assert_eq!(json, "\"nearest_to_open\"");
    }
}
