//! Win evaluation over settled reel tops

use serde::{Deserialize, Serialize};

/// Which comparison produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinRule {
    /// Two columns: the tops are equal
    PairEquality,
    /// Any column count ≥ 2: every top equals the first
    AllEqual,
}

/// Evaluation result for one spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinVerdict {
    Win,
    Lose,
    /// Fewer than two columns, nothing to compare
    NotApplicable,
}

impl WinVerdict {
    pub fn is_win(self) -> bool {
        matches!(self, Self::Win)
    }

    /// Text for the result label
    pub fn message(self) -> &'static str {
        match self {
            Self::Win => "Win!",
            Self::Lose => "Try again!",
            Self::NotApplicable => "",
        }
    }
}

impl From<bool> for WinVerdict {
    fn from(win: bool) -> Self {
        if win { Self::Win } else { Self::Lose }
    }
}

/// Decides win/lose from the top symbol index of every column.
///
/// Tops must only be read once every reel is quiescent.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinEvaluator;

impl WinEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Rule that applies to a column count, `None` below two columns
    pub fn rule_for(columns: usize) -> Option<WinRule> {
        match columns {
            0 | 1 => None,
            2 => Some(WinRule::PairEquality),
            _ => Some(WinRule::AllEqual),
        }
    }

    /// `Some(win)` for two or more columns, `None` otherwise
    pub fn evaluate(&self, tops: &[usize]) -> Option<bool> {
        let rule = Self::rule_for(tops.len())?;
        let win = match rule {
            WinRule::PairEquality => tops[0] == tops[1],
            WinRule::AllEqual => {
                let first = tops[0];
                tops.iter().all(|&top| top == first)
            }
        };
        log::debug!("evaluate {:?} via {:?} -> {}", tops, rule, win);
        Some(win)
    }

    /// Same as [`evaluate`](Self::evaluate) folded into a [`WinVerdict`]
    pub fn verdict(&self, tops: &[usize]) -> WinVerdict {
        self.evaluate(tops)
            .map(WinVerdict::from)
            .unwrap_or(WinVerdict::NotApplicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_columns() {
        let eval = WinEvaluator::new();
        assert_eq!(eval.evaluate(&[5, 5]), Some(true));
        assert_eq!(eval.evaluate(&[5, 6]), Some(false));
        assert_eq!(WinEvaluator::rule_for(2), Some(WinRule::PairEquality));
    }

    #[test]
    fn test_four_columns() {
        let eval = WinEvaluator::new();
        assert_eq!(eval.evaluate(&[2, 2, 2, 2]), Some(true));
        assert_eq!(eval.evaluate(&[2, 2, 3, 2]), Some(false));
        assert_eq!(WinEvaluator::rule_for(4), Some(WinRule::AllEqual));
    }

    #[test]
    fn test_not_applicable() {
        let eval = WinEvaluator::new();
        assert_eq!(eval.evaluate(&[]), None);
        assert_eq!(eval.evaluate(&[3]), None);
        assert_eq!(eval.verdict(&[3]), WinVerdict::NotApplicable);
        assert_eq!(WinVerdict::NotApplicable.message(), "");
    }

    #[test]
    fn test_verdict_messages() {
        let eval = WinEvaluator::new();
        assert_eq!(eval.verdict(&[1, 1, 1]), WinVerdict::Win);
        assert!(eval.verdict(&[1, 1, 1]).is_win());
        assert_eq!(eval.verdict(&[1, 0, 1]).message(), "Try again!");
    }
}
