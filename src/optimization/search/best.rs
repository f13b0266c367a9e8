use crate::portfolio::Portfolio;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Mutex, PoisonError};

/// A portfolio together with where it was found: the combination's position
/// in enumeration order and the trial index within that combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedPortfolio {
    pub position: usize,
    pub trial: usize,
    pub portfolio: Portfolio,
}

impl RankedPortfolio {
    /// Higher Sharpe wins. An exact tie goes to whichever was found first in
    /// enumeration order, regardless of which worker got there first.
    pub fn outranks(&self, other: &RankedPortfolio) -> bool {
        match self
            .portfolio
            .sharpe_ratio
            .partial_cmp(&other.portfolio.sharpe_ratio)
        {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => (self.position, self.trial) < (other.position, other.trial),
            _ => false,
        }
    }
}

/// The best portfolio seen so far, shared by every worker of a search.
#[derive(Debug, Default)]
pub struct BestResult {
    current: Mutex<Option<RankedPortfolio>>,
}

impl BestResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current best if `candidate` outranks it. Returns whether
    /// the candidate was kept.
    pub fn offer(&self, candidate: RankedPortfolio) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(best) if !candidate.outranks(best) => false,
            _ => {
                *current = Some(candidate);
                true
            }
        }
    }

    pub fn sharpe_ratio(&self) -> Option<f64> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|best| best.portfolio.sharpe_ratio)
    }

    pub fn into_inner(self) -> Option<RankedPortfolio> {
        self.current
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
