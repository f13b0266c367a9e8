use crate::optimization::objective::PortfolioPerformance;
use serde::{Deserialize, Serialize};

/// A weighted selection of tickers together with its annualized statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
}

impl Portfolio {
    pub fn new(tickers: Vec<String>, weights: Vec<f64>, performance: PortfolioPerformance) -> Self {
        Portfolio {
            tickers,
            weights,
            annualized_return: performance.annualized_return,
            annualized_volatility: performance.annualized_volatility,
            sharpe_ratio: performance.sharpe_ratio,
        }
    }

    /// (ticker, weight) pairs, heaviest allocation first.
    pub fn allocation(&self) -> Vec<(&str, f64)> {
        let mut allocation: Vec<(&str, f64)> = self
            .tickers
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
            .collect();
        allocation.sort_by(|a, b| b.1.total_cmp(&a.1));
        allocation
    }
}
