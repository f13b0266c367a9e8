use crate::consts::VOLATILITY_EPSILON;
use crate::optimization::aggregator::{
    Aggregator, AggregatorError, ArithmeticMean, PopulationStandardDeviation,
};
use crate::returns::ReturnMatrix;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Portfolio volatility is zero, so its Sharpe ratio is undefined.")]
    DegenerateVolatility,
    #[error("Got {weights} weights for a return matrix with {assets} assets.")]
    DimensionMismatch { weights: usize, assets: usize },
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

/// Annualized statistics of one weighted portfolio.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PortfolioPerformance {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
}

/// Sharpe ratio of a weighted portfolio over a return matrix:
/// mean daily return and population volatility of `matrix * weights`,
/// both annualized with `trading_days_per_year`.
pub struct SharpeRatio {
    mean_returns: ArithmeticMean,
    volatility: PopulationStandardDeviation,
    trading_days_per_year: usize,
    risk_free_rate: f64,
}

impl SharpeRatio {
    pub fn new(trading_days_per_year: usize, risk_free_rate: f64) -> Self {
        SharpeRatio {
            mean_returns: ArithmeticMean,
            volatility: PopulationStandardDeviation,
            trading_days_per_year,
            risk_free_rate,
        }
    }

    pub fn evaluate(
        &self,
        matrix: &ReturnMatrix,
        weights: &[f64],
    ) -> Result<PortfolioPerformance, EvaluationError> {
        if weights.len() != matrix.assets() {
            return Err(EvaluationError::DimensionMismatch {
                weights: weights.len(),
                assets: matrix.assets(),
            });
        }
        let daily_returns = matrix.values() * DVector::from_column_slice(weights);
        let series = daily_returns.as_slice();

        let periods_per_year = self.trading_days_per_year as f64;
        let annualized_return = self.mean_returns.value(series)? * periods_per_year;
        let annualized_volatility = self.volatility.value(series)? * periods_per_year.sqrt();

        // A flat portfolio has no risk to adjust for; it must never be
        // reported with an infinite or NaN score.
        if annualized_volatility < VOLATILITY_EPSILON {
            return Err(EvaluationError::DegenerateVolatility);
        }
        let sharpe_ratio = (annualized_return - self.risk_free_rate) / annualized_volatility;
        if !sharpe_ratio.is_finite() {
            return Err(EvaluationError::DegenerateVolatility);
        }

        Ok(PortfolioPerformance {
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
        })
    }
}
