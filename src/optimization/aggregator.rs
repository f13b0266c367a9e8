use statrs::statistics::Statistics;
use thiserror::Error;

/// Aggregator trait which reduces a series to a single f64 number.
/// The Sharpe ratio is built as daily portfolio returns + aggregators.
pub trait Aggregator: Sync + Send {
    fn value(&self, series: &[f64]) -> Result<f64, AggregatorError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregatorError {
    #[error("Number of periods is invalid for aggregator: `{0}`")]
    InvalidNumberOfPeriods(String),
}

pub struct ArithmeticMean;
impl Aggregator for ArithmeticMean {
    fn value(&self, series: &[f64]) -> Result<f64, AggregatorError> {
        if series.is_empty() {
            return Err(AggregatorError::InvalidNumberOfPeriods(
                "Mean cannot be computed for an empty series.".into(),
            ));
        }
        Ok(series.iter().mean())
    }
}

/// Standard deviation over the whole series (divides by `n`, not `n - 1`).
pub struct PopulationStandardDeviation;
impl Aggregator for PopulationStandardDeviation {
    fn value(&self, series: &[f64]) -> Result<f64, AggregatorError> {
        if series.is_empty() {
            return Err(AggregatorError::InvalidNumberOfPeriods(
                "Standard deviation cannot be computed for an empty series.".into(),
            ));
        }
        Ok(series.iter().population_std_dev())
    }
}
