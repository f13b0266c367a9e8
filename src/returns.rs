use crate::dataset::{Asset, PriceDataset};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReturnMatrixError {
    #[error("Ticker `{0}` is not part of the price dataset.")]
    UnknownTicker(String),
    #[error("`{ticker}` has {available} prices but the evaluation window needs {required}.")]
    DataInsufficient {
        ticker: String,
        required: usize,
        available: usize,
    },
    #[error("`{ticker}` closed at zero on day {day}, so the next daily return is undefined.")]
    DegenerateInput { ticker: String, day: usize },
}

/// Day-by-asset matrix of fractional daily returns for one combination.
/// Row 0 is all zeros: the first day has no previous close.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    values: DMatrix<f64>,
}

impl ReturnMatrix {
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn trading_days(&self) -> usize {
        self.values.nrows()
    }

    pub fn assets(&self) -> usize {
        self.values.ncols()
    }

    /// Drops the all-zero first row, leaving T - 1 informative observations.
    pub fn without_first_row(self) -> Self {
        if self.values.nrows() == 0 {
            return self;
        }
        ReturnMatrix {
            values: self.values.remove_row(0),
        }
    }
}

/// Looks a ticker up and checks that it covers the evaluation window.
pub fn check_history<'a>(
    dataset: &'a PriceDataset,
    ticker: &str,
    trading_days: usize,
) -> Result<&'a Asset, ReturnMatrixError> {
    let asset = dataset
        .get(ticker)
        .ok_or_else(|| ReturnMatrixError::UnknownTicker(ticker.to_string()))?;
    if asset.len() < trading_days {
        return Err(ReturnMatrixError::DataInsufficient {
            ticker: ticker.to_string(),
            required: trading_days,
            available: asset.len(),
        });
    }
    Ok(asset)
}

/// Builds the `trading_days x tickers.len()` return matrix from the first
/// `trading_days` closes of every ticker.
///
/// Every ticker is validated before any price is read, so a short series is
/// reported instead of indexed out of bounds. A zero close is reported as
/// [`ReturnMatrixError::DegenerateInput`] rather than turned into an
/// infinite return.
pub fn build_return_matrix<S: AsRef<str>>(
    dataset: &PriceDataset,
    tickers: &[S],
    trading_days: usize,
) -> Result<ReturnMatrix, ReturnMatrixError> {
    let assets = tickers
        .iter()
        .map(|ticker| check_history(dataset, ticker.as_ref(), trading_days))
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = DMatrix::<f64>::zeros(trading_days, assets.len());
    for (column, asset) in assets.iter().enumerate() {
        let closes = &asset.closes()[..trading_days];
        for day in 1..trading_days {
            let previous_close = closes[day - 1];
            if previous_close == 0.0 {
                return Err(ReturnMatrixError::DegenerateInput {
                    ticker: asset.ticker().to_string(),
                    day: day - 1,
                });
            }
            values[(day, column)] = (closes[day] - previous_close) / previous_close;
        }
    }

    Ok(ReturnMatrix { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn asset(ticker: &str, closes: &[f64]) -> Asset {
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let dates = (0..closes.len() as u64)
            .map(|i| start + Days::new(i))
            .collect();
        Asset::new(ticker, dates, closes.to_vec()).unwrap()
    }

    fn two_ticker_dataset() -> PriceDataset {
        PriceDataset::from_assets(vec![
            asset("A", &[100.0, 110.0, 121.0, 133.1]),
            asset("B", &[50.0, 55.0, 50.0, 55.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_returns_follow_close_to_close_changes() {
        let matrix = build_return_matrix(&two_ticker_dataset(), &["A", "B"], 4).unwrap();
        let values = matrix.values();

        assert_eq!(matrix.trading_days(), 4);
        assert_eq!(matrix.assets(), 2);
        assert_eq!(values[(0, 0)], 0.0);
        assert_eq!(values[(0, 1)], 0.0);

        assert_eq!(values[(1, 0)], (110.0 - 100.0) / 100.0);
        assert_eq!(values[(2, 0)], (121.0 - 110.0) / 110.0);
        assert_eq!(values[(3, 0)], (133.1 - 121.0) / 121.0);
        assert!((values[(3, 0)] - 0.1).abs() < 1e-12);

        assert_eq!(values[(1, 1)], 0.1);
        assert!((values[(2, 1)] + 0.090_909_090_909).abs() < 1e-9);
        assert_eq!(values[(3, 1)], 0.1);
    }

    #[test]
    fn test_column_order_follows_ticker_order() {
        let matrix = build_return_matrix(&two_ticker_dataset(), &["B", "A"], 3).unwrap();
        assert_eq!(matrix.values()[(2, 1)], (121.0 - 110.0) / 110.0);
        assert_eq!(matrix.trading_days(), 3);
    }

    #[test]
    fn test_short_history_is_reported() {
        let result = build_return_matrix(&two_ticker_dataset(), &["A", "B"], 5);
        assert_eq!(
            result,
            Err(ReturnMatrixError::DataInsufficient {
                ticker: "A".into(),
                required: 5,
                available: 4,
            })
        );
    }

    #[test]
    fn test_unknown_ticker_is_reported() {
        let result = build_return_matrix(&two_ticker_dataset(), &["A", "ZZZ"], 4);
        assert_eq!(result, Err(ReturnMatrixError::UnknownTicker("ZZZ".into())));
    }

    #[test]
    fn test_zero_close_is_degenerate() {
        let dataset = PriceDataset::from_assets(vec![asset("Z", &[10.0, 0.0, 5.0])]).unwrap();
        let result = build_return_matrix(&dataset, &["Z"], 3);
        assert_eq!(
            result,
            Err(ReturnMatrixError::DegenerateInput {
                ticker: "Z".into(),
                day: 1,
            })
        );
    }

    #[test]
    fn test_without_first_row() {
        let matrix = build_return_matrix(&two_ticker_dataset(), &["A"], 4)
            .unwrap()
            .without_first_row();
        assert_eq!(matrix.trading_days(), 3);
        assert_eq!(matrix.values()[(0, 0)], 0.1);
    }
}
