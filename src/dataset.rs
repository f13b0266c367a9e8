use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("The price feed did not contain any ticker.")]
    Empty,
    #[error("Series for `{ticker}` has {dates} dates but {closes} closing prices.")]
    LengthMismatch {
        ticker: String,
        dates: usize,
        closes: usize,
    },
    #[error("Dates for `{ticker}` are not strictly increasing at index {index}.")]
    UnorderedDates { ticker: String, index: usize },
    #[error("Closing price for `{ticker}` at index {index} is not finite.")]
    NonFinitePrice { ticker: String, index: usize },
}

/// One ticker as it appears in the price feed payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TickerSeries {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FeedMetadata {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub components_count: Option<usize>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Shape of the payload served by the price data service:
/// `{ "data": { TICKER: { "dates": [...], "close": [...] } }, "metadata": {...} }`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PriceFeedPayload {
    pub data: BTreeMap<String, TickerSeries>,
    #[serde(default)]
    pub metadata: FeedMetadata,
}

#[derive(Debug, Clone)]
pub struct Asset {
    ticker: String,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl Asset {
    /// Builds an asset, rejecting series whose dates go backwards or repeat,
    /// whose lengths disagree, or which contain non-finite prices.
    pub fn new(
        ticker: impl Into<String>,
        dates: Vec<NaiveDate>,
        closes: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        let ticker = ticker.into();
        if dates.len() != closes.len() {
            return Err(DatasetError::LengthMismatch {
                ticker,
                dates: dates.len(),
                closes: closes.len(),
            });
        }
        if let Some(index) = dates
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
            .map(|i| i + 1)
        {
            return Err(DatasetError::UnorderedDates { ticker, index });
        }
        if let Some(index) = closes.iter().position(|close| !close.is_finite()) {
            return Err(DatasetError::NonFinitePrice { ticker, index });
        }

        Ok(Asset {
            ticker,
            dates,
            closes,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Immutable table of closing prices keyed (and ordered) by ticker.
///
/// Built once before a search starts and only ever borrowed immutably
/// afterwards, so workers can share it without any locking.
///
/// Tickers whose series failed validation are kept aside with the reason,
/// so a search that asks for them can report why they are missing.
#[derive(Debug, Clone)]
pub struct PriceDataset {
    assets: BTreeMap<String, Asset>,
    rejected: BTreeMap<String, String>,
    metadata: FeedMetadata,
}

impl PriceDataset {
    /// Validates every ticker of the payload on its own. A malformed series
    /// only removes that ticker; the load fails only if nothing valid is left.
    pub fn from_payload(payload: PriceFeedPayload) -> Result<Self, DatasetError> {
        let mut assets = Vec::with_capacity(payload.data.len());
        let mut rejected = BTreeMap::new();
        for (ticker, series) in payload.data {
            match Asset::new(ticker.clone(), series.dates, series.close) {
                Ok(asset) => assets.push(asset),
                Err(error) => {
                    warn!("Dropping {} from the price dataset: {}", ticker, error);
                    rejected.insert(ticker, error.to_string());
                }
            }
        }
        let mut dataset = Self::from_assets(assets)?;
        dataset.rejected = rejected;
        dataset.metadata = payload.metadata;
        Ok(dataset)
    }

    pub fn from_assets(assets: impl IntoIterator<Item = Asset>) -> Result<Self, DatasetError> {
        let assets: BTreeMap<String, Asset> = assets
            .into_iter()
            .map(|asset| (asset.ticker.clone(), asset))
            .collect();
        if assets.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(PriceDataset {
            assets,
            rejected: BTreeMap::new(),
            metadata: FeedMetadata::default(),
        })
    }

    pub fn get(&self, ticker: &str) -> Option<&Asset> {
        self.assets.get(ticker)
    }

    /// Why `ticker` was dropped at load time, if it was.
    pub fn rejection(&self, ticker: &str) -> Option<&str> {
        self.rejected.get(ticker).map(String::as_str)
    }

    /// Tickers dropped at load time, in sorted order.
    pub fn rejected_tickers(&self) -> impl Iterator<Item = &str> {
        self.rejected.keys().map(String::as_str)
    }

    /// Tickers in sorted order.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn metadata(&self) -> &FeedMetadata {
        &self.metadata
    }

    /// Logs how many data points every ticker carries and flags the
    /// components announced by the feed metadata that never arrived.
    pub fn log_coverage(&self) {
        info!(
            "Price dataset holds {} tickers ({} to {})",
            self.len(),
            self.metadata
                .start_date
                .map_or_else(|| "?".to_string(), |d| d.to_string()),
            self.metadata
                .end_date
                .map_or_else(|| "?".to_string(), |d| d.to_string()),
        );
        for asset in self.assets.values() {
            if asset.is_empty() {
                warn!("{} has no price data", asset.ticker);
            } else {
                info!("{} | {} data points", asset.ticker, asset.len());
            }
        }
        if !self.rejected.is_empty() {
            warn!(
                "{} tickers were dropped as malformed: {}",
                self.rejected.len(),
                self.rejected.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            );
        }
        for component in &self.metadata.components {
            if !self.assets.contains_key(component) && !self.rejected.contains_key(component) {
                warn!("{} is listed in the feed metadata but missing from its data", component);
            }
        }
        if let Some(count) = self.metadata.components_count {
            if count != self.len() {
                warn!(
                    "Feed metadata announces {} components but {} were received",
                    count,
                    self.len()
                );
            }
        }
    }
}
