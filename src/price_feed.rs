use crate::dataset::{DatasetError, PriceDataset, PriceFeedPayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PriceFeedError {
    #[error("Could not read price data from `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Price feed payload is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Price data service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Where the closing prices come from: a JSON file saved from the price data
/// service, or the service endpoint itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DatasetSource {
    File(PathBuf),
    Endpoint(String),
}

impl FromStr for DatasetSource {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(DatasetSource::Endpoint(raw.to_string()))
        } else {
            Ok(DatasetSource::File(PathBuf::from(raw)))
        }
    }
}

impl TryFrom<String> for DatasetSource {
    type Error = std::convert::Infallible;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<DatasetSource> for String {
    fn from(source: DatasetSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            DatasetSource::Endpoint(url) => write!(f, "{url}"),
        }
    }
}

/// Loads the whole dataset into memory. This is the only place the crate
/// touches the network or the disk for price data; the search itself never
/// does.
pub async fn load_dataset(source: &DatasetSource) -> Result<PriceDataset, PriceFeedError> {
    info!("Loading price data from {}", source);
    let dataset = match source {
        DatasetSource::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| PriceFeedError::Io {
                    path: path.clone(),
                    source,
                })?;
            parse_payload(&bytes)?
        }
        DatasetSource::Endpoint(url) => fetch_dataset(url).await?,
    };
    dataset.log_coverage();
    Ok(dataset)
}

pub async fn fetch_dataset(endpoint: &str) -> Result<PriceDataset, PriceFeedError> {
    let payload = reqwest::Client::new()
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .json::<PriceFeedPayload>()
        .await?;
    Ok(PriceDataset::from_payload(payload)?)
}

pub fn read_dataset(path: &Path) -> Result<PriceDataset, PriceFeedError> {
    let bytes = std::fs::read(path).map_err(|source| PriceFeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_payload(&bytes)
}

fn parse_payload(bytes: &[u8]) -> Result<PriceDataset, PriceFeedError> {
    let payload: PriceFeedPayload = serde_json::from_slice(bytes)?;
    Ok(PriceDataset::from_payload(payload)?)
}
