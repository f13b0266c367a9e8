//! Run configuration.
//!
//! Every knob of the search has a documented default (see [`crate::consts`]).
//! Values come from an optional JSON file and are then overridden by CLI
//! flags or `SHARPE_SEARCH_*` environment variables in the binaries.

use crate::consts::*;
use crate::optimization::search::{ExecutionMode, SearchError};
use crate::price_feed::DatasetSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration from `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_max_concurrency() -> usize {
    num_cpus::get()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of tickers n the subsets are drawn from.
    pub universe_size: usize,
    /// Tickers per subset, k.
    pub subset_size: usize,
    pub trials_per_combination: usize,
    /// Length T of the evaluation window, in price observations.
    pub trading_days: usize,
    pub trading_days_per_year: usize,
    pub risk_free_rate: f64,
    /// Raw weights are drawn from `[0, weight_upper_bound)` before normalization.
    pub weight_upper_bound: f64,
    /// Evaluate on days 1..T instead of including the all-zero first row.
    pub drop_first_observation: bool,
    /// Drawn from the OS when absent; the drawn value is reported.
    pub seed: Option<u64>,
    pub mode: ExecutionMode,
    /// Worker threads used in parallel mode.
    pub max_concurrency: usize,
    /// Log progress every this many combinations, 0 to disable.
    pub progress_interval: usize,
    /// Explicit ticker universe; the first `universe_size` entries are used.
    /// Defaults to the dataset's tickers in sorted order.
    pub universe: Option<Vec<String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            universe_size: DEFAULT_UNIVERSE_SIZE,
            subset_size: DEFAULT_SUBSET_SIZE,
            trials_per_combination: DEFAULT_TRIALS_PER_COMBINATION,
            trading_days: DEFAULT_TRADING_DAYS,
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
            weight_upper_bound: DEFAULT_WEIGHT_UPPER_BOUND,
            drop_first_observation: false,
            seed: None,
            mode: ExecutionMode::default(),
            max_concurrency: default_max_concurrency(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            universe: None,
        }
    }
}

impl SearchConfig {
    /// Rejects parameter sets that make the search meaningless. Called by
    /// the search before any enumeration work.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |reason: String| Err(SearchError::InvalidConfiguration(reason));

        if self.universe_size == 0 {
            return invalid("universe size must be positive".into());
        }
        if self.subset_size == 0 {
            return invalid("subset size must be positive".into());
        }
        if self.subset_size > self.universe_size {
            return invalid(format!(
                "subset size {} exceeds universe size {}",
                self.subset_size, self.universe_size
            ));
        }
        if self.trials_per_combination == 0 {
            return invalid("trials per combination must be positive".into());
        }
        if self.trading_days < 2 {
            return invalid(format!(
                "the evaluation window needs at least 2 trading days, got {}",
                self.trading_days
            ));
        }
        if self.trading_days_per_year == 0 {
            return invalid("trading days per year must be positive".into());
        }
        if !self.risk_free_rate.is_finite() {
            return invalid("risk-free rate must be finite".into());
        }
        if !(self.weight_upper_bound.is_finite() && self.weight_upper_bound > 0.) {
            return invalid(format!(
                "weight upper bound must be positive and finite, got {}",
                self.weight_upper_bound
            ));
        }
        if self.max_concurrency == 0 {
            return invalid("at least one worker is needed".into());
        }
        if let Some(universe) = &self.universe {
            if universe.len() < self.universe_size {
                return invalid(format!(
                    "universe lists {} tickers but universe size is {}",
                    universe.len(),
                    self.universe_size
                ));
            }
            let mut seen = HashSet::new();
            if let Some(duplicate) = universe
                .iter()
                .take(self.universe_size)
                .find(|ticker| !seen.insert(ticker.as_str()))
            {
                return invalid(format!("ticker {} appears twice in the universe", duplicate));
            }
        }
        Ok(())
    }
}

fn default_dataset() -> DatasetSource {
    DatasetSource::Endpoint("http://0.0.0.0:8000/api/dow-jones-data".into())
}

fn default_results_path() -> PathBuf {
    PathBuf::from("data/simulation_results.csv")
}

/// Everything a binary needs for one or more runs.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_dataset")]
    pub dataset: DatasetSource,
    /// Headerless CSV the run timings are appended to.
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    /// Optional JSON dump of the last search outcome.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            search: SearchConfig::default(),
            dataset: default_dataset(),
            results_path: default_results_path(),
            output_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from: {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
