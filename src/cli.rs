//! Command-line plumbing shared by the binaries.

use crate::config::AppConfig;
use crate::price_feed::DatasetSource;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Flags that override the configuration file. Each one can also be set
/// through its `SHARPE_SEARCH_*` environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON configuration file; every field is optional
    #[arg(short, long, env = "SHARPE_SEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Price data JSON file or http(s) endpoint
    #[arg(short, long, env = "SHARPE_SEARCH_DATASET")]
    pub dataset: Option<DatasetSource>,

    /// Seed for the weight sampler; drawn at random when absent
    #[arg(short, long, env = "SHARPE_SEARCH_SEED")]
    pub seed: Option<u64>,

    /// Worker threads for parallel mode
    #[arg(short, long, env = "SHARPE_SEARCH_WORKERS")]
    pub workers: Option<usize>,

    /// Random allocations scored per combination
    #[arg(short, long, env = "SHARPE_SEARCH_TRIALS")]
    pub trials: Option<usize>,

    /// Number of tickers subsets are drawn from
    #[arg(short = 'n', long, env = "SHARPE_SEARCH_UNIVERSE_SIZE")]
    pub universe_size: Option<usize>,

    /// Tickers per subset
    #[arg(short = 'k', long, env = "SHARPE_SEARCH_SUBSET_SIZE")]
    pub subset_size: Option<usize>,

    /// Price observations in the evaluation window
    #[arg(long, env = "SHARPE_SEARCH_TRADING_DAYS")]
    pub trading_days: Option<usize>,

    /// Evaluate without the all-zero first return row
    #[arg(long, env = "SHARPE_SEARCH_DROP_FIRST_OBSERVATION")]
    pub drop_first_observation: bool,

    /// CSV file run rows are appended to
    #[arg(short, long, env = "SHARPE_SEARCH_RESULTS")]
    pub results: Option<PathBuf>,

    /// Write the full outcome of the run as JSON
    #[arg(short, long, env = "SHARPE_SEARCH_OUTPUT")]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// Reads the configuration file, if any, then lays the flags over it.
    pub fn resolve(&self) -> anyhow::Result<AppConfig> {
        let base = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AppConfig::default(),
        };
        Ok(self.apply(base))
    }

    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        let search = &mut config.search;
        if let Some(seed) = self.seed {
            search.seed = Some(seed);
        }
        if let Some(workers) = self.workers {
            search.max_concurrency = workers;
        }
        if let Some(trials) = self.trials {
            search.trials_per_combination = trials;
        }
        if let Some(n) = self.universe_size {
            search.universe_size = n;
        }
        if let Some(k) = self.subset_size {
            search.subset_size = k;
        }
        if let Some(days) = self.trading_days {
            search.trading_days = days;
        }
        if self.drop_first_observation {
            search.drop_first_observation = true;
        }
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(results) = &self.results {
            config.results_path = results.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = Some(output.clone());
        }
        config
    }
}

/// Loads `.env` and installs the log subscriber. `RUST_LOG` wins over the
/// default `info` level.
pub fn init_tracing() {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;

    #[test]
    fn test_flags_override_file_values() {
        let mut base = AppConfig::default();
        base.search = SearchConfig {
            trials_per_combination: 10,
            seed: Some(1),
            ..Default::default()
        };

        let args = RunArgs {
            seed: Some(7),
            subset_size: Some(3),
            dataset: Some("https://prices.example/api".parse().unwrap()),
            output: Some(PathBuf::from("best.json")),
            ..Default::default()
        };
        let config = args.apply(base);

        assert_eq!(config.search.seed, Some(7));
        assert_eq!(config.search.subset_size, 3);
        assert_eq!(config.search.trials_per_combination, 10);
        assert_eq!(
            config.dataset,
            DatasetSource::Endpoint("https://prices.example/api".into())
        );
        assert_eq!(config.output_path, Some(PathBuf::from("best.json")));
    }
}
