//! Exhaustive subset search with Monte Carlo weight sampling.
//!
//! Every k-subset of the universe is visited once. For each one the return
//! matrix is built, `trials_per_combination` random allocations are scored
//! by their Sharpe ratio and the best of them is offered to a single shared
//! [`BestResult`]. The two execution modes differ only in who pulls the next
//! combination off the enumerator; since every combination draws from its own
//! seeded random stream, both modes report the same winner.

use crate::combination::CombinationSpace;
use crate::config::SearchConfig;
use crate::consts::{PARALLEL_LABEL, SEQUENTIAL_LABEL};
use crate::dataset::PriceDataset;
use crate::returns::check_history;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

pub mod best;
mod parallel;
mod report;
mod sequential;
mod trial;

pub use best::{BestResult, RankedPortfolio};
use trial::{SearchContext, SearchTally};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(
        "Only {usable} tickers cover the {trading_days}-day window but subsets of {required} are requested."
    )]
    DataInsufficient {
        usable: usize,
        required: usize,
        trading_days: usize,
    },
    #[error("Price dataset is misaligned: {0}")]
    MisalignedDataset(String),
    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl ExecutionMode {
    /// Label written as the first column of the results log.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => SEQUENTIAL_LABEL,
            ExecutionMode::Parallel => PARALLEL_LABEL,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cooperative stop signal. Workers look at it before starting each
/// combination, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every combination was evaluated.
    Complete,
    /// Every combination was visited but some could not be evaluated.
    Degraded,
    /// The run stopped before visiting every combination.
    Cancelled,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SearchStatus::Complete => "Complete",
            SearchStatus::Degraded => "Degraded",
            SearchStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkippedCombination {
    pub position: usize,
    pub tickers: Vec<String>,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchOutcome {
    pub mode: ExecutionMode,
    pub status: SearchStatus,
    pub seed: u64,
    pub workers: usize,
    pub universe: Vec<String>,
    pub subset_size: usize,
    pub trials_per_combination: usize,
    pub best: Option<RankedPortfolio>,
    pub combinations_total: u128,
    pub combinations_visited: usize,
    pub combinations_evaluated: usize,
    /// Visited combinations that were not evaluated, for any reason.
    pub combinations_skipped: usize,
    pub trials_evaluated: usize,
    pub degenerate_trials: usize,
    pub skipped_tickers: Vec<SkippedTicker>,
    /// Combinations whose return matrix failed to build. Combinations held
    /// back by a skipped ticker are only counted, the ticker carries the reason.
    pub skipped_combinations: Vec<SkippedCombination>,
    pub elapsed_seconds: f64,
}

impl SearchOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == SearchStatus::Complete
    }

    /// Every combination was visited, whether or not all of them could be
    /// evaluated. Only finished runs have comparable timings.
    pub fn is_finished(&self) -> bool {
        self.status != SearchStatus::Cancelled
    }

    pub fn best_sharpe(&self) -> Option<f64> {
        self.best.as_ref().map(|best| best.portfolio.sharpe_ratio)
    }
}

/// Runs a full search over `dataset`.
///
/// Configuration and dataset problems that make the whole run meaningless are
/// returned as errors before the first combination is enumerated. Anything
/// narrower (a short ticker, a zero close, a flat portfolio) only removes the
/// affected combinations or trials and is accounted for in the outcome.
pub fn run_search(
    config: &SearchConfig,
    dataset: &PriceDataset,
    cancel: &CancellationToken,
) -> Result<SearchOutcome, SearchError> {
    config.validate()?;
    let universe = resolve_universe(config, dataset)?;
    let skipped_tickers = screen_universe(config, dataset, &universe)?;

    let seed = config.seed.unwrap_or_else(|| OsRng.next_u64());
    let space = CombinationSpace::new(universe.len(), config.subset_size);
    let total = space.count();
    let workers = match config.mode {
        ExecutionMode::Sequential => 1,
        ExecutionMode::Parallel => config.max_concurrency,
    };
    info!(
        "{} search over C({}, {}) = {} combinations, {} trials each, seed {}",
        config.mode,
        universe.len(),
        config.subset_size,
        total,
        config.trials_per_combination,
        seed
    );

    let excluded: Vec<bool> = universe
        .iter()
        .map(|ticker| skipped_tickers.iter().any(|skipped| &skipped.ticker == ticker))
        .collect();
    let context = SearchContext::new(dataset, &universe, &excluded, config, seed);
    let tally = SearchTally::default();
    let best = BestResult::new();

    let start = Instant::now();
    match config.mode {
        ExecutionMode::Sequential => sequential::run(&context, &space, &tally, &best, cancel, config),
        ExecutionMode::Parallel => parallel::run(&context, &space, &tally, &best, cancel, config)?,
    }
    let elapsed_seconds = start.elapsed().as_secs_f64();

    let combinations_visited = tally.visited();
    let combinations_evaluated = tally.evaluated();
    let trials_evaluated = tally.trials();
    let degenerate_trials = tally.degenerate();
    let combinations_skipped = combinations_visited.saturating_sub(combinations_evaluated);
    let skipped_combinations = tally.into_skipped();

    let status = if (combinations_visited as u128) < total {
        SearchStatus::Cancelled
    } else if combinations_skipped > 0 {
        SearchStatus::Degraded
    } else {
        SearchStatus::Complete
    };

    let outcome = SearchOutcome {
        mode: config.mode,
        status,
        seed,
        workers,
        universe,
        subset_size: config.subset_size,
        trials_per_combination: config.trials_per_combination,
        best: best.into_inner(),
        combinations_total: total,
        combinations_visited,
        combinations_evaluated,
        combinations_skipped,
        trials_evaluated,
        degenerate_trials,
        skipped_tickers,
        skipped_combinations,
        elapsed_seconds,
    };
    info!(
        "{} search {}: {}/{} combinations in {:.2}s",
        outcome.mode,
        outcome.status,
        outcome.combinations_evaluated,
        outcome.combinations_total,
        outcome.elapsed_seconds
    );
    Ok(outcome)
}

/// The first `universe_size` tickers of the configured universe, or of the
/// dataset's tickers in sorted order when none is configured.
fn resolve_universe(
    config: &SearchConfig,
    dataset: &PriceDataset,
) -> Result<Vec<String>, SearchError> {
    let n = config.universe_size;
    match &config.universe {
        Some(explicit) => Ok(explicit.iter().take(n).cloned().collect()),
        None if dataset.len() < n => Err(SearchError::InvalidConfiguration(format!(
            "universe size {} exceeds the {} tickers of the dataset",
            n,
            dataset.len()
        ))),
        None => Ok(dataset.tickers().take(n).map(str::to_string).collect()),
    }
}

/// Checks every universe ticker against the evaluation window. Tickers that
/// fall short are reported and only their combinations get skipped; the run
/// is aborted if too few remain for even one subset, or if the remaining
/// tickers disagree on the window's dates.
fn screen_universe(
    config: &SearchConfig,
    dataset: &PriceDataset,
    universe: &[String],
) -> Result<Vec<SkippedTicker>, SearchError> {
    let window = config.trading_days;
    let mut usable = Vec::with_capacity(universe.len());
    let mut skipped = Vec::new();

    for ticker in universe {
        let reason = match dataset.rejection(ticker) {
            Some(rejection) => rejection.to_string(),
            None => match check_history(dataset, ticker, window) {
                Ok(asset) => {
                    usable.push(asset);
                    continue;
                }
                Err(error) => error.to_string(),
            },
        };
        warn!("Combinations holding {} will be skipped: {}", ticker, reason);
        skipped.push(SkippedTicker {
            ticker: ticker.clone(),
            reason,
        });
    }

    if usable.len() < config.subset_size {
        return Err(SearchError::DataInsufficient {
            usable: usable.len(),
            required: config.subset_size,
            trading_days: window,
        });
    }

    if let Some((reference, rest)) = usable.split_first() {
        let reference_dates = &reference.dates()[..window];
        for asset in rest {
            let dates = &asset.dates()[..window];
            if let Some(day) = dates.iter().zip(reference_dates).position(|(a, b)| a != b) {
                return Err(SearchError::MisalignedDataset(format!(
                    "{} trades on {} where {} trades on {} (day {} of the window)",
                    asset.ticker(),
                    dates[day],
                    reference.ticker(),
                    reference_dates[day],
                    day
                )));
            }
        }
    }

    Ok(skipped)
}
