use super::best::{BestResult, RankedPortfolio};
use super::SkippedCombination;
use crate::combination::Combination;
use crate::config::SearchConfig;
use crate::dataset::PriceDataset;
use crate::optimization::objective::{EvaluationError, PortfolioPerformance, SharpeRatio};
use crate::portfolio::Portfolio;
use crate::returns::build_return_matrix;
use crate::sampling::WeightSampler;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, trace};

/// What happened to one combination.
pub(crate) enum CombinationOutcome {
    Evaluated {
        best: Option<RankedPortfolio>,
        trials: usize,
        degenerate: usize,
    },
    /// Holds a ticker already skipped during screening; nothing was built.
    Excluded,
    Skipped(SkippedCombination),
}

/// Everything a worker needs to evaluate a combination. Shared by reference;
/// nothing in here is mutated once the search starts.
pub(crate) struct SearchContext<'a> {
    dataset: &'a PriceDataset,
    universe: &'a [String],
    excluded: &'a [bool],
    config: &'a SearchConfig,
    seed: u64,
    sampler: WeightSampler,
    objective: SharpeRatio,
}

impl<'a> SearchContext<'a> {
    pub(crate) fn new(
        dataset: &'a PriceDataset,
        universe: &'a [String],
        excluded: &'a [bool],
        config: &'a SearchConfig,
        seed: u64,
    ) -> Self {
        SearchContext {
            dataset,
            universe,
            excluded,
            config,
            seed,
            sampler: WeightSampler::new(config.weight_upper_bound),
            objective: SharpeRatio::new(config.trading_days_per_year, config.risk_free_rate),
        }
    }

    /// Random source for the combination at `position`. Every combination
    /// gets its own ChaCha stream under the run seed, so its trials come out
    /// the same whichever worker runs them and in whatever order.
    fn rng_for(&self, position: usize) -> ChaCha20Rng {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        rng.set_stream(position as u64);
        rng
    }

    /// Runs the full trial budget against one combination. The return matrix
    /// is built once and reused by every trial.
    pub(crate) fn evaluate_combination(
        &self,
        position: usize,
        combination: &Combination,
    ) -> CombinationOutcome {
        if combination
            .indices()
            .iter()
            .any(|&index| self.excluded.get(index).copied().unwrap_or(false))
        {
            return CombinationOutcome::Excluded;
        }
        let tickers = combination.tickers(self.universe);
        let matrix = match build_return_matrix(self.dataset, &tickers, self.config.trading_days) {
            Ok(matrix) if self.config.drop_first_observation => matrix.without_first_row(),
            Ok(matrix) => matrix,
            Err(error) => {
                return CombinationOutcome::Skipped(SkippedCombination {
                    position,
                    tickers,
                    reason: error.to_string(),
                })
            }
        };

        let mut rng = self.rng_for(position);
        let mut local_best: Option<(usize, Vec<f64>, PortfolioPerformance)> = None;
        let mut degenerate = 0;

        for trial in 0..self.config.trials_per_combination {
            let weights = self.sampler.sample(&mut rng, tickers.len());
            match self.objective.evaluate(&matrix, &weights) {
                Ok(performance) => {
                    let improves = local_best
                        .as_ref()
                        .map_or(true, |(_, _, best)| performance.sharpe_ratio > best.sharpe_ratio);
                    if improves {
                        local_best = Some((trial, weights, performance));
                    }
                }
                Err(EvaluationError::DegenerateVolatility) => degenerate += 1,
                Err(error) => {
                    debug!("Trial {} of combination #{} failed: {}", trial, position, error);
                    degenerate += 1;
                }
            }
        }

        if let Some((trial, _, performance)) = &local_best {
            trace!(
                "Combination #{} best Sharpe {:.6} at trial {}",
                position,
                performance.sharpe_ratio,
                trial
            );
        }

        CombinationOutcome::Evaluated {
            best: local_best.map(|(trial, weights, performance)| RankedPortfolio {
                position,
                trial,
                portfolio: Portfolio::new(tickers, weights, performance),
            }),
            trials: self.config.trials_per_combination,
            degenerate,
        }
    }
}

/// Counters shared by all workers of a search run.
#[derive(Debug, Default)]
pub(crate) struct SearchTally {
    visited: AtomicUsize,
    evaluated: AtomicUsize,
    trials: AtomicUsize,
    degenerate: AtomicUsize,
    skipped: Mutex<Vec<SkippedCombination>>,
}

impl SearchTally {
    /// Folds one combination's outcome into the run totals and offers its
    /// best portfolio to the shared best result.
    pub(crate) fn record(
        &self,
        outcome: CombinationOutcome,
        best: &BestResult,
        progress_interval: usize,
        total: u128,
    ) {
        match outcome {
            CombinationOutcome::Evaluated {
                best: candidate,
                trials,
                degenerate,
            } => {
                self.evaluated.fetch_add(1, Ordering::Relaxed);
                self.trials.fetch_add(trials, Ordering::Relaxed);
                self.degenerate.fetch_add(degenerate, Ordering::Relaxed);
                if let Some(candidate) = candidate {
                    let (position, sharpe) = (candidate.position, candidate.portfolio.sharpe_ratio);
                    if best.offer(candidate) {
                        debug!("New best Sharpe {:.6} from combination #{}", sharpe, position);
                    }
                }
            }
            CombinationOutcome::Excluded => {}
            CombinationOutcome::Skipped(skipped) => {
                debug!(
                    "Skipping combination #{}: {}",
                    skipped.position, skipped.reason
                );
                self.skipped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(skipped);
            }
        }

        let visited = self.visited.fetch_add(1, Ordering::Relaxed) + 1;
        if progress_interval > 0 && visited % progress_interval == 0 {
            info!(
                "Processed {}/{} combinations, best Sharpe so far: {}",
                visited,
                total,
                best.sharpe_ratio()
                    .map_or_else(|| "none".to_string(), |s| format!("{s:.6}"))
            );
        }
    }

    pub(crate) fn visited(&self) -> usize {
        self.visited.load(Ordering::Relaxed)
    }

    pub(crate) fn evaluated(&self) -> usize {
        self.evaluated.load(Ordering::Relaxed)
    }

    pub(crate) fn trials(&self) -> usize {
        self.trials.load(Ordering::Relaxed)
    }

    pub(crate) fn degenerate(&self) -> usize {
        self.degenerate.load(Ordering::Relaxed)
    }

    /// Skipped combinations sorted by enumeration position.
    pub(crate) fn into_skipped(self) -> Vec<SkippedCombination> {
        let mut skipped = self
            .skipped
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        skipped.sort_by_key(|s| s.position);
        skipped
    }
}
