use super::best::BestResult;
use super::trial::{SearchContext, SearchTally};
use super::{CancellationToken, SearchError};
use crate::combination::CombinationSpace;
use crate::config::SearchConfig;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::info;

/// Fixed-size pool of workers pulling `(position, combination)` pairs off the
/// shared lazy enumerator. The enumerator is only advanced while the run is
/// not cancelled, so no new combination starts after a cancel.
pub(super) fn run(
    context: &SearchContext<'_>,
    space: &CombinationSpace,
    tally: &SearchTally,
    best: &BestResult,
    cancel: &CancellationToken,
    config: &SearchConfig,
) -> Result<(), SearchError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.max_concurrency)
        .thread_name(|index| format!("sharpe-worker-{index}"))
        .build()?;
    info!("Dispatching combinations to {} workers", pool.current_num_threads());

    let total = space.count();
    pool.install(|| {
        space
            .iter()
            .enumerate()
            .take_while(|_| !cancel.is_cancelled())
            .par_bridge()
            .for_each(|(position, combination)| {
                let outcome = context.evaluate_combination(position, &combination);
                tally.record(outcome, best, config.progress_interval, total);
            });
    });

    if cancel.is_cancelled() {
        info!("Cancellation requested after {} combinations", tally.visited());
    }
    Ok(())
}
