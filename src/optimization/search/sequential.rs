use super::best::BestResult;
use super::trial::{SearchContext, SearchTally};
use super::CancellationToken;
use crate::combination::CombinationSpace;
use crate::config::SearchConfig;
use tracing::info;

/// Single thread, enumerator order, trials in order within each combination.
pub(super) fn run(
    context: &SearchContext<'_>,
    space: &CombinationSpace,
    tally: &SearchTally,
    best: &BestResult,
    cancel: &CancellationToken,
    config: &SearchConfig,
) {
    let total = space.count();
    for (position, combination) in space.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Cancellation requested after {} combinations", position);
            break;
        }
        let outcome = context.evaluate_combination(position, &combination);
        tally.record(outcome, best, config.progress_interval, total);
    }
}
