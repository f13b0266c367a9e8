use super::{SearchOutcome, SearchStatus};
use itertools::Itertools;
use std::fmt;

// Skipped combinations can number in the hundreds of thousands; the text
// report lists the first few and the JSON dump carries all of them.
const LISTED_SKIPS: usize = 20;

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} search {} in {:.2}s (seed {}, {} worker{})",
            self.mode,
            self.status,
            self.elapsed_seconds,
            self.seed,
            self.workers,
            if self.workers == 1 { "" } else { "s" }
        )?;
        writeln!(
            f,
            "Combinations: {} evaluated, {} skipped, {} visited of {}",
            self.combinations_evaluated,
            self.combinations_skipped,
            self.combinations_visited,
            self.combinations_total
        )?;
        writeln!(
            f,
            "Trials: {} run, {} excluded as degenerate",
            self.trials_evaluated, self.degenerate_trials
        )?;
        match self.status {
            SearchStatus::Complete => writeln!(f, "Coverage: full")?,
            SearchStatus::Degraded => writeln!(f, "Coverage: partial, combinations were skipped")?,
            SearchStatus::Cancelled => writeln!(f, "Coverage: partial, the run was cancelled")?,
        }

        match &self.best {
            Some(best) => {
                let portfolio = &best.portfolio;
                writeln!(
                    f,
                    "Best Sharpe ratio {:.6} (combination #{}, trial {})",
                    portfolio.sharpe_ratio, best.position, best.trial
                )?;
                writeln!(
                    f,
                    "Annualized return {:.4}%, annualized volatility {:.4}%",
                    portfolio.annualized_return * 100.,
                    portfolio.annualized_volatility * 100.
                )?;
                for (ticker, weight) in portfolio.allocation() {
                    writeln!(f, "  {:<6} {:>8.4}%", ticker, weight * 100.)?;
                }
            }
            None => writeln!(f, "No portfolio with a defined Sharpe ratio was found")?,
        }

        if !self.skipped_tickers.is_empty() {
            writeln!(f, "Skipped tickers:")?;
            for skipped in &self.skipped_tickers {
                writeln!(f, "  {}: {}", skipped.ticker, skipped.reason)?;
            }
        }
        if !self.skipped_combinations.is_empty() {
            writeln!(f, "Skipped combinations:")?;
            for skipped in self.skipped_combinations.iter().take(LISTED_SKIPS) {
                writeln!(
                    f,
                    "  #{} [{}]: {}",
                    skipped.position,
                    skipped.tickers.iter().join(", "),
                    skipped.reason
                )?;
            }
            if self.skipped_combinations.len() > LISTED_SKIPS {
                writeln!(
                    f,
                    "  ... and {} more",
                    self.skipped_combinations.len() - LISTED_SKIPS
                )?;
            }
        }
        Ok(())
    }
}
