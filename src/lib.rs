//! Exhaustive Sharpe-ratio search over fixed-size subsets of a ticker universe.
//!
//! Every k-subset of n tickers is enumerated, each one is scored under a
//! batch of random long-only allocations, and the single allocation with the
//! highest annualized Sharpe ratio is reported. The search runs either on one
//! thread or on a pool of workers; both produce the same answer for a seed.

// Modules
pub mod cli;
pub mod combination;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod optimization;
pub mod portfolio;
pub mod price_feed;
pub mod recorder;
pub mod returns;
pub mod sampling;

pub use config::{AppConfig, SearchConfig};
pub use optimization::search::{
    run_search, CancellationToken, ExecutionMode, SearchError, SearchOutcome, SearchStatus,
};
