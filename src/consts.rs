// Defaults for the search parameters. Every one of these can be overridden
// through the configuration file, the CLI or the environment.
pub const DEFAULT_UNIVERSE_SIZE: usize = 30;
pub const DEFAULT_SUBSET_SIZE: usize = 25;
pub const DEFAULT_TRIALS_PER_COMBINATION: usize = 1000;
pub const DEFAULT_TRADING_DAYS: usize = 105;
pub const DEFAULT_TRADING_DAYS_PER_YEAR: usize = 252;
pub const DEFAULT_WEIGHT_UPPER_BOUND: f64 = 0.2;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10_000;

/// Weight vectors must sum to one within this tolerance.
pub const FLOAT_COMPARISON_EPSILON: f64 = 1e-9;

/// Annualized volatility below this is treated as zero.
pub const VOLATILITY_EPSILON: f64 = 1e-12;

pub const SEQUENTIAL_LABEL: &str = "Sequential";
pub const PARALLEL_LABEL: &str = "Parallel";
