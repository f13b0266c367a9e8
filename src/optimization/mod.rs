pub mod aggregator;
pub mod objective;
pub mod search;
