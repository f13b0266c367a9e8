use crate::consts::DEFAULT_WEIGHT_UPPER_BOUND;
use rand::distributions::Uniform;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Draws random long-only allocations.
///
/// Every component is drawn from `Uniform[0, upper_bound)` and the vector is
/// then divided by its sum. The bound only shapes the raw draw: after
/// normalization a single weight may well exceed it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct WeightSampler {
    upper_bound: f64,
}

impl Default for WeightSampler {
    fn default() -> Self {
        WeightSampler {
            upper_bound: DEFAULT_WEIGHT_UPPER_BOUND,
        }
    }
}

impl WeightSampler {
    /// `upper_bound` must be positive and finite, which the search config
    /// validates up front.
    pub fn new(upper_bound: f64) -> Self {
        WeightSampler { upper_bound }
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Samples `assets` weights summing to one. The only state touched is
    /// the caller's random source.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, assets: usize) -> Vec<f64> {
        if assets == 0 {
            return Vec::new();
        }
        let uniform = Uniform::new(0., self.upper_bound);

        loop {
            let mut weights = (0..assets)
                .map(|_| rng.sample(uniform))
                .collect::<Vec<f64>>();
            let magnitude = weights.iter().sum::<f64>();
            // an all-zero draw cannot be normalized, draw again
            if magnitude > 0. {
                weights.iter_mut().for_each(|w| *w /= magnitude);
                return weights;
            }
        }
    }
}
