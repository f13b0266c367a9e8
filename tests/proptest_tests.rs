//! Property-based tests for the building blocks of the search.
//!
//! These tests verify that:
//! 1. The enumerator yields exactly C(n, k) distinct, ordered subsets
//! 2. Sampled weight vectors are non-negative and sum to one
//! 3. Return matrices follow the daily-return definition cell by cell

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;

use sharpe_search::combination::{binomial, CombinationSpace};
use sharpe_search::dataset::{Asset, PriceDataset};
use sharpe_search::returns::build_return_matrix;
use sharpe_search::sampling::WeightSampler;

// ============================================================================
// Enumerator Property Tests
// ============================================================================

/// Universe sizes small enough to enumerate, with 0 <= k <= n.
fn universe_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..=12).prop_flat_map(|n| (Just(n), 0..=n))
}

proptest! {
    #[test]
    fn enumerator_yields_every_subset_once((n, k) in universe_strategy()) {
        let space = CombinationSpace::new(n, k);
        let subsets: Vec<Vec<usize>> = space.iter().map(|c| c.indices().to_vec()).collect();

        prop_assert_eq!(subsets.len() as u128, binomial(n, k));
        prop_assert_eq!(space.count(), binomial(n, k));

        let distinct: HashSet<&Vec<usize>> = subsets.iter().collect();
        prop_assert_eq!(distinct.len(), subsets.len());

        for subset in &subsets {
            prop_assert_eq!(subset.len(), k);
            prop_assert!(subset.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(subset.iter().all(|&index| index < n));
        }
    }

    #[test]
    fn enumerator_is_empty_when_subset_exceeds_universe(n in 0usize..10, extra in 1usize..5) {
        let space = CombinationSpace::new(n, n + extra);
        prop_assert_eq!(space.iter().count(), 0);
        prop_assert_eq!(space.count(), 0);
    }
}

// ============================================================================
// Weight Sampler Property Tests
// ============================================================================

proptest! {
    #[test]
    fn sampled_weights_are_a_valid_allocation(
        seed in any::<u64>(),
        assets in 1usize..40,
        upper_bound in 0.01f64..5.0,
    ) {
        let sampler = WeightSampler::new(upper_bound);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        for _ in 0..10 {
            let weights = sampler.sample(&mut rng, assets);
            prop_assert_eq!(weights.len(), assets);
            prop_assert!(weights.iter().all(|w| *w >= 0.0 && w.is_finite()));
            let total: f64 = weights.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "weights sum to {}", total);
        }
    }
}

// ============================================================================
// Return Matrix Property Tests
// ============================================================================

fn closes_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (2usize..30).prop_flat_map(|days| {
        (
            prop::collection::vec(1.0f64..1000.0, days),
            prop::collection::vec(1.0f64..1000.0, days),
        )
    })
}

proptest! {
    #[test]
    fn return_matrix_follows_daily_return_definition((a, b) in closes_strategy()) {
        let days = a.len();
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..days as u64).map(|i| start + Days::new(i)).collect();
        let dataset = PriceDataset::from_assets(vec![
            Asset::new("A", dates.clone(), a.clone()).unwrap(),
            Asset::new("B", dates, b.clone()).unwrap(),
        ])
        .unwrap();

        let matrix = build_return_matrix(&dataset, &["A", "B"], days).unwrap();
        let values = matrix.values();

        prop_assert_eq!(values.nrows(), days);
        prop_assert_eq!(values.ncols(), 2);
        prop_assert_eq!(values[(0, 0)], 0.0);
        prop_assert_eq!(values[(0, 1)], 0.0);
        for (column, closes) in [&a, &b].into_iter().enumerate() {
            for t in 1..days {
                let expected = (closes[t] - closes[t - 1]) / closes[t - 1];
                prop_assert_eq!(values[(t, column)], expected);
            }
        }
    }
}
