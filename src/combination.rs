use serde::{Deserialize, Serialize};

/// An unordered selection of universe members, stored as strictly increasing
/// indices into the universe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination(Vec<usize>);

impl Combination {
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Maps the indices back onto ticker symbols.
    pub fn tickers(&self, universe: &[String]) -> Vec<String> {
        self.0.iter().map(|&i| universe[i].clone()).collect()
    }
}

/// The set of all `subset_size`-subsets of a universe of `universe_size`
/// members. Cheap to copy; every call to [`CombinationSpace::iter`] starts a
/// fresh enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinationSpace {
    universe_size: usize,
    subset_size: usize,
}

impl CombinationSpace {
    pub fn new(universe_size: usize, subset_size: usize) -> Self {
        CombinationSpace {
            universe_size,
            subset_size,
        }
    }

    pub fn universe_size(&self) -> usize {
        self.universe_size
    }

    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    pub fn iter(&self) -> CombinationEnumerator {
        CombinationEnumerator::new(self.universe_size, self.subset_size)
    }

    /// C(n, k). Saturates at `u128::MAX`, far beyond anything enumerable.
    pub fn count(&self) -> u128 {
        binomial(self.universe_size, self.subset_size)
    }
}

impl IntoIterator for &CombinationSpace {
    type Item = Combination;
    type IntoIter = CombinationEnumerator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazily walks the k-subsets in lexicographic order.
///
/// Each subset is produced by choosing indices that are strictly greater than
/// the previously chosen one, so no subset can come out twice and no record
/// of visited indices is needed. Only the next subset is ever held in memory.
#[derive(Debug, Clone)]
pub struct CombinationEnumerator {
    universe_size: usize,
    pending: Option<Vec<usize>>,
}

impl CombinationEnumerator {
    pub fn new(universe_size: usize, subset_size: usize) -> Self {
        let pending = (subset_size <= universe_size).then(|| (0..subset_size).collect());
        CombinationEnumerator {
            universe_size,
            pending,
        }
    }

    fn successor(&self, current: &[usize]) -> Option<Vec<usize>> {
        let k = current.len();
        let n = self.universe_size;
        // rightmost slot that can still move forward
        let slot = (0..k).rev().find(|&i| current[i] < n - k + i)?;

        let mut next = current.to_vec();
        next[slot] += 1;
        for i in slot + 1..k {
            next[i] = next[i - 1] + 1;
        }
        Some(next)
    }
}

impl Iterator for CombinationEnumerator {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.pending.take()?;
        self.pending = self.successor(&current);
        Some(Combination(current))
    }
}

impl std::iter::FusedIterator for CombinationEnumerator {}

pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut result: u128 = 1;
    for i in 0..k {
        // result * (n - i) is always divisible by (i + 1) here
        result = match result.checked_mul(n - i) {
            Some(product) => product / (i + 1),
            None => return u128::MAX,
        };
    }
    result
}
