use std::fmt;

use serde::{Serialize, Deserialize};

use crate::train::outcome::RunResult;

/// Convergence counts over many runs of one configuration.
///
/// Only converged runs contribute epochs. Two accumulators over disjoint
/// runs can be merged in either order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub converged: usize,
    pub epochs: usize,
}

impl Statistics {
    pub fn aggregate(&mut self, result: &RunResult) {
        self.count += 1;
        if result.converged {
            self.converged += 1;
            self.epochs += result.epochs();
        }
    }

    pub fn merge(&mut self, other: &Statistics) {
        self.count += other.count;
        self.converged += other.converged;
        self.epochs += other.epochs;
    }

    /// Fraction of runs that converged; 0 before any run is aggregated.
    pub fn convergence_probability(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.converged as f64 / self.count as f64
    }

    /// Mean epochs to convergence over converged runs; 0 if none converged.
    pub fn average_epochs(&self) -> f64 {
        if self.converged == 0 {
            return 0.0;
        }
        self.epochs as f64 / self.converged as f64
    }
}

impl<'a> Extend<&'a RunResult> for Statistics {
    fn extend<I: IntoIterator<Item = &'a RunResult>>(&mut self, results: I) {
        results.into_iter().for_each(|r| self.aggregate(r));
    }
}

impl<'a> FromIterator<&'a RunResult> for Statistics {
    fn from_iter<I: IntoIterator<Item = &'a RunResult>>(results: I) -> Self {
        let mut stats = Statistics::default();
        stats.extend(results);
        stats
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} {:.6}", self.convergence_probability(), self.average_epochs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    fn result(epochs: usize, converged: bool) -> RunResult {
        RunResult { costs: vec![1.0; epochs], converged, misses: 0 }
    }

    #[test]
    fn only_converged_runs_count_epochs() {
        let stats: Statistics = [result(10, true), result(10000, false), result(30, true)].iter().collect();
        assert_eq!(stats, Statistics { count: 3, converged: 2, epochs: 40 });
        assert_eq!(stats.average_epochs(), 20.0);
        assert!((stats.convergence_probability() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_and_unconverged_are_zero() {
        assert_eq!(Statistics::default().convergence_probability(), 0.0);
        let stats: Statistics = [result(5, false)].iter().collect();
        assert_eq!(stats.average_epochs(), 0.0);
        assert_eq!(stats.to_string(), "0.000000 0.000000");
    }

    #[test]
    fn merge_matches_any_aggregation_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut results: Vec<RunResult> = (0..200)
            .map(|_| result(rng.gen_range(1..500), rng.gen_bool(0.7)))
            .collect();

        let whole: Statistics = results.iter().collect();
        let (left, right) = results.split_at(73);
        let mut merged: Statistics = right.iter().collect();
        merged.merge(&left.iter().collect());
        assert_eq!(merged, whole);

        results.shuffle(&mut rng);
        let shuffled: Statistics = results.iter().collect();
        assert_eq!(shuffled.convergence_probability(), whole.convergence_probability());
        assert_eq!(shuffled.average_epochs(), whole.average_epochs());
    }
}
