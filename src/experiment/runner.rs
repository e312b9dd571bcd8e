use std::fmt;
use std::sync::mpsc;

use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::experiment::statistics::Statistics;
use crate::train::outcome::RunResult;

/// One seeded run of some training configuration.
pub type Experiment<'f> = dyn Fn(u64) -> Result<RunResult> + Sync + 'f;

/// Aggregated outcome of one configuration over every seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub label: String,
    pub statistics: Statistics,
    /// Run results in seed order.
    pub results: Vec<RunResult>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.statistics)
    }
}

/// Repeats experiments over seeds `first_seed .. first_seed + runs` on a
/// fixed-size worker pool.
///
/// Workers only send results down a channel; the calling thread is the
/// single consumer and the only writer of the `Statistics` accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRunner {
    pub runs: usize,
    pub first_seed: u64,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
}

impl Default for ExperimentRunner {
    fn default() -> Self {
        ExperimentRunner { runs: 256, first_seed: 1, threads: 0 }
    }
}

impl ExperimentRunner {
    pub fn new(runs: usize, first_seed: u64, threads: usize) -> Self {
        ExperimentRunner { runs, first_seed, threads }
    }

    pub fn seeds(&self) -> impl Iterator<Item = u64> {
        let first = self.first_seed;
        (0..self.runs as u64).map(move |i| first + i)
    }

    /// Runs `experiment` once per seed.
    pub fn run<F>(&self, label: &str, experiment: F) -> Result<Report>
    where
        F: Fn(u64) -> Result<RunResult> + Sync,
    {
        let experiment: &Experiment<'_> = &experiment;
        let mut reports = self.run_all(&[(label, experiment)])?;
        Ok(reports.remove(0))
    }

    /// Runs two configurations over the same seeds concurrently.
    pub fn compare<A, B>(&self, (a_label, a): (&str, A), (b_label, b): (&str, B)) -> Result<(Report, Report)>
    where
        A: Fn(u64) -> Result<RunResult> + Sync,
        B: Fn(u64) -> Result<RunResult> + Sync,
    {
        let (a, b): (&Experiment<'_>, &Experiment<'_>) = (&a, &b);
        let mut reports = self.run_all(&[(a_label, a), (b_label, b)])?;
        let second = reports.remove(1);
        Ok((reports.remove(0), second))
    }

    /// Runs every labelled experiment over every seed and aggregates each
    /// into its own report. If any run fails, the failure with the lowest
    /// (experiment, seed) is returned after all runs have finished.
    pub fn run_all(&self, experiments: &[(&str, &Experiment<'_>)]) -> Result<Vec<Report>> {
        if self.runs == 0 {
            return Err(Error::InvalidConfig("an experiment needs at least one run".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.threads).build()?;
        let jobs: Vec<(usize, u64)> = (0..experiments.len())
            .flat_map(|e| self.seeds().map(move |seed| (e, seed)))
            .collect();

        for (label, _) in experiments {
            info!(label, runs = self.runs, first_seed = self.first_seed, "starting experiment");
        }

        let (tx, rx) = mpsc::channel::<(usize, u64, Result<RunResult>)>();
        let mut collected: Vec<Vec<(u64, RunResult)>> = vec![Vec::with_capacity(self.runs); experiments.len()];
        let mut statistics = vec![Statistics::default(); experiments.len()];
        let mut failure: Option<((usize, u64), Error)> = None;

        std::thread::scope(|s| {
            let pool = &pool;
            s.spawn(move || {
                pool.install(|| {
                    jobs.into_par_iter().for_each_with(tx, |tx, (e, seed)| {
                        let outcome = (experiments[e].1)(seed);
                        // The consumer outlives every worker.
                        let _ = tx.send((e, seed, outcome));
                    });
                });
            });

            for (e, seed, outcome) in rx {
                match outcome {
                    Ok(result) => {
                        statistics[e].aggregate(&result);
                        collected[e].push((seed, result));
                    }
                    Err(err) => {
                        warn!(label = experiments[e].0, seed, error = %err, "run failed");
                        if failure.as_ref().map_or(true, |(key, _)| (e, seed) < *key) {
                            failure = Some(((e, seed), err));
                        }
                    }
                }
            }
        });

        if let Some((_, err)) = failure {
            return Err(err);
        }

        let reports = experiments
            .iter()
            .zip(collected)
            .zip(statistics)
            .map(|(((label, _), mut results), statistics)| {
                results.sort_by_key(|(seed, _)| *seed);
                info!(label, %statistics, "experiment finished");
                Report {
                    label: label.to_string(),
                    statistics,
                    results: results.into_iter().map(|(_, r)| r).collect(),
                }
            })
            .collect();
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;

    fn fake(seed: u64) -> Result<RunResult> {
        Ok(RunResult {
            costs: vec![0.0; seed as usize],
            converged: seed % 2 == 0,
            misses: 0,
        })
    }

    #[test]
    fn results_arrive_in_seed_order() {
        let report = ExperimentRunner::new(20, 1, 4).run("fake", fake).unwrap();
        assert_eq!(report.results.len(), 20);
        let lengths: Vec<usize> = report.results.iter().map(RunResult::epochs).collect();
        assert_eq!(lengths, (1..=20).collect::<Vec<_>>());
        // Seeds 2, 4, .., 20 converge.
        assert_eq!(report.statistics, Statistics { count: 20, converged: 10, epochs: 110 });
    }

    #[test]
    fn compare_keeps_configurations_apart() {
        let runner = ExperimentRunner::new(8, 5, 2);
        let (a, b) = runner
            .compare(("normal", fake), ("never", |_| Ok(RunResult::default())))
            .unwrap();
        assert_eq!(a.statistics.count, 8);
        assert_eq!(b.statistics, Statistics { count: 8, converged: 0, epochs: 0 });
        assert_eq!(b.to_string(), "never: 0.000000 0.000000");
    }

    #[test]
    fn invariant_violations_are_surfaced() {
        let runner = ExperimentRunner::new(6, 1, 3);
        let result = runner.run("broken", |seed| {
            if seed >= 3 {
                Err(Error::InvariantViolation(Violation {
                    input: vec![seed as f32],
                    expected: vec![1.0],
                    output: vec![0.0],
                }))
            } else {
                fake(seed)
            }
        });
        match result {
            Err(Error::InvariantViolation(v)) => assert_eq!(v.input, vec![3.0]),
            other => panic!("expected the seed 3 violation, got {other:?}"),
        }
    }

    #[test]
    fn zero_runs_is_a_config_error() {
        assert!(ExperimentRunner::new(0, 1, 1).run("none", fake).is_err());
    }
}
