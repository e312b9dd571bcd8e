use std::sync::mpsc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::network::network::Network;
use crate::optim::optimizer::Optimizer;
use crate::optim::state::StateScope;
use crate::train::epoch_stats::EpochStats;
use crate::train::outcome::RunResult;
use crate::train::train_config::{Presentation, TrainConfig};

// ---------------------------------------------------------------------------
// Training loop
// ---------------------------------------------------------------------------

/// Where a `TrainingLoop` is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Epoch,
    Converged,
    ExhaustedBudget,
}

/// One seeded gradient-descent run over a borrowed dataset.
///
/// Each epoch shuffles the index table, presents every example (or every
/// batch) once, clips the gradient and applies the optimizer. The run stops
/// when the epoch-total cost drops below the task threshold or the epoch
/// budget runs out.
pub struct TrainingLoop<'a> {
    config: TrainConfig,
    dataset: &'a Dataset,
    network: Network,
    optimizer: Box<dyn Optimizer>,
    state: StateScope,
    rng: StdRng,
    order: Vec<usize>,
    phase: Phase,
    progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl<'a> TrainingLoop<'a> {
    /// Validates `config` against `dataset` and draws the initial network
    /// from a generator seeded with `seed`. Nothing is trained yet.
    ///
    /// # Arguments
    /// - `config`  — task, architecture, optimizer, presentation and budget
    /// - `dataset` — training examples; borrowed for the life of the loop
    /// - `seed`    — seeds the one generator used for initial weights and
    ///   every epoch shuffle
    ///
    /// # Errors
    /// `InvalidConfig` for a config that fails validation or asks for
    /// contextual state without a stateful optimizer, `InvalidData` when the
    /// dataset does not fit the task's network.
    pub fn new(config: TrainConfig, dataset: &'a Dataset, seed: u64) -> Result<TrainingLoop<'a>> {
        config.validate()?;
        let spec = config.network_spec();
        if dataset.input_width() != spec.inputs || dataset.output_width() != spec.outputs {
            return Err(Error::InvalidData(format!(
                "dataset {} is {}->{}, but {} networks are {}->{}",
                dataset.name,
                dataset.input_width(),
                dataset.output_width(),
                config.task.name(),
                spec.inputs,
                spec.outputs
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let network = Network::new(spec, &mut rng)?;
        let optimizer = config.optimizer.build()?;
        let state = StateScope::new(optimizer.as_ref(), network.parameters(), config.contextual, dataset.len())?;

        Ok(TrainingLoop {
            config,
            dataset,
            network,
            optimizer,
            state,
            rng,
            order: (0..dataset.len()).collect(),
            phase: Phase::Initializing,
            progress_tx: None,
        })
    }

    /// Streams one `EpochStats` per finished epoch into `tx`. A dropped
    /// receiver only stops the stream, never the run.
    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn state(&self) -> &StateScope {
        &self.state
    }

    /// Trains until convergence or until `max_epochs` epochs have run.
    ///
    /// Non-convergence is an ordinary result. On convergence the task check
    /// runs in inference mode; a failed xor check surfaces as
    /// `Error::InvariantViolation`.
    pub fn run(&mut self) -> Result<RunResult> {
        let threshold = self.config.threshold();
        let mut costs = Vec::with_capacity(1000);
        self.phase = Phase::Epoch;

        for epoch in 1..=self.config.max_epochs {
            let t_start = Instant::now();

            // ── One pass over the shuffled examples ────────────────────────
            let total = self.run_epoch(epoch as u32);
            costs.push(total);

            // ── Emit progress ──────────────────────────────────────────────
            if let Some(tx) = &self.progress_tx {
                let stats = EpochStats {
                    epoch,
                    total_cost: total,
                    elapsed_ms: t_start.elapsed().as_millis() as u64,
                };
                if tx.send(stats).is_err() {
                    self.progress_tx = None;
                }
            }

            if total < threshold {
                self.phase = Phase::Converged;
                break;
            }
        }

        // ── Outcome ────────────────────────────────────────────────────────
        if self.phase != Phase::Converged {
            self.phase = Phase::ExhaustedBudget;
            debug!(task = self.config.task.name(), epochs = costs.len(), "budget exhausted");
            return Ok(RunResult { costs, converged: false, misses: 0 });
        }

        let misses = self.config.task.check(&self.network, self.dataset)?;
        debug!(task = self.config.task.name(), epochs = costs.len(), misses, "converged");
        Ok(RunResult { costs, converged: true, misses })
    }

    /// One pass over the shuffled examples. `step` is the 1-based epoch
    /// index and doubles as Adam's bias-correction step for every update in
    /// the epoch. Returns the epoch-total cost.
    pub fn run_epoch(&mut self, step: u32) -> f32 {
        self.order.shuffle(&mut self.rng);

        let mut total = 0.0;
        match self.config.presentation {
            Presentation::Online => {
                for position in 0..self.order.len() {
                    let index = self.order[position];
                    total += self.present(&[index], step);
                }
            }
            Presentation::Batch { size } => {
                for batch in batches(&self.order, size) {
                    total += self.present(&batch, step);
                }
            }
        }
        total
    }

    /// Zero, forward/backward over `members`, clip, update. Batch gradients
    /// and costs are averaged. Contextual state follows the first member.
    ///
    /// # Arguments
    /// - `members` — dataset indices presented together; one for online
    ///   presentation
    /// - `step`    — 1-based epoch index handed to the optimizer
    fn present(&mut self, members: &[usize], step: u32) -> f32 {
        // ── Accumulate gradients ───────────────────────────────────────────
        self.network.zero_grad();

        let mut cost = 0.0;
        for &index in members {
            cost += self.network.present(&self.dataset.examples[index]);
        }
        if members.len() > 1 {
            let scale = 1.0 / members.len() as f32;
            self.network.parameters_mut().scale_grads(scale);
            cost *= scale;
        }

        // ── Clip and update ────────────────────────────────────────────────
        self.config.clip.clip(self.network.parameters_mut());
        let state = self.state.resolve(members[0]);
        self.optimizer.apply(self.network.parameters_mut(), state, step);
        cost
    }
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

/// Splits `order` into `ceil(n / size)` groups of exactly `size` indices,
/// wrapping around to the start of `order` to fill the last group.
pub fn batches(order: &[usize], size: usize) -> Vec<Vec<usize>> {
    let n = order.len();
    if n == 0 || size == 0 {
        return Vec::new();
    }
    (0..n.div_ceil(size))
        .map(|b| (0..size).map(|k| order[(b * size + k) % n]).collect())
        .collect()
}
