use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace};

use crate::data::dataset::Dataset;
use crate::error::{Error, Result};
use crate::evolve::evolution_config::EvolutionConfig;
use crate::evolve::member::Member;
use crate::network::genome::Gene;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::outcome::RunResult;

/// Where an `EvolutionaryTrainer` is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionPhase {
    Seeding,
    Generation,
    Converged,
    ExhaustedBudget,
}

/// Population-based trainer mixing gradient steps with genome crossover.
///
/// A generation mutates every member in parallel, then re-measures every
/// fitness in parallel with gradients off, sorts the population by fitness
/// and overwrites fixed bottom-half slots with recombined copies of the top
/// half. Both parallel phases join before the next one starts.
pub struct EvolutionaryTrainer<'a> {
    config: EvolutionConfig,
    dataset: &'a Dataset,
    population: Vec<Member>,
    mutation: Sgd,
    rng: StdRng,
    pool: ThreadPool,
    phase: EvolutionPhase,
}

impl<'a> EvolutionaryTrainer<'a> {
    /// Validates `config` and seeds the population from one generator, so a
    /// given seed always yields the same population.
    pub fn new(config: EvolutionConfig, dataset: &'a Dataset, seed: u64) -> Result<EvolutionaryTrainer<'a>> {
        config.validate()?;
        let spec = config.network_spec();
        if dataset.input_width() != spec.inputs || dataset.output_width() != spec.outputs {
            return Err(Error::InvalidData(format!(
                "dataset {} does not fit {} networks",
                dataset.name,
                config.task.name()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let population = (0..config.population)
            .map(|_| Network::new(spec.clone(), &mut rng).map(Member::new))
            .collect::<Result<Vec<_>>>()?;
        let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;

        Ok(EvolutionaryTrainer {
            mutation: Sgd::new(config.learning_rate),
            config,
            dataset,
            population,
            rng,
            pool,
            phase: EvolutionPhase::Seeding,
        })
    }

    pub fn population(&self) -> &[Member] {
        &self.population
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    /// The fittest member as of the last `assess`.
    pub fn best(&self) -> &Member {
        &self.population[0]
    }

    /// Mutate phase: one gradient step per member, all members in parallel.
    /// Returns once every member has finished.
    pub fn mutate(&mut self) {
        let (dataset, mutation, clip) = (self.dataset, &self.mutation, &self.config.clip);
        let population = &mut self.population;
        self.pool.install(|| {
            population
                .par_iter_mut()
                .for_each(|member| member.mutate(dataset, mutation, clip));
        });
    }

    /// Fitness phase: inference-only cost for every member in parallel, then
    /// a stable ascending sort by fitness.
    pub fn assess(&mut self) {
        let dataset = self.dataset;
        let population = &mut self.population;
        self.pool.install(|| {
            population.par_iter_mut().for_each(|member| member.assess(dataset));
        });
        self.population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    }

    /// Fills slots `half + 2p` and `half + 2p + 1` for every pair `p` with
    /// crossed copies of two distinct top-half parents.
    pub fn crossover(&mut self) {
        let half = self.population.len() / 2;
        for pair in 0..self.config.crossover_pairs {
            let a = self.rng.gen_range(0..half);
            let mut b = self.rng.gen_range(0..half - 1);
            if b >= a {
                b += 1;
            }
            let child = half + 2 * pair;
            self.cross((a, b), (child, child + 1));
        }
    }

    /// Copies parent `a` into child `x` and parent `b` into child `y`, then
    /// swaps one randomly chosen gene between the children. Parents must be
    /// in the top half, children in the bottom half. Returns the swapped gene.
    pub fn cross(&mut self, (a, b): (usize, usize), (x, y): (usize, usize)) -> Gene {
        let half = self.population.len() / 2;
        assert!(a < half && b < half && a != b, "parents must be distinct top-half members");
        assert!(x >= half && y >= half && x != y, "children must be distinct bottom-half slots");

        let (top, bottom) = self.population.split_at_mut(half);
        let (x, y) = (x - half, y - half);
        let (cx, cy) = if x < y {
            let (left, right) = bottom.split_at_mut(y);
            (&mut left[x], &mut right[0])
        } else {
            let (left, right) = bottom.split_at_mut(x);
            (&mut right[0], &mut left[y])
        };

        cx.network.parameters_mut().copy_from(top[a].network.parameters());
        cy.network.parameters_mut().copy_from(top[b].network.parameters());
        cx.fitness = top[a].fitness;
        cy.fitness = top[b].fitness;

        let blocks = &cx.network.genome().blocks;
        let block = &blocks[self.rng.gen_range(0..blocks.len())];
        let gene = block.genes[self.rng.gen_range(0..block.genes.len())];

        let other = cy.network.parameters_mut();
        cx.network.parameters_mut().swap_values(other, gene.weight);
        cx.network.parameters_mut().swap_values(other, gene.bias);
        gene
    }

    /// Mutate, assess, and unless the best member already meets the
    /// threshold, cross over. Returns the best fitness.
    pub fn generation(&mut self) -> f32 {
        self.phase = EvolutionPhase::Generation;
        self.mutate();
        self.assess();

        let best = self.best().fitness;
        if best < self.config.threshold() {
            self.phase = EvolutionPhase::Converged;
        } else {
            self.crossover();
        }
        best
    }

    /// Runs generations until convergence or until `max_generations`.
    /// `costs` holds the best fitness of each generation; `misses` is
    /// measured on the best member.
    pub fn run(&mut self) -> Result<RunResult> {
        let mut costs = Vec::new();
        for generation in 1..=self.config.max_generations {
            let best = self.generation();
            trace!(generation, best, "generation");
            costs.push(best);
            if self.phase == EvolutionPhase::Converged {
                break;
            }
        }

        if self.phase != EvolutionPhase::Converged {
            self.phase = EvolutionPhase::ExhaustedBudget;
            debug!(task = self.config.task.name(), generations = costs.len(), "budget exhausted");
            return Ok(RunResult { costs, converged: false, misses: 0 });
        }

        let misses = self.config.task.check(&self.best().network, self.dataset)?;
        debug!(task = self.config.task.name(), generations = costs.len(), misses, "converged");
        Ok(RunResult { costs, converged: true, misses })
    }
}
