use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::network::spec::{Architecture, NetworkSpec};
use crate::optim::clip::GradientClipper;
use crate::train::task::Task;
use crate::train::train_config::Presentation;

/// Configuration for an `EvolutionaryTrainer` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub task: Task,
    pub width: usize,
    #[serde(default)]
    pub architecture: Architecture,
    pub population: usize,
    /// Parent pairs recombined per generation; each fills two bottom-half slots.
    pub crossover_pairs: usize,
    pub max_generations: usize,
    /// Step size of the plain gradient-descent mutation.
    pub learning_rate: f32,
    #[serde(default)]
    pub clip: GradientClipper,
    /// Worker threads for the mutate and fitness phases; 0 lets rayon decide.
    #[serde(default)]
    pub threads: usize,
}

impl EvolutionConfig {
    /// Population 100, 25 crossover pairs, 1000 generations, width 3 and the
    /// task's own learning rate.
    pub fn new(task: Task) -> Self {
        EvolutionConfig {
            task,
            width: 3,
            architecture: Architecture::Plain,
            population: 100,
            crossover_pairs: 25,
            max_generations: 1000,
            learning_rate: task.learning_rate(),
            clip: GradientClipper::default(),
            threads: 0,
        }
    }

    pub fn network_spec(&self) -> NetworkSpec {
        self.task.network_spec(self.width, self.architecture)
    }

    /// Fitness is a summed cost over the whole dataset, so the online
    /// threshold applies.
    pub fn threshold(&self) -> f32 {
        self.task.threshold(Presentation::Online)
    }

    pub fn validate(&self) -> Result<()> {
        self.network_spec().validate()?;
        let half = self.population / 2;
        if half < 2 {
            return Err(Error::InvalidConfig(format!(
                "population {} leaves fewer than two parents",
                self.population
            )));
        }
        if self.crossover_pairs == 0 {
            return Err(Error::InvalidConfig("crossover_pairs must be at least 1".into()));
        }
        if 2 * self.crossover_pairs > self.population - half {
            return Err(Error::InvalidConfig(format!(
                "{} crossover pairs need {} child slots, but population {} has only {}",
                self.crossover_pairs,
                2 * self.crossover_pairs,
                self.population,
                self.population - half
            )));
        }
        if self.max_generations == 0 {
            return Err(Error::InvalidConfig("max_generations must be at least 1".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_configuration_is_valid() {
        let config = EvolutionConfig::new(Task::Xor);
        assert!(config.validate().is_ok());
        assert_eq!(config.learning_rate, 0.6);
    }

    #[test]
    fn population_must_hold_every_child() {
        let too_many = EvolutionConfig { crossover_pairs: 26, ..EvolutionConfig::new(Task::Xor) };
        assert!(matches!(too_many.validate(), Err(Error::InvalidConfig(_))));

        let odd = EvolutionConfig { population: 7, crossover_pairs: 2, ..EvolutionConfig::new(Task::Xor) };
        assert!(odd.validate().is_ok());

        let tiny = EvolutionConfig { population: 3, crossover_pairs: 1, ..EvolutionConfig::new(Task::Xor) };
        assert!(tiny.validate().is_err());

        let none = EvolutionConfig { crossover_pairs: 0, ..EvolutionConfig::new(Task::Xor) };
        assert!(none.validate().is_err());
    }
}
