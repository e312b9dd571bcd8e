use crate::data::dataset::Dataset;
use crate::network::network::Network;
use crate::optim::clip::GradientClipper;
use crate::optim::optimizer::Optimizer;
use crate::optim::state::OptimizerState;

/// One network in the population and its last measured fitness
/// (a cost, lower is better).
#[derive(Debug, Clone)]
pub struct Member {
    pub network: Network,
    pub fitness: f32,
}

impl Member {
    pub fn new(network: Network) -> Member {
        Member { network, fitness: f32::INFINITY }
    }

    /// One local gradient step over the whole dataset: zero, accumulate,
    /// clip, update. Fitness becomes the cost seen during the step.
    pub fn mutate(&mut self, dataset: &Dataset, step: &dyn Optimizer, clip: &GradientClipper) {
        self.network.zero_grad();
        let mut cost = 0.0;
        for example in &dataset.examples {
            cost += self.network.present(example);
        }
        clip.clip(self.network.parameters_mut());

        let mut state = OptimizerState::zeros(step.state_slots(), &self.network.parameters().lengths());
        step.apply(self.network.parameters_mut(), &mut state, 1);
        self.fitness = cost;
    }

    /// Inference-only cost over the whole dataset.
    pub fn assess(&mut self, dataset: &Dataset) {
        self.fitness = dataset.examples.iter().map(|e| self.network.evaluate(e)).sum();
    }
}
