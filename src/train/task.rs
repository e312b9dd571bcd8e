use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::data::dataset::Dataset;
use crate::error::{Error, Result, Violation};
use crate::loss::loss_type::LossType;
use crate::network::network::Network;
use crate::network::spec::{Architecture, NetworkSpec};
use crate::optim::optimizer::OptimizerConfig;
use crate::train::train_config::Presentation;

/// The two toy problems and the constants that belong to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Two-input exclusive or, one sigmoid output, quadratic cost.
    Xor,
    /// Fisher's iris, three softmax outputs, cross-entropy cost.
    Iris,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Xor => "xor",
            Task::Iris => "iris",
        }
    }

    pub fn dataset(&self) -> Dataset {
        match self {
            Task::Xor => Dataset::xor(),
            Task::Iris => Dataset::iris(),
        }
    }

    /// Epoch-total cost below which a run counts as converged.
    pub fn threshold(&self, presentation: Presentation) -> f32 {
        match (self, presentation) {
            (Task::Xor, Presentation::Online) => 0.1,
            (Task::Xor, Presentation::Batch { .. }) => 0.05,
            (Task::Iris, Presentation::Online) => 10.0,
            (Task::Iris, Presentation::Batch { .. }) => 1.0,
        }
    }

    pub fn network_spec(&self, width: usize, architecture: Architecture) -> NetworkSpec {
        let (inputs, outputs, activation, loss) = match self {
            Task::Xor => (2, 1, ActivationFunction::Sigmoid, LossType::Quadratic),
            Task::Iris => (4, 3, ActivationFunction::Softmax, LossType::CrossEntropy),
        };
        NetworkSpec { inputs, width, outputs, activation, loss, architecture }
    }

    /// Gradient-descent step size used by momentum and by evolutionary
    /// mutation.
    pub fn learning_rate(&self) -> f32 {
        match self {
            Task::Xor => 0.6,
            Task::Iris => 0.1,
        }
    }

    pub fn momentum(&self) -> OptimizerConfig {
        OptimizerConfig::Momentum { alpha: 0.1, eta: self.learning_rate() }
    }

    /// Adam for the logical function, momentum for iris.
    pub fn default_optimizer(&self) -> OptimizerConfig {
        match self {
            Task::Xor => OptimizerConfig::adam(),
            Task::Iris => self.momentum(),
        }
    }

    /// Post-convergence check over the whole training set, inference only.
    ///
    /// For iris this returns the number of misclassified rows. For xor every
    /// output must fall on the right side of 0.5; a converged network that
    /// does not is reported as `Error::InvariantViolation`.
    pub fn check(&self, network: &Network, dataset: &Dataset) -> Result<usize> {
        match self {
            Task::Iris => Ok(dataset
                .examples
                .iter()
                .filter(|e| network.predict(&e.input) != e.label)
                .count()),
            Task::Xor => {
                for example in &dataset.examples {
                    let output = network.forward(&example.input);
                    if (output[0] >= 0.5) != (example.label == 1) {
                        return Err(Error::InvariantViolation(Violation {
                            input: example.input.clone(),
                            expected: example.target.clone(),
                            output,
                        }));
                    }
                }
                Ok(0)
            }
        }
    }
}
