pub mod math;
pub mod activation;
pub mod loss;
pub mod graph;
pub mod network;
pub mod data;
pub mod optim;
pub mod train;
pub mod evolve;
pub mod experiment;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use network::network::Network;
pub use network::spec::{Architecture, NetworkSpec};
pub use data::dataset::{Dataset, Example};
pub use optim::optimizer::{Optimizer, OptimizerConfig};
pub use optim::clip::GradientClipper;
pub use train::{Presentation, RunResult, Task, TrainConfig, TrainingLoop};
pub use evolve::{EvolutionConfig, EvolutionaryTrainer};
pub use experiment::{ExperimentRunner, Report, Statistics};
pub use error::{Error, Result};
