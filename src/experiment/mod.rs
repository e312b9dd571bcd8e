pub mod runner;
pub mod statistics;

pub use runner::{Experiment, ExperimentRunner, Report};
pub use statistics::Statistics;
