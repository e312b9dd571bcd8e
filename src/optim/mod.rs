pub mod adam;
pub mod clip;
pub mod momentum;
pub mod optimizer;
pub mod sgd;
pub mod state;

pub use adam::Adam;
pub use clip::GradientClipper;
pub use momentum::Momentum;
pub use optimizer::{Optimizer, OptimizerConfig};
pub use sgd::Sgd;
pub use state::{OptimizerState, StateScope};
