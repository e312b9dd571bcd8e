pub mod genome;
pub mod network;
pub mod parameter_set;
pub mod spec;

pub use genome::{Gene, Genome, GenomeBlock};
pub use network::{argmax, Network};
pub use parameter_set::{ParameterSet, TensorId};
pub use spec::{Architecture, NetworkSpec};
