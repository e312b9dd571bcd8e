pub mod graph;

pub use graph::{Bindings, Graph, Mode, NodeId};
