pub mod dataset;
pub mod iris;

pub use dataset::{Dataset, Example};
