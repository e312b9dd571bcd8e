use std::fmt;

use thiserror::Error;

/// Unified error type for network construction, training and experiments.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A converged network disagrees with a training label. Never produced
    /// by ordinary non-convergence.
    #[error("invariant violated: {0}")]
    InvariantViolation(Violation),
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The example a converged network got wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub input: Vec<f32>,
    pub expected: Vec<f32>,
    pub output: Vec<f32>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input {:?} expected {:?} but network produced {:?}",
            self.input, self.expected, self.output
        )
    }
}
