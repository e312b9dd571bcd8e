use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;

/// Record of one training or evolutionary run.
///
/// `costs` holds one entry per epoch (or generation), including the one in
/// which the run converged. `misses` is only meaningful for classification
/// runs that converged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub costs: Vec<f32>,
    pub converged: bool,
    pub misses: usize,
}

impl RunResult {
    pub fn epochs(&self) -> usize {
        self.costs.len()
    }

    pub fn final_cost(&self) -> Option<f32> {
        self.costs.last().copied()
    }
}

/// Writes a batch of results as a JSON array, for plotting elsewhere.
pub fn save_results(path: impl AsRef<Path>, results: &[RunResult]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, results)?;
    Ok(())
}

pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<RunResult>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
