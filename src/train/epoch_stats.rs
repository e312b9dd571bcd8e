use serde::{Serialize, Deserialize};

/// Per-epoch statistics emitted by `TrainingLoop`.
///
/// When a progress channel is attached with `TrainingLoop::with_progress`,
/// the loop sends one `EpochStats` value at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Sum of the costs of every presentation in this epoch.
    pub total_cost: f32,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
