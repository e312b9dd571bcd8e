pub mod epoch_stats;
pub mod loop_fn;
pub mod outcome;
pub mod task;
pub mod train_config;

pub use epoch_stats::EpochStats;
pub use loop_fn::{batches, Phase, TrainingLoop};
pub use outcome::{load_results, save_results, RunResult};
pub use task::Task;
pub use train_config::{Presentation, TrainConfig};
