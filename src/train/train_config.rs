use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::network::spec::{Architecture, NetworkSpec};
use crate::optim::clip::GradientClipper;
use crate::optim::optimizer::OptimizerConfig;
use crate::train::task::Task;

/// How examples are fed to the optimizer within an epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Presentation {
    /// One update per example.
    #[default]
    Online,
    /// One update per group of `size` examples; the group gradient and cost
    /// are averaged over its members.
    Batch { size: usize },
}

impl Presentation {
    pub fn batch_size(&self) -> usize {
        match self {
            Presentation::Online => 1,
            Presentation::Batch { size } => *size,
        }
    }
}

/// Configuration for a `TrainingLoop` run.
///
/// # Fields
/// - `task`         — dataset, output layer and convergence thresholds
/// - `width`        — hidden units
/// - `architecture` — plain, inception or DCT parameterisation
/// - `optimizer`    — update rule
/// - `contextual`   — keep one optimizer state per training example
/// - `presentation` — online or fixed-size batches
/// - `max_epochs`   — budget after which a run is reported as not converged
/// - `clip`         — global gradient-norm bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub task: Task,
    pub width: usize,
    #[serde(default)]
    pub architecture: Architecture,
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub contextual: bool,
    #[serde(default)]
    pub presentation: Presentation,
    pub max_epochs: usize,
    #[serde(default)]
    pub clip: GradientClipper,
}

impl TrainConfig {
    /// Width 3, plain layers, the task's default optimizer, online
    /// presentation and a 10000 epoch budget.
    pub fn new(task: Task) -> Self {
        TrainConfig {
            task,
            width: 3,
            architecture: Architecture::Plain,
            optimizer: task.default_optimizer(),
            contextual: false,
            presentation: Presentation::Online,
            max_epochs: 10_000,
            clip: GradientClipper::default(),
        }
    }

    pub fn network_spec(&self) -> NetworkSpec {
        self.task.network_spec(self.width, self.architecture)
    }

    pub fn threshold(&self) -> f32 {
        self.task.threshold(self.presentation)
    }

    pub fn validate(&self) -> Result<()> {
        self.network_spec().validate()?;
        self.optimizer.validate()?;
        if self.max_epochs == 0 {
            return Err(Error::InvalidConfig("max_epochs must be at least 1".into()));
        }
        if self.presentation.batch_size() == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1".into()));
        }
        if self.contextual && !self.optimizer.is_stateful() {
            return Err(Error::InvalidConfig(format!(
                "contextual training needs a stateful optimizer, not {}",
                self.optimizer.name()
            )));
        }
        if !(self.clip.max_norm > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "clip norm must be positive, got {}",
                self.clip.max_norm
            )));
        }
        Ok(())
    }

    /// Serializes the configuration to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads and validates a configuration written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
