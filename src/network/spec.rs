use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;

/// How the weight and bias tensors of each layer are parameterised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Architecture {
    /// Weights and biases are trained directly.
    #[default]
    Plain,
    /// Every weight and bias `m` is produced by `depth` multiplicative links:
    /// weights become `m_k = m_{k-1} · A_k + B_k` (fan-in mixing), biases
    /// `m_k = A_k · m_{k-1} + B_k`.
    Inception { depth: usize },
    /// Weights are trained as 2-D DCT coefficients `F`; the layer uses
    /// `W = Tᵀ_rows · F · T_cols` with constant DCT bases.
    Dct,
}

impl Architecture {
    /// The reference inception configuration: one multiplicative link.
    pub fn inception() -> Architecture {
        Architecture::Inception { depth: 1 }
    }

    pub fn depth(&self) -> usize {
        match self {
            Architecture::Inception { depth } => *depth,
            Architecture::Plain | Architecture::Dct => 0,
        }
    }
}

/// Shape of a one-hidden-layer network plus its output activation and cost.
///
/// Fields:
/// - `inputs`       — width of each input row
/// - `width`        — hidden units (sigmoid)
/// - `outputs`      — output units
/// - `activation`   — output activation (Sigmoid or Softmax)
/// - `loss`         — cost node applied to the output
/// - `architecture` — parameterisation of the layer tensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub inputs: usize,
    pub width: usize,
    pub outputs: usize,
    pub activation: ActivationFunction,
    pub loss: LossType,
    #[serde(default)]
    pub architecture: Architecture,
}

impl NetworkSpec {
    pub fn validate(&self) -> Result<()> {
        if self.inputs == 0 || self.width == 0 || self.outputs == 0 {
            return Err(Error::InvalidConfig(format!(
                "network dimensions must be non-zero, got {}-{}-{}",
                self.inputs, self.width, self.outputs
            )));
        }
        if let Architecture::Inception { depth: 0 } = self.architecture {
            return Err(Error::InvalidConfig("inception depth must be at least 1".into()));
        }
        Ok(())
    }
}
