use serde::{Serialize, Deserialize};

use crate::loss::{cross_entropy::CrossEntropyLoss, quadratic::QuadraticLoss};
use crate::math::matrix::Matrix;

/// Selects the cost node at the end of a network.
///
/// - `Quadratic`    — summed squared error; pair with a Sigmoid output.
/// - `CrossEntropy` — categorical cross-entropy; pair with a Softmax output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Quadratic,
    CrossEntropy,
}

impl LossType {
    pub fn loss(&self, predicted: &Matrix, expected: &Matrix) -> f32 {
        match self {
            LossType::Quadratic    => QuadraticLoss::loss(predicted, expected),
            LossType::CrossEntropy => CrossEntropyLoss::loss(predicted, expected),
        }
    }

    pub fn derivative(&self, predicted: &Matrix, expected: &Matrix) -> Matrix {
        match self {
            LossType::Quadratic    => QuadraticLoss::derivative(predicted, expected),
            LossType::CrossEntropy => CrossEntropyLoss::derivative(predicted, expected),
        }
    }
}
