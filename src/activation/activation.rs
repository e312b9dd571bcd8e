use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    /// Vector-valued: normalises over every element of its input, so it is
    /// applied to whole matrices rather than element by element.
    Softmax,
}

impl ActivationFunction {
    /// Forward pass over a whole matrix.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Sigmoid => z.map(sigmoid),
            ActivationFunction::Softmax => {
                let max = z.data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exp = z.map(|x| (x - max).exp());
                let sum: f32 = exp.data.iter().sum();
                exp.map(|x| x / sum)
            }
        }
    }

    /// Gradient with respect to the pre-activation, given the forward output
    /// `y` and the upstream gradient `upstream` (∂L/∂y).
    pub fn backward(&self, y: &Matrix, upstream: &Matrix) -> Matrix {
        match self {
            // σ'(z) = σ(z)(1 - σ(z)), expressed through the stored output.
            ActivationFunction::Sigmoid => upstream.hadamard(&y.map(|s| s * (1.0 - s))),
            // ∂L/∂z_i = y_i (g_i - Σ_j g_j y_j)
            ActivationFunction::Softmax => {
                let dot: f32 = upstream.data.iter().zip(&y.data).map(|(g, s)| g * s).sum();
                let data = upstream
                    .data
                    .iter()
                    .zip(&y.data)
                    .map(|(g, s)| s * (g - dot))
                    .collect();
                Matrix::from_vec(y.rows, y.cols, data)
            }
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
